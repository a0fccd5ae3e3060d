pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::path::Path;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Notice};
use crate::car::Car;
use crate::celebration::ArrivalCelebration;
use crate::progress::car_offset;

const HORIZONTAL_MARGIN: u16 = 2;
const TITLE: &str = "なぞなぞタイマー";

/// `のこり：XふんYびょう`
pub fn format_remaining(secs: u32) -> String {
    format!("のこり：{}ふん{}びょう", secs / 60, secs % 60)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(Span::styled(TITLE, bold_style.fg(Color::Yellow)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let screen = screen::current_screen(self.machine.phase());
        screen.render(self, chunks[1], buf);

        Paragraph::new(Span::styled(screen.legend(self), italic_style))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        if let Some(notice) = &self.notice {
            render_notice(notice, self.config_path.as_deref(), area, buf);
        }

        if self.celebration.is_active {
            render_celebration_particles(&self.celebration, area, buf);
        }
    }
}

/// Destination on the left, the car driving towards it from the right.
/// Takes two rows: the road and the destination label.
pub(crate) fn render_lane(
    car: Car,
    remaining: u32,
    total: u32,
    running: bool,
    area: Rect,
    buf: &mut Buffer,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let destination = car.destination();
    let dest_width = destination.glyph.width() as u16 + 1;
    let lane_width = area.width.saturating_sub(dest_width);
    let sprite_width = car.glyph().width() as u16;
    let offset = car_offset(remaining, total, running, lane_width, sprite_width);

    let road = Line::from(vec![
        Span::raw(format!("{} ", destination.glyph)),
        Span::raw(" ".repeat(offset as usize)),
        Span::styled(car.glyph(), Style::default().add_modifier(Modifier::BOLD)),
    ]);
    Paragraph::new(road).render(Rect { height: 1, ..area }, buf);

    if area.height > 1 {
        let label_area = Rect {
            y: area.y + 1,
            height: 1,
            ..area
        };
        Paragraph::new(Span::styled(
            destination.label,
            Style::default().fg(Color::Cyan),
        ))
        .render(label_area, buf);
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_notice(notice: &Notice, config_path: Option<&Path>, area: Rect, buf: &mut Buffer) {
    let mut lines = match notice {
        Notice::PermissionRequired => vec![
            Line::from("アラームが よやく できませんでした"),
            Line::from("せってい で background_alarm を true に してね"),
        ],
        Notice::AlarmUnavailable => vec![
            Line::from("アラームが よやく できませんでした"),
            Line::from("タイマー は ひらいている あいだ だけ うごくよ"),
        ],
    };
    if let (Notice::PermissionRequired, Some(path)) = (notice, config_path) {
        lines.push(Line::from(Span::styled(
            path.display().to_string(),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "なにか キー を おしてね",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    let inner_width = lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let popup = centered_rect(inner_width + 4, lines.len() as u16 + 2, area);

    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title("おしらせ"),
        )
        .render(popup, buf);
}

/// Render celebration particles on top of the current screen
fn render_celebration_particles(celebration: &ArrivalCelebration, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    for particle in &celebration.particles {
        if particle.x < 0.0 || particle.y < 0.0 {
            continue;
        }
        let x = particle.x as u16;
        let y = particle.y as u16;
        let symbol_width = particle.symbol.width() as u16;

        if x + symbol_width > area.width || y >= area.height {
            continue;
        }
        let color = colors[particle.color_index % colors.len()];
        let alpha = 1.0 - (particle.age / particle.max_age);

        let style = if particle.target.is_some() || alpha > 0.7 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if alpha > 0.3 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };

        buf.set_string(area.x + x, area.y + y, &particle.symbol, style);
    }
}
