use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};

use crate::app::App;
use crate::car::Car;
use crate::progress::elapsed_fraction;
use crate::timer::{AnswerStage, Phase, RiddleState};
use crate::ui::{format_remaining, render_lane};

/// One screen per phase: renders the body and names its keys
pub trait Screen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
    fn legend(&self, app: &App) -> &'static str;
}

fn button(label: &str) -> Span<'_> {
    Span::styled(
        label,
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

/// Minutes input and car picker
pub struct SetupScreen;

impl Screen for SetupScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
            ])
            .split(area);

        Paragraph::new("なんふんにする？")
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let input_area = Rect {
            x: chunks[1].x + chunks[1].width.saturating_sub(16) / 2,
            width: chunks[1].width.min(16),
            ..chunks[1]
        };
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("{}_", app.minutes_input),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" ふん"),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .render(input_area, buf);

        Paragraph::new("すきなくるまをえらんでスタートしてね")
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        render_car_grid(app.selected_car(), chunks[4], buf);
    }

    fn legend(&self, _app: &App) -> &'static str {
        "0-9: ふん  ←↑↓→: くるま  Enter: スタート  Esc: おわる"
    }
}

fn render_car_grid(selected: Car, area: Rect, buf: &mut Buffer) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 3])
        .split(area);

    for (row, pair) in Car::ALL.chunks(2).enumerate() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[row]);

        for (col, car) in pair.iter().enumerate() {
            let style = if *car == selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default()
            };
            let destination = car.destination();
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{} {}", car.glyph(), car.name()), style),
                Span::styled(
                    format!(" → {}", destination.glyph),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]))
            .alignment(Alignment::Center)
            .render(columns[col], buf);
        }
    }
}

/// The drive: countdown while running, the arrival button afterwards
pub struct DriveScreen;

impl Screen for DriveScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Some(car) = app.machine.phase().car() else {
            return;
        };
        let running = app.machine.is_running();
        let remaining = app.machine.remaining_secs();
        let total = app.machine.total_secs();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(area);

        render_lane(car, remaining, total, running, chunks[1], buf);

        Gauge::default()
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(elapsed_fraction(remaining, total).clamp(0.0, 1.0))
            .label("")
            .render(chunks[2], buf);

        if running {
            Paragraph::new(Span::styled(
                format_remaining(remaining),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

            Paragraph::new(button("[s] とめる"))
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        } else {
            Paragraph::new(Span::styled(
                format!("とうちゃく！ {}", car.destination().label),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

            Paragraph::new(button("[Enter] なぞなぞ"))
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        }
    }

    fn legend(&self, app: &App) -> &'static str {
        if app.machine.is_running() {
            "s: とめる  Esc: おわる"
        } else {
            "Enter: なぞなぞ  Space: もういちど  Esc: おわる"
        }
    }
}

pub struct RiddleScreen;

impl Screen for RiddleScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Phase::Riddle(state) = app.machine.phase() else {
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(area);

        let Some(riddle) = app.machine.current_riddle() else {
            let text = if state.pending_riddle_at.is_some() {
                Span::styled("かんがえちゅう…", Style::default().add_modifier(Modifier::ITALIC))
            } else {
                button("[Enter] なぞなぞ")
            };
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .render(chunks[0], buf);
            return;
        };

        let question_style = if state.pending_riddle_at.is_some() {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        Paragraph::new(Span::styled(riddle.question.as_str(), question_style))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        Paragraph::new(button("[n] ほかのもんだい ▶"))
            .alignment(Alignment::Right)
            .render(chunks[1], buf);

        Paragraph::new(button("[a] みんなのおうち 🏠🧼"))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
        Paragraph::new("おうちで てを あらったら おしてね")
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

        render_answer(app, state, chunks[6], buf);

        if state.answer == AnswerStage::Revealed {
            Paragraph::new(button("[b] もどる"))
                .alignment(Alignment::Center)
                .render(chunks[7], buf);
        }
    }

    fn legend(&self, app: &App) -> &'static str {
        match app.machine.phase() {
            Phase::Riddle(RiddleState { current: None, .. }) => "Enter: なぞなぞ  Esc: おわる",
            Phase::Riddle(RiddleState {
                answer: AnswerStage::Revealed,
                ..
            }) => "n: ほかのもんだい  b: もどる  Esc: おわる",
            _ => "n: ほかのもんだい  a: こたえ  Esc: おわる",
        }
    }
}

fn render_answer(app: &App, state: &RiddleState, area: Rect, buf: &mut Buffer) {
    let lead = Span::styled("こたえは・・・", Style::default().fg(Color::Magenta));
    let lines = match state.answer {
        AnswerStage::Hidden => return,
        AnswerStage::Pending { .. } => vec![Line::from(lead)],
        AnswerStage::Revealed => vec![
            Line::from(lead),
            Line::from(Span::styled(
                app.machine.answer_text().unwrap_or_default(),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            )),
        ],
    };
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

/// Helper to construct the appropriate screen for the current phase
pub fn current_screen(phase: &Phase) -> Box<dyn Screen> {
    match phase {
        Phase::Idle => Box::new(SetupScreen),
        Phase::Running(_) | Phase::Finished { .. } => Box::new(DriveScreen),
        Phase::Riddle(_) => Box::new(RiddleScreen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::Car;
    use crate::timer::Session;

    #[test]
    fn screen_per_phase() {
        let idle = current_screen(&Phase::Idle);
        let running = current_screen(&Phase::Running(Session {
            car: Car::Bus,
            end_time_ms: 0,
        }));
        let (app, _) = crate::ui::tests::test_app(true);
        assert!(idle.legend(&app).contains("スタート"));
        assert!(running.legend(&app).contains("なぞなぞ"));
    }
}
