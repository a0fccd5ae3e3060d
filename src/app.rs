//! Key handling and per-tick bookkeeping on top of the timer machine.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::alarm::ScheduleOutcome;
use crate::car::Car;
use crate::celebration::ArrivalCelebration;
use crate::runtime::{Cadence, COUNTDOWN_POLL_MS};
use crate::timer::{AnswerStage, Phase, TickOutcome, TimerMachine};

const MAX_MINUTE_DIGITS: usize = 4;
const GRID_COLUMNS: usize = 2;

/// Popup shown over the current screen until the next key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Background alarms are switched off in the config
    PermissionRequired,
    AlarmUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub machine: TimerMachine,
    pub minutes_input: String,
    pub car_cursor: usize,
    pub celebration: ArrivalCelebration,
    pub notice: Option<Notice>,
    pub config_path: Option<PathBuf>,
    countdown_poll: Cadence,
}

impl App {
    pub fn new(machine: TimerMachine, default_minutes: u32, config_path: Option<PathBuf>) -> Self {
        let car_cursor = machine
            .phase()
            .car()
            .and_then(|car| Car::ALL.iter().position(|c| *c == car))
            .unwrap_or(0);
        let minutes_input = if default_minutes > 0 {
            default_minutes.to_string()
        } else {
            String::new()
        };

        Self {
            machine,
            minutes_input,
            car_cursor,
            celebration: ArrivalCelebration::new(),
            notice: None,
            config_path,
            countdown_poll: Cadence::new(COUNTDOWN_POLL_MS),
        }
    }

    pub fn selected_car(&self) -> Car {
        Car::ALL[self.car_cursor.min(Car::ALL.len() - 1)]
    }

    pub fn select_car(&mut self, car: Car) {
        if let Some(i) = Car::ALL.iter().position(|c| *c == car) {
            self.car_cursor = i;
        }
    }

    pub fn minutes(&self) -> Option<u32> {
        self.minutes_input.parse().ok()
    }

    /// Start a session with the typed minutes and the highlighted car
    pub fn start_selected(&mut self) {
        let Some(minutes) = self.minutes() else {
            tracing::debug!(input = %self.minutes_input, "no minutes entered");
            return;
        };
        match self.machine.start(minutes, self.selected_car()) {
            Ok(outcome) => {
                self.countdown_poll.restart(self.machine.now_ms());
                self.celebration.stop();
                self.notice = match outcome {
                    ScheduleOutcome::Scheduled => None,
                    ScheduleOutcome::PermissionRequired => Some(Notice::PermissionRequired),
                    ScheduleOutcome::Unavailable => Some(Notice::AlarmUnavailable),
                };
            }
            Err(e) => tracing::debug!(error = %e, "start ignored"),
        }
    }

    fn move_cursor(&mut self, code: KeyCode) {
        let last = Car::ALL.len() - 1;
        self.car_cursor = match code {
            KeyCode::Left => self.car_cursor.saturating_sub(1),
            KeyCode::Right => (self.car_cursor + 1).min(last),
            KeyCode::Up => self.car_cursor.saturating_sub(GRID_COLUMNS),
            KeyCode::Down => (self.car_cursor + GRID_COLUMNS).min(last),
            _ => self.car_cursor,
        };
    }

    fn edit_minutes(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.minutes_input.len() < MAX_MINUTE_DIGITS {
                    self.minutes_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.minutes_input.pop();
            }
            _ => {}
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return KeyOutcome::Quit;
        }
        if self.notice.take().is_some() {
            return KeyOutcome::Continue;
        }

        let result = match self.machine.phase() {
            Phase::Idle => {
                match key.code {
                    KeyCode::Enter | KeyCode::Char(' ') => self.start_selected(),
                    KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => {
                        self.move_cursor(key.code)
                    }
                    code => self.edit_minutes(code),
                }
                Ok(())
            }
            Phase::Finished { .. } => match key.code {
                KeyCode::Enter => {
                    self.celebration.stop();
                    self.machine.enter_riddle_mode()
                }
                KeyCode::Char(' ') => {
                    self.start_selected();
                    Ok(())
                }
                _ => Ok(()),
            },
            Phase::Running(_) => match key.code {
                KeyCode::Char('s') => self.machine.stop(),
                _ => Ok(()),
            },
            Phase::Riddle(state) => {
                let has_riddle = state.current.is_some();
                let revealed = state.answer == AnswerStage::Revealed;
                match key.code {
                    KeyCode::Enter if !has_riddle => self.machine.enter_riddle_mode(),
                    KeyCode::Char('n') => self.machine.request_another_riddle(),
                    KeyCode::Char('a') => self.machine.reveal_answer(),
                    KeyCode::Char('b') if revealed => self.machine.return_to_idle(),
                    _ => Ok(()),
                }
            }
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, key = ?key.code, "key ignored");
        }
        KeyOutcome::Continue
    }

    /// Advance deadlines, the countdown poll and the animation.
    /// Returns true when the screen should be redrawn.
    pub fn on_tick(&mut self, width: u16, height: u16) -> bool {
        let now = self.machine.now_ms();
        let mut redraw = self.machine.poll();

        if self.machine.is_running() && self.countdown_poll.due(now) {
            match self.machine.tick() {
                Ok(TickOutcome::Arrived) => self.celebration.start(width, height, now),
                Ok(TickOutcome::Counting(_)) => {}
                Err(e) => tracing::debug!(error = %e, "tick ignored"),
            }
            redraw = true;
        }

        if self.celebration.is_active {
            self.celebration.update(now);
            redraw = true;
        }
        redraw
    }
}
