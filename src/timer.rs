//! Timer lifecycle and riddle reveal sequencing.
//!
//! The persisted absolute end time is the single authority on remaining time:
//! the 1 s foreground poll recomputes from it, and the background alarm checks
//! it before marking the session finished.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::alarm::{claim_completion, AlarmScheduler, ScheduleOutcome};
use crate::car::Car;
use crate::chime::Chime;
use crate::clock::Clock;
use crate::error::{StoreError, TimerError};
use crate::prefs::{PreferenceStore, TimerPrefs};
use crate::riddle::{Riddle, RiddlePicker};

pub const DEFAULT_RIDDLE_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_REVEAL_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    pub riddle_debounce_ms: u64,
    pub reveal_delay_ms: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            riddle_debounce_ms: DEFAULT_RIDDLE_DEBOUNCE_MS,
            reveal_delay_ms: DEFAULT_REVEAL_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub car: Car,
    pub end_time_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStage {
    Hidden,
    Pending { reveal_at_ms: i64 },
    Revealed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiddleState {
    pub car: Option<Car>,
    pub current: Option<String>,
    pub pending_riddle_at: Option<i64>,
    pub answer: AnswerStage,
}

impl RiddleState {
    fn fresh(car: Option<Car>) -> Self {
        Self {
            car,
            current: None,
            pending_riddle_at: None,
            answer: AnswerStage::Hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running(Session),
    /// Arrived; waiting for the child to open the riddle
    Finished { car: Car },
    Riddle(RiddleState),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running(_) => "running",
            Phase::Finished { .. } => "finished",
            Phase::Riddle(_) => "riddle",
        }
    }

    pub fn car(&self) -> Option<Car> {
        match self {
            Phase::Idle => None,
            Phase::Running(s) => Some(s.car),
            Phase::Finished { car } => Some(*car),
            Phase::Riddle(r) => r.car,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub total_secs: u32,
    pub remaining_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Counting(u32),
    Arrived,
}

/// Everything the machine talks to
pub struct Collaborators {
    pub store: Arc<dyn PreferenceStore>,
    pub clock: Arc<dyn Clock>,
    pub alarm: Box<dyn AlarmScheduler>,
    pub chime: Box<dyn Chime>,
    pub picker: RiddlePicker,
    pub delays: Delays,
}

pub struct TimerMachine {
    phase: Phase,
    countdown: Countdown,
    store: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    alarm: Box<dyn AlarmScheduler>,
    chime: Box<dyn Chime>,
    picker: RiddlePicker,
    delays: Delays,
}

impl fmt::Debug for TimerMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerMachine")
            .field("phase", &self.phase)
            .field("countdown", &self.countdown)
            .field("delays", &self.delays)
            .finish_non_exhaustive()
    }
}

/// Whole seconds left, truncated; zero once the end time is reached
pub fn secs_until(end_ms: i64, now_ms: i64) -> u32 {
    let secs = (end_ms - now_ms) / 1000;
    if secs <= 0 {
        0
    } else {
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

fn logged(what: &str, result: Result<(), StoreError>) {
    if let Err(e) = result {
        warn!(error = %e, "failed to {what}");
    }
}

impl TimerMachine {
    /// Start idle without looking at persisted state
    pub fn new(c: Collaborators) -> Self {
        Self {
            phase: Phase::Idle,
            countdown: Countdown::default(),
            store: c.store,
            clock: c.clock,
            alarm: c.alarm,
            chime: c.chime,
            picker: c.picker,
            delays: c.delays,
        }
    }

    /// Pick up where the last process left off.
    ///
    /// A future end time resumes the countdown. An expired end time or a set
    /// completion flag lands on an empty riddle prompt. The completion flag is
    /// consumed either way.
    pub fn restore(c: Collaborators) -> Self {
        let mut machine = Self::new(c);
        let now = machine.clock.now_ms();
        let store = machine.store.clone();

        let end = store.end_time().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable end time");
            None
        });
        let finished = store.timer_finished().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable completion flag");
            false
        });
        let car = store.selected_car().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable car");
            None
        });

        match (end, car) {
            (Some(end), Some(car)) if end > now => {
                let remaining = secs_until(end, now);
                let total = store
                    .total_duration()
                    .ok()
                    .flatten()
                    .filter(|t| *t >= remaining)
                    .unwrap_or(remaining);
                machine.countdown = Countdown {
                    total_secs: total,
                    remaining_secs: remaining,
                };
                machine.phase = Phase::Running(Session {
                    car,
                    end_time_ms: end,
                });
                info!(%car, remaining, "resumed running timer");
            }
            (Some(end), None) if end > now => {
                warn!("running session has no car, dropping it");
                logged("clear session", store.clear_session());
            }
            _ if end.is_some() || finished => {
                logged("clear session", store.clear_session());
                machine.phase = Phase::Riddle(RiddleState::fresh(car));
                info!(?car, "timer finished while away, opening riddle prompt");
            }
            _ => debug!("no saved session"),
        }

        logged("reset completion flag", store.set_timer_finished(false));
        machine
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.countdown.total_secs
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running(_))
    }

    pub fn delays(&self) -> Delays {
        self.delays
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn start(
        &mut self,
        duration_minutes: u32,
        car: Car,
    ) -> Result<ScheduleOutcome, TimerError> {
        if self.is_running() {
            return Err(TimerError::AlreadyRunning);
        }
        if duration_minutes == 0 {
            return Err(TimerError::InvalidDuration(duration_minutes));
        }
        let total_secs = duration_minutes
            .checked_mul(60)
            .ok_or(TimerError::InvalidDuration(duration_minutes))?;

        let end_time_ms = self.clock.now_ms() + i64::from(total_secs) * 1000;
        self.chime.release();

        logged("persist end time", self.store.set_end_time(end_time_ms));
        logged("persist duration", self.store.set_total_duration(total_secs));
        logged("persist car", self.store.set_selected_car(car));
        logged("reset completion flag", self.store.set_timer_finished(false));

        let outcome = self.alarm.schedule_one_shot(end_time_ms);

        self.countdown = Countdown {
            total_secs,
            remaining_secs: total_secs,
        };
        self.phase = Phase::Running(Session { car, end_time_ms });
        info!(%car, duration_minutes, end_time_ms, ?outcome, "timer started");
        Ok(outcome)
    }

    /// The once-per-second countdown poll
    pub fn tick(&mut self) -> Result<TickOutcome, TimerError> {
        let Phase::Running(session) = self.phase else {
            return Err(TimerError::NotRunning);
        };

        let secs = secs_until(session.end_time_ms, self.clock.now_ms());
        if secs == 0 {
            self.arrive(session.car);
            return Ok(TickOutcome::Arrived);
        }

        self.countdown.remaining_secs = self.countdown.remaining_secs.min(secs);
        Ok(TickOutcome::Counting(self.countdown.remaining_secs))
    }

    fn arrive(&mut self, car: Car) {
        self.countdown.remaining_secs = 0;
        self.phase = Phase::Finished { car };

        if claim_completion(self.store.as_ref()) {
            self.chime.release();
            if let Err(e) = self.chime.play() {
                warn!(error = %e, "completion alert failed");
            }
            info!(%car, "arrived");
        } else {
            info!(%car, "arrived, alert already delivered by the background alarm");
        }
    }

    /// Resolve due riddle/answer deadlines and reap a finished alert.
    /// Returns true when something visible changed.
    pub fn poll(&mut self) -> bool {
        self.chime.reap();

        let now = self.clock.now_ms();
        let Phase::Riddle(state) = &mut self.phase else {
            return false;
        };

        let mut changed = false;
        if let Some(at) = state.pending_riddle_at {
            if now >= at {
                state.pending_riddle_at = None;
                state.answer = AnswerStage::Hidden;
                if let Some(id) = self.picker.next_id() {
                    debug!(riddle = %id, "next riddle");
                    state.current = Some(id);
                }
                changed = true;
            }
        }
        if let AnswerStage::Pending { reveal_at_ms } = state.answer {
            if now >= reveal_at_ms {
                state.answer = AnswerStage::Revealed;
                changed = true;
            }
        }
        changed
    }

    pub fn stop(&mut self) -> Result<(), TimerError> {
        if !self.is_running() {
            return Err(TimerError::NotRunning);
        }
        self.chime.release();
        self.alarm.cancel();
        logged("clear session", self.store.clear_session());

        self.countdown.remaining_secs = self.countdown.total_secs;
        self.phase = Phase::Idle;
        info!("timer stopped");
        Ok(())
    }

    pub fn enter_riddle_mode(&mut self) -> Result<(), TimerError> {
        let car = match &self.phase {
            Phase::Finished { car } => Some(*car),
            Phase::Riddle(state) => state.car,
            other => {
                return Err(TimerError::InvalidTransition {
                    action: "open a riddle",
                    phase: other.name(),
                })
            }
        };

        self.chime.release();
        logged("clear session", self.store.clear_session());
        logged("reset completion flag", self.store.set_timer_finished(false));

        let mut state = RiddleState::fresh(car);
        state.current = self.picker.next_id();
        debug!(riddle = ?state.current, "riddle mode");
        self.phase = Phase::Riddle(state);
        Ok(())
    }

    pub fn request_another_riddle(&mut self) -> Result<(), TimerError> {
        let at = self.clock.now_ms() + self.delays.riddle_debounce_ms as i64;
        let Phase::Riddle(state) = &mut self.phase else {
            return Err(TimerError::NotInRiddleMode);
        };
        state.answer = AnswerStage::Hidden;
        if state.pending_riddle_at.is_none() {
            state.pending_riddle_at = Some(at);
        }
        Ok(())
    }

    pub fn reveal_answer(&mut self) -> Result<(), TimerError> {
        let at = self.clock.now_ms() + self.delays.reveal_delay_ms as i64;
        let Phase::Riddle(state) = &mut self.phase else {
            return Err(TimerError::NotInRiddleMode);
        };
        if state.current.is_none() {
            return Err(TimerError::NoRiddleShown);
        }
        if state.answer == AnswerStage::Hidden {
            state.answer = AnswerStage::Pending { reveal_at_ms: at };
        }
        Ok(())
    }

    pub fn return_to_idle(&mut self) -> Result<(), TimerError> {
        match &self.phase {
            Phase::Finished { .. } | Phase::Riddle(_) => {}
            other => {
                return Err(TimerError::InvalidTransition {
                    action: "return",
                    phase: other.name(),
                })
            }
        }

        self.chime.release();
        logged("clear session", self.store.clear_session());
        logged("reset completion flag", self.store.set_timer_finished(false));
        self.countdown = Countdown::default();
        self.phase = Phase::Idle;
        info!("back to idle");
        Ok(())
    }

    pub fn current_riddle(&self) -> Option<&Riddle> {
        match &self.phase {
            Phase::Riddle(RiddleState {
                current: Some(id), ..
            }) => self.picker.book().get(id),
            _ => None,
        }
    }

    pub fn answer_stage(&self) -> Option<AnswerStage> {
        match &self.phase {
            Phase::Riddle(state) => Some(state.answer),
            _ => None,
        }
    }

    /// The answer, once the reveal delay has passed
    pub fn answer_text(&self) -> Option<&str> {
        match &self.phase {
            Phase::Riddle(RiddleState {
                current: Some(id),
                answer: AnswerStage::Revealed,
                ..
            }) => Some(self.picker.book().answer(id)),
            _ => None,
        }
    }
}
