//! One-shot background alarm and the completion handler it triggers.
//!
//! The alarm is a detached copy of this binary running `fire --at <ms>`. It
//! outlives the TUI, sleeps until the end time and then runs
//! [`CompletionHandler::on_alarm`] against the shared preference file.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::chime::Chime;
use crate::prefs::{PreferenceStore, TimerPrefs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled,
    /// Background alarms are switched off; nothing was scheduled
    PermissionRequired,
    /// The helper could not be started; nothing was scheduled
    Unavailable,
}

pub trait AlarmScheduler: Send {
    /// Fire once at or after `at_ms`, even if this process has exited
    fn schedule_one_shot(&mut self, at_ms: i64) -> ScheduleOutcome;

    /// Drop the pending alarm scheduled by this process, if any
    fn cancel(&mut self) {}
}

#[derive(Debug)]
pub struct ProcessAlarmScheduler {
    exe: Option<PathBuf>,
    global_args: Vec<OsString>,
    permitted: bool,
    pending: Option<Child>,
}

impl ProcessAlarmScheduler {
    /// `global_args` are passed before the `fire` subcommand so the helper
    /// sees the same state directory and sound settings.
    pub fn new(exe: Option<PathBuf>, global_args: Vec<OsString>, permitted: bool) -> Self {
        Self {
            exe,
            global_args,
            permitted,
            pending: None,
        }
    }

    pub fn for_current_exe(global_args: Vec<OsString>, permitted: bool) -> Self {
        let exe = match std::env::current_exe() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "cannot locate own executable for background alarms");
                None
            }
        };
        Self::new(exe, global_args, permitted)
    }

    fn command(&self, exe: &PathBuf, at_ms: i64) -> Command {
        let mut cmd = Command::new(exe);
        cmd.args(&self.global_args)
            .arg("fire")
            .arg("--at")
            .arg(at_ms.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // own process group so closing the terminal does not take it down
            cmd.process_group(0);
        }
        cmd
    }
}

impl AlarmScheduler for ProcessAlarmScheduler {
    fn schedule_one_shot(&mut self, at_ms: i64) -> ScheduleOutcome {
        if !self.permitted {
            tracing::info!(at_ms, "background alarm disabled, not scheduling");
            return ScheduleOutcome::PermissionRequired;
        }
        let Some(exe) = self.exe.clone() else {
            return ScheduleOutcome::Unavailable;
        };

        self.cancel();
        match self.command(&exe, at_ms).spawn() {
            Ok(child) => {
                tracing::info!(at_ms, pid = child.id(), "scheduled background alarm");
                self.pending = Some(child);
                ScheduleOutcome::Scheduled
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start background alarm");
                ScheduleOutcome::Unavailable
            }
        }
    }

    fn cancel(&mut self) {
        let Some(mut child) = self.pending.take() else {
            return;
        };
        if let Ok(None) = child.try_wait() {
            if let Err(e) = child.kill() {
                tracing::warn!(error = %e, "failed to cancel background alarm");
            }
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "failed to reap background alarm");
            }
            tracing::debug!("cancelled background alarm");
        }
    }
}

/// Records requests instead of scheduling; clones share the log
#[derive(Debug, Clone)]
pub struct RecordingScheduler {
    permitted: bool,
    scheduled: Arc<Mutex<Vec<i64>>>,
    cancels: Arc<Mutex<usize>>,
}

impl RecordingScheduler {
    pub fn new(permitted: bool) -> Self {
        Self {
            permitted,
            scheduled: Arc::new(Mutex::new(Vec::new())),
            cancels: Arc::new(Mutex::new(0)),
        }
    }

    pub fn scheduled(&self) -> Vec<i64> {
        self.scheduled
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.lock().map(|c| *c).unwrap_or_default()
    }
}

impl AlarmScheduler for RecordingScheduler {
    fn schedule_one_shot(&mut self, at_ms: i64) -> ScheduleOutcome {
        if !self.permitted {
            return ScheduleOutcome::PermissionRequired;
        }
        if let Ok(mut v) = self.scheduled.lock() {
            v.push(at_ms);
        }
        ScheduleOutcome::Scheduled
    }

    fn cancel(&mut self) {
        if let Ok(mut c) = self.cancels.lock() {
            *c += 1;
        }
    }
}

/// Flip `timer_finished` to true. Returns true when this caller is the one
/// that should deliver the alert. Check and set are separate writes.
pub(crate) fn claim_completion(store: &dyn PreferenceStore) -> bool {
    match store.timer_finished() {
        Ok(true) => false,
        Ok(false) => {
            if let Err(e) = store.set_timer_finished(true) {
                tracing::warn!(error = %e, "failed to persist completion flag");
            }
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "completion flag unreadable, alerting anyway");
            if let Err(e) = store.set_timer_finished(true) {
                tracing::warn!(error = %e, "failed to persist completion flag");
            }
            true
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Delivered,
    /// The session the alarm was set for was stopped or replaced
    Stale,
    /// Someone already marked this session finished
    AlreadyDelivered,
}

/// What runs when the background alarm goes off
pub struct CompletionHandler {
    store: Arc<dyn PreferenceStore>,
    chime: Box<dyn Chime>,
}

impl CompletionHandler {
    pub fn new(store: Arc<dyn PreferenceStore>, chime: Box<dyn Chime>) -> Self {
        Self { store, chime }
    }

    pub fn on_alarm(&mut self, expected_end_ms: Option<i64>) -> CompletionOutcome {
        tracing::info!(?expected_end_ms, "alarm received");

        if let Some(expected) = expected_end_ms {
            match self.store.end_time() {
                Ok(Some(end)) if end == expected => {}
                Ok(current) => {
                    tracing::info!(
                        ?current,
                        expected,
                        "alarm is for a session that no longer exists"
                    );
                    return CompletionOutcome::Stale;
                }
                Err(e) => tracing::warn!(error = %e, "cannot verify alarm session"),
            }
        }

        if !claim_completion(self.store.as_ref()) {
            return CompletionOutcome::AlreadyDelivered;
        }
        if let Err(e) = self.chime.play() {
            tracing::warn!(error = %e, "completion alert failed");
        }
        CompletionOutcome::Delivered
    }

    /// Let the alert play out before the process exits
    pub fn finish(mut self) {
        self.chime.finish();
        self.chime.release();
    }
}
