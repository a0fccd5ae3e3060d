//! Error types shared across the timer, store, riddle and alert modules.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected state machine operations. State is left untouched when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("duration must be a positive number of minutes, got {0}")]
    InvalidDuration(u32),

    #[error("a timer is already running")]
    AlreadyRunning,

    #[error("no timer is running")]
    NotRunning,

    #[error("not in riddle mode")]
    NotInRiddleMode,

    #[error("no riddle is shown yet")]
    NoRiddleShown,

    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
}

/// Preference store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preferences file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("preference '{key}' holds a {found} value")]
    InvalidValue { key: String, found: &'static str },
}

/// Riddle pack loading failures.
#[derive(Error, Debug)]
pub enum RiddleError {
    #[error("failed to read riddle pack {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("riddle pack is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("riddle pack contains no riddles")]
    EmptyPack,
}

/// Completion alert playback failures.
#[derive(Error, Debug)]
pub enum ChimeError {
    #[error("alert playback failed: {0}")]
    Io(#[from] std::io::Error),
}
