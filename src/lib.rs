// Library surface for headless/integration tests and the binary.
// Keep terminal setup and CLI parsing in main.rs.
pub mod alarm;
pub mod app;
pub mod app_dirs;
pub mod car;
pub mod celebration;
pub mod chime;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod prefs;
pub mod progress;
pub mod riddle;
pub mod runtime;
pub mod timer;
pub mod ui;

pub use app::App;
pub use car::Car;
pub use timer::{Phase, TimerMachine};
