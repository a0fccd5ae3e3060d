use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    ffi::OsString,
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use chrono::{Local, TimeZone};
use nazotimer::{
    alarm::{CompletionHandler, ProcessAlarmScheduler},
    app::{App, KeyOutcome},
    app_dirs::AppDirs,
    car::Car,
    chime::{self, Chime},
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    prefs::{FilePreferenceStore, PreferenceStore, TimerPrefs},
    riddle::{RiddleBook, RiddlePicker},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner, TICK_RATE_MS},
    timer::{secs_until, Collaborators, Phase, TimerMachine},
    ui::format_remaining,
};

/// countdown timer for kids: a car drives to the riddle station
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A countdown timer for kids. Pick how many minutes and a car; the car drives to its destination while the timer runs, and a riddle waits when it arrives."
)]
pub struct Cli {
    /// minutes to count down; with --car the timer starts right away
    #[clap(short = 'm', long)]
    minutes: Option<u32>,

    /// car to drive
    #[clap(short = 'c', long, value_enum)]
    car: Option<Car>,

    /// no sound when the car arrives
    #[clap(long, global = true)]
    no_sound: bool,

    /// config file (defaults to the platform config directory)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// where the saved timer and the log live
    #[clap(long, global = true)]
    state_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// deliver the arrival alert (what the background alarm runs)
    Fire {
        /// wait until this epoch time in milliseconds first
        #[clap(long)]
        at: Option<i64>,
    },
    /// print the saved timer
    Status,
    /// forget the saved timer
    Reset,
}

/// Everything resolved from flags, config and directories
struct Context {
    state_dir: PathBuf,
    config_path: PathBuf,
    config: Config,
    store: Arc<dyn PreferenceStore>,
    sound: bool,
}

impl Context {
    fn chime(&self) -> Box<dyn Chime> {
        chime::for_settings(self.sound, self.config.sound_file.clone())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let state_dir = cli
        .state_dir
        .clone()
        .or_else(AppDirs::state_dir)
        .ok_or("cannot determine a state directory, pass --state-dir")?;
    let _log_guard = logging::init(&state_dir);

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = config_store.load();
    let ctx = Context {
        store: Arc::new(FilePreferenceStore::with_path(AppDirs::prefs_path(&state_dir))),
        config_path: config_store.path().to_path_buf(),
        sound: config.sound && !cli.no_sound,
        state_dir,
        config,
    };

    match cli.command {
        Some(Command::Fire { at }) => fire(&ctx, at),
        Some(Command::Status) => {
            println!("{}", describe_status(ctx.store.as_ref(), SystemClock.now_ms()));
            Ok(())
        }
        Some(Command::Reset) => {
            ctx.store.clear()?;
            tracing::info!("saved timer cleared");
            println!("cleared");
            Ok(())
        }
        None => run_tui(&cli, ctx),
    }
}

fn fire(ctx: &Context, at: Option<i64>) -> Result<(), Box<dyn Error>> {
    if let Some(at) = at {
        let wait = at - SystemClock.now_ms();
        if wait > 0 {
            tracing::debug!(wait_ms = wait, "waiting for alarm time");
            thread::sleep(Duration::from_millis(wait as u64));
        }
    }

    if ctx.sound && !chime::sound_player_available(ctx.config.sound_file.as_deref()) {
        // stdout is /dev/null here, so the bell fallback goes unheard
        tracing::warn!("no sound player or sound file found, the background alert will be silent");
    }
    let mut handler = CompletionHandler::new(ctx.store.clone(), ctx.chime());
    let outcome = handler.on_alarm(at);
    handler.finish();
    tracing::info!(?outcome, "alarm handled");
    Ok(())
}

/// Flags the background helper needs to find the same state and settings
fn helper_args(state_dir: &Path, config_path: &Path, sound: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--state-dir".into(),
        state_dir.into(),
        "--config".into(),
        config_path.into(),
    ];
    if !sound {
        args.push("--no-sound".into());
    }
    args
}

/// Read-only view of the saved timer; unlike a restore it consumes nothing
fn describe_status(store: &dyn PreferenceStore, now_ms: i64) -> String {
    let end = store.end_time().ok().flatten();
    let finished = store.timer_finished().unwrap_or(false);
    let car = store.selected_car().ok().flatten();
    let car_line = car
        .map(|c| format!("\ncar: {} {}", c.glyph(), c.name()))
        .unwrap_or_default();

    match end {
        Some(end) if !finished && end > now_ms => {
            let ends_at = Local
                .timestamp_millis_opt(end)
                .single()
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| end.to_string());
            format!(
                "phase: running{car_line}\n{}\nends at: {ends_at}",
                format_remaining(secs_until(end, now_ms))
            )
        }
        Some(_) => format!("phase: finished{car_line}"),
        None if finished => format!("phase: finished{car_line}"),
        None => "phase: idle".to_string(),
    }
}

fn run_tui(cli: &Cli, ctx: Context) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let book = RiddleBook::load_or_builtin(ctx.config.riddles_path.as_deref());
    let scheduler = ProcessAlarmScheduler::for_current_exe(
        helper_args(&ctx.state_dir, &ctx.config_path, ctx.sound),
        ctx.config.background_alarm,
    );
    let machine = TimerMachine::restore(Collaborators {
        store: ctx.store.clone(),
        clock: Arc::new(SystemClock),
        alarm: Box::new(scheduler),
        chime: ctx.chime(),
        picker: RiddlePicker::new(book),
        delays: ctx.config.delays(),
    });
    tracing::info!(phase = machine.phase().name(), "starting");

    let minutes = cli.minutes.unwrap_or(ctx.config.default_minutes);
    let mut app = App::new(machine, minutes, Some(ctx.config_path));
    if let Some(car) = cli.car {
        app.select_car(car);
    }
    if cli.minutes.is_some() && cli.car.is_some() && app.machine.phase() == &Phase::Idle {
        app.start_selected();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let redraw = match runner.step() {
            AppEvent::Tick => {
                let size = terminal.size()?;
                app.on_tick(size.width, size.height)
            }
            AppEvent::Resize => true,
            AppEvent::Key(key) => {
                if app.on_key(key) == KeyOutcome::Quit {
                    break;
                }
                true
            }
        };

        if redraw {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    tracing::info!(phase = app.machine.phase().name(), "quitting");
    Ok(())
}
