use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use anyhow::{Context, Result, bail};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use mobhunt_core::{logger, settings::Config};
use mobhunt_core::orchestrator::Orchestrator;
use mobhunt_core::platform::create_window;
use mobhunt_core::screenshot::{DirSink, NoScreenshots, ScreenshotSink};
use mobhunt_core::sleep::SystemClock;
use mobhunt_core::types::{Command, Telemetry};

#[derive(Default)]
struct Args {
    stub: bool,
    replay: Option<PathBuf>,
    config: Option<PathBuf>,
    screenshots: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--stub" => args.stub = true,
            "--replay" => args.replay = Some(it.next().context("--replay needs a directory")?.into()),
            "--config" => args.config = Some(it.next().context("--config needs a path")?.into()),
            "--screenshots" => {
                args.screenshots = Some(it.next().context("--screenshots needs a directory")?.into())
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    logger::init(&cwd.join("logs"))?;

    let config_path = args.config.clone().unwrap_or_else(|| cwd.join("settings.json"));
    let config = Config::load(&config_path)?;

    // the stub is also the fallback when no replay dir is given
    let replay = if args.stub { None } else { args.replay.as_deref() };
    let window = create_window(replay)?;
    let sink: Box<dyn ScreenshotSink> = match &args.screenshots {
        Some(dir) => Box::new(DirSink::new(dir)?),
        None => Box::new(NoScreenshots),
    };

    let telemetry = Arc::new(Mutex::new(Telemetry::default()));
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    logger::set_tui_sender(log_tx);
    logger::install_panic_hook();
    logger::info(&format!("mobhunt started, config {}", config_path.display()));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = mobhunt_tui::App::new(Arc::clone(&telemetry), log_rx, cmd_tx);

    let mut orchestrator = Orchestrator::new(
        config,
        window,
        Arc::new(SystemClock::new()),
        sink,
        telemetry,
        cmd_rx,
    );
    let hunt = thread::spawn(move || orchestrator.run());

    let result = mobhunt_tui::event::run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    // stderr is usable again
    let _ = std::panic::take_hook();

    // dropping the app closes the command channel, which also stops the loop
    drop(app);
    if hunt.join().is_err() {
        logger::error("hunt thread panicked");
    }

    result
}
