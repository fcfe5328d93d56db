//! castui - terminal front-end for casting media URLs to Chromecasts
//!
//! Discovers devices and drives playback through the `catt` command-line
//! tool; castui itself only builds arguments, parses output and keeps the
//! screen in sync.
//!
//! # Usage
//!
//! ```bash
//! castui
//! castui --device "Living Room TV" --timeout 30
//! CASTUI_LOG=debug castui --log-file /tmp/castui.log
//! ```

use std::io::{stdout, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use castui::app::App;
use castui::cli::Cli;
use castui::config::{Config, Settings};
use castui::tool::CattRunner;
use castui::ui;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file still starts the UI; the error is logged once
    // the subscriber exists
    let (config, config_error) = match cli.config.clone().or_else(Config::path) {
        Some(path) => match Config::load_from(&path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
        None => (Config::default(), None),
    };
    let settings = Settings::resolve(config, &cli, std::env::var("CASTUI_LOG").ok());

    if let Some(path) = &settings.log_file {
        // Logging is best effort; the UI works without it
        if let Err(e) = init_logging(path, &settings.log_filter) {
            eprintln!("castui: logging disabled: {:#}", e);
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), catt = %settings.catt_path, "castui starting");
    if let Some(e) = config_error {
        tracing::warn!(error = %format!("{:#}", e), "invalid config, using defaults");
    }

    run_tui(settings).await
}

/// Send tracing output to `path`; stdout belongs to the TUI
fn init_logging(path: &Path, filter: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_env_filter(env_filter)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(settings: Settings) -> Result<()> {
    let runner = Arc::new(CattRunner::with_path(settings.catt_path.clone()));
    let mut app = App::new(runner, settings);

    let mut terminal = init_terminal()?;

    app.startup();
    let result = run_event_loop(&mut terminal, &mut app).await;

    // Kill any catt still running before handing the terminal back
    app.shutdown();
    restore_terminal(&mut terminal)?;
    tracing::info!("castui exiting");

    result
}

/// Main event loop - handles input, applies background results, renders UI
async fn run_event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(100);

    while app.running {
        terminal.draw(|frame| ui::render(frame, app))?;

        // crossterm's poll blocks; keep it off the runtime's worker threads
        let ready = tokio::task::block_in_place(|| event::poll(TICK_RATE))?;
        if ready {
            match event::read()? {
                // Only handle key press events (ignore releases on Windows)
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key);
                }
                Event::Paste(text) => app.paste(&text),
                _ => {}
            }
        }

        // Apply whatever the background worker finished since the last tick
        app.poll();
        app.tick(Instant::now());
    }

    Ok(())
}
