mod app;
mod dispatch;
mod logging;
mod theme;
mod ui;
mod views;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event as TermEvent, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use labelkit_core::config::DashboardConfig;
use labelkit_core::events::{Event, StatusBus, recv_event};
use labelkit_core::paths;
use ratatui::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;

use app::App;
use theme::Theme;

/// labelkit-tui: terminal dashboard for the annotation workflow
#[derive(Parser, Debug)]
#[command(name = "labelkit-tui", version, about, long_about = None)]
struct Args {
    /// App directory holding labelkit.yaml and the runtime environment
    #[arg(long)]
    app_dir: Option<PathBuf>,

    /// Source dataset for the split action
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output base directory for the split action
    #[arg(long)]
    output: Option<PathBuf>,

    /// Shuffle seed for reproducible splits
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = logging::init();

    // Install panic hook that restores terminal before printing the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original_hook(info);
    }));

    // Load config before entering raw mode so errors print normally.
    let app_dir = match args.app_dir.clone() {
        Some(dir) => dir,
        None => paths::app_dir()?,
    };
    let config = DashboardConfig::load(&app_dir).context("Failed to load config")?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, config, app_dir, args).await;

    // Always restore terminal, even on error.
    restore_terminal()?;

    result
}

/// Main event loop: render, then wait on either a terminal event or the
/// next core event of the running request.
async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: DashboardConfig,
    app_dir: PathBuf,
    args: Args,
) -> Result<()> {
    let theme = Theme::default();
    let warnings = config.validate();

    let mut app = App::new(config, app_dir);
    app.split_source = args.source;
    app.split_output = args.output;
    app.split_seed = args.seed;
    for warning in warnings {
        app.apply_event(Event::Warning(warning));
    }

    let mut term_events = EventStream::new();
    // The running request's channel lives here so the select below can
    // poll it while key handlers mutate the app.
    let mut rx: Option<UnboundedReceiver<Event>> = None;

    while !app.should_quit() {
        terminal.draw(|frame| ui::draw(frame, &app, &theme))?;

        tokio::select! {
            maybe_event = term_events.next() => {
                if let Some(Ok(TermEvent::Key(key))) = maybe_event
                    && key.kind == KeyEventKind::Press
                {
                    app.handle_key(key.code);
                    // A key may have dispatched a new request; adopt its channel.
                    if let Some(new_rx) = app.rx.take() {
                        rx = Some(new_rx);
                    }
                }
            }
            core_event = recv_event(&mut rx) => {
                match core_event {
                    Some(event) => app.apply_event(event),
                    None => {
                        rx = None;
                        app.request_finished();
                    }
                }
            }
        }
    }

    // Terminate any annotation tool this instance spawned: graceful first,
    // then force, then shut down regardless of outcome.
    let (bus, _rx) = StatusBus::channel();
    app.spawned.shutdown(&bus).await;

    Ok(())
}

/// Restore terminal to normal mode.
fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}
