use std::io;
use std::time::Duration;

use clap::Parser;
use ratatui::crossterm::event;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use paperwatch_api::{ApiClient, PaperQuery, DEFAULT_BASE_URL};
use paperwatch_core::Engine;

mod action;
mod app;
mod backend;
mod input;
mod theme;
mod ui_event;
mod view;

use action::Action;
use app::App;

/// Paperwatch dashboard — tracked arXiv papers with live analysis streams.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Backend API base URL
    #[arg(long)]
    api: Option<String>,

    /// Maximum papers to load
    #[arg(long, default_value_t = 100)]
    limit: u32,

    /// Only show papers scored at least this relevant
    #[arg(long)]
    min_score: Option<u8>,

    /// Only show processed papers
    #[arg(long)]
    processed_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Resolve config from CLI flags > env vars > defaults
    let base_url = args
        .api
        .or_else(|| std::env::var("PAPERWATCH_API").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let query = PaperQuery {
        skip: 0,
        limit: args.limit,
        min_score: args.min_score,
        processed_only: args.processed_only,
    };

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let mut app = App::new();

    let api = ApiClient::new(base_url);
    let (engine_tx, mut engine_rx) = mpsc::unbounded_channel();
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let engine = Engine::new(api.clone(), engine_tx);

    backend::spawn_load(api.clone(), query, ui_tx.clone());

    // Also handle Ctrl+C at the OS level for clean shutdown
    let engine_for_signal = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_for_signal.abort_all();
        }
    });

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        // Draw
        terminal.draw(|f| app.view(f))?;

        let timeout = tick_rate;

        tokio::select! {
            // Engine events (non-blocking drain)
            maybe_event = engine_rx.recv() => {
                if let Some(engine_event) = maybe_event {
                    app.handle_engine_event(engine_event);
                    while let Ok(evt) = engine_rx.try_recv() {
                        app.handle_engine_event(evt);
                    }
                }
            }
            // Background I/O results
            maybe_event = ui_rx.recv() => {
                if let Some(ui_event) = maybe_event {
                    let first_load = !app.initial_loaded;
                    app.handle_ui_event(ui_event);
                    // Recovery scan: papers a previous session left mid-
                    // processing re-enter a batch, once, right after load.
                    if first_load && app.initial_loaded {
                        let stuck = app.store.recovery_candidates();
                        engine.recover_stuck(stuck);
                    }
                }
            }
            // Terminal input events
            _ = async {
                if event::poll(timeout).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        match input::map_event(&evt) {
                            Action::Retry => {
                                if let Some(id) = app.selected_paper_id() {
                                    engine.retry_paper(id);
                                }
                            }
                            Action::Fetch => {
                                if !engine.start_fetch() {
                                    app.status = Some("A fetch is already running".to_string());
                                }
                            }
                            Action::Batch => {
                                backend::spawn_batch_pending(engine.clone(), ui_tx.clone());
                            }
                            Action::Delete => {
                                if let Some(id) = app.selected_paper_id() {
                                    backend::spawn_delete(api.clone(), id, ui_tx.clone());
                                }
                            }
                            Action::Reload => {
                                app.needs_reload = true;
                            }
                            action => {
                                app.update(action);
                            }
                        }
                    }
                }
            } => {}
        }

        // Process tick
        app.update(Action::Tick);
        app.batch_gauge = engine.batch_snapshot();
        app.batch_running = engine.is_batch_running();

        if app.needs_reload {
            app.needs_reload = false;
            backend::spawn_load(api.clone(), query, ui_tx.clone());
        }

        if app.should_quit {
            engine.abort_all();
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
