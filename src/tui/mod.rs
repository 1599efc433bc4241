//! Terminal client for noughts and crosses.
//!
//! The UI is a thin shell over [`ConnectionManager`]: it renders the latest
//! projection and turns key presses and clicks into move intents. Whether an
//! intent is actually sent is decided by the manager.

mod app;
mod connection;
mod input;
mod ui;
mod ws_client;

pub use app::App;
pub use connection::{
    ClientError, ClientHandle, ConnectionManager, Connector, Link, LinkState, Notification,
    Projection, new_identity,
};
pub use input::{Intent, key_intent, move_cursor};
pub use ws_client::{WsConnector, WsLink};

use crate::config::ClientConfig;
use crate::games::tictactoe::CELL_COUNT;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

/// Run the TUI client
pub async fn run_tui(config: ClientConfig) -> Result<()> {
    // Setup logging to file to avoid interfering with TUI
    let log_file = std::fs::File::create(config.log_file())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init(); // Don't panic if already initialized

    let identity = new_identity();
    info!(server_url = %config.server_url(), %identity, "Starting Noughts & Crosses client");

    let (manager, handle, mut notifications) = ConnectionManager::new(
        WsConnector::new(config.server_url().clone()),
        identity,
        config.reconnect_backoff(),
        config.connect_timeout(),
    );
    let manager_task = tokio::spawn(manager.run());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, handle, &mut notifications).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // The handle was dropped inside run_app, so the manager winds down.
    if let Err(e) = manager_task.await {
        error!(error = %e, "Connection manager task failed");
    }

    if let Err(err) = res {
        error!(error = ?err, "UI loop error");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Draw, drain notifications, read input; until the user quits.
#[instrument(skip_all, fields(identity = %handle.identity()))]
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    handle: ClientHandle,
    notifications: &mut mpsc::UnboundedReceiver<Notification>,
) -> Result<()> {
    let mut app = App::new(handle.identity());
    let mut cells = [Rect::default(); CELL_COUNT];

    loop {
        while let Ok(notification) = notifications.try_recv() {
            app.handle_notification(notification);
        }

        terminal.draw(|f| cells = ui::draw(f, &app))?;

        // Blocking poll; keep it short so notifications stay responsive.
        if !event::poll(Duration::from_millis(50))? {
            tokio::task::yield_now().await;
            continue;
        }
        let intent = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key_intent(key.code),
            Event::Mouse(mouse) => input::mouse_intent(mouse, &cells),
            _ => None,
        };
        let Some(intent) = intent else { continue };

        if let Some(index) = app.handle_intent(intent) {
            debug!(index, "Move intent");
            handle.submit_move(index);
        }
        if app.should_quit() {
            info!("Quit requested");
            return Ok(());
        }
    }
}
