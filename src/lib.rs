//! Noughts & Crosses - real-time two-player session sync
//!
//! A server hosts one game of noughts and crosses over websockets; terminal
//! clients connect, are assigned a role by their identity cookie, and keep a
//! read-only projection of the game that the server replaces on every change.
//!
//! # Architecture
//!
//! - **Games**: Board model and turn-enforcing state machine
//! - **Protocol**: JSON frames exchanged over the websocket
//! - **Session**: Identity to connection registry with ordered fan-out
//! - **Server**: Axum websocket endpoint running one session loop per connection
//! - **Tui**: Reconnecting connection manager and ratatui presentation
//!
//! # Example
//!
//! ```no_run
//! use noughts_and_crosses::GameServer;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! GameServer::new().serve(listener).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod games;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tui;

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError, ServerConfig, Settings};

// Crate-level exports - Server types
pub use server::GameServer;

// Crate-level exports - Session management
pub use session::{ConnectionId, Registration, SessionRegistry, SharedSession};

// Crate-level exports - Wire protocol
pub use protocol::{Operation, ProtocolError, RejectionKind, ServerFrame};

// Crate-level exports - Client
pub use tui::{
    ClientError, ClientHandle, ConnectionManager, Connector, Link, LinkState, Notification,
    Projection, WsConnector, new_identity, run_tui,
};

// Crate-level exports - Game types
pub use games::tictactoe::{
    Board, Cell, Game, GameError, GameStatus, IllegalMoveReason, Mark, PlayerId, Snapshot,
};
