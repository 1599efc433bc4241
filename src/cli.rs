//! Command-line interface for noughts_and_crosses.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Noughts & Crosses - two-player game synced over websockets
#[derive(Parser, Debug)]
#[command(name = "noughts_and_crosses")]
#[command(about = "Real-time noughts and crosses server and terminal client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (optional; defaults apply if missing)
    #[arg(long, global = true, default_value = "noughts.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the websocket game server
    Server {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the terminal client
    Client {
        /// Websocket URL of the game server
        #[arg(long)]
        server_url: Option<String>,
    },
}
