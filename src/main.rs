//! Noughts & Crosses - Unified CLI
//!
//! Runs either the websocket game server or the terminal client.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use noughts_and_crosses::{ClientConfig, GameServer, ServerConfig, Settings, run_tui};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    match cli.command {
        Command::Server { host, port } => {
            let mut server = settings.server().clone();
            if let Some(host) = host {
                server = server.with_host(host);
            }
            if let Some(port) = port {
                server = server.with_port(port);
            }
            settings.set_server(server);
            run_server(settings.server().clone()).await
        }
        Command::Client { server_url } => {
            if let Some(url) = server_url {
                let client = settings.client().clone().with_server_url(url);
                settings.set_client(client);
            }
            run_client(settings.client().clone()).await
        }
    }
}

/// Run the websocket game server
async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,noughts_and_crosses=debug")),
        )
        .init();

    info!(host = %config.host(), port = config.port(), "Starting Noughts & Crosses server");

    let listener = TcpListener::bind((config.host().as_str(), *config.port())).await?;
    GameServer::new().serve(listener).await
}

/// Run the terminal client
async fn run_client(config: ClientConfig) -> Result<()> {
    run_tui(config).await
}
