//! Websocket game server.
//!
//! One [`GameServer`] hosts a single match. Each websocket connection runs a
//! session loop: the identity comes from the `player_id` cookie, inbound
//! operations are applied under the session lock, and the resulting state is
//! fanned out to every attached connection through its outbox.

use crate::games::tictactoe::{GameError, PlayerId};
use crate::protocol::{
    CLOSE_MISSING_IDENTITY, CLOSE_SESSION_FULL, PLAYER_COOKIE, SESSION_FULL_REASON, ServerFrame,
    decode_operation, encode_frame,
};
use crate::session::{ConnectionId, SharedSession};
use axum::Router;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum_extra::extract::CookieJar;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, instrument, warn};

/// Main server handler.
#[derive(Debug, Clone, Default)]
pub struct GameServer {
    session: SharedSession,
}

impl GameServer {
    /// Creates a server hosting a fresh game.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating game server");
        Self {
            session: SharedSession::new(),
        }
    }

    /// Returns the hosted session.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Builds the router exposing `GET /ws`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .layer(middleware::map_request(log_request))
            .with_state(self.clone())
    }

    /// Serves on `listener` until the process exits.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "Server ready at ws://{}/ws", addr);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Runs the session loop of one connection until it closes.
    #[instrument(skip(self, socket))]
    async fn handle_socket(self, socket: WebSocket, identity: Option<PlayerId>) {
        let (mut sink, mut stream) = socket.split();

        let Some(identity) = identity else {
            warn!("Handshake carried no identity");
            close(&mut sink, CLOSE_MISSING_IDENTITY, "missing identity").await;
            return;
        };

        let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerFrame>();
        let registration = self.session.with(|registry| {
            let registration = registry.register(&identity, outbox)?;
            let snapshot = registry.game().snapshot();
            registry.broadcast(&snapshot);
            Ok::<_, GameError>(registration)
        });
        let connection = match registration {
            Ok(registration) => *registration.connection(),
            Err(e) => {
                warn!(error = %e, "Refusing connection");
                close(&mut sink, CLOSE_SESSION_FULL, SESSION_FULL_REASON).await;
                return;
            }
        };

        let mut writer = tokio::spawn(
            async move {
                while let Some(frame) = inbox.recv().await {
                    let text = match encode_frame(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            error!(error = %e, "Failed to encode frame");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        debug!(error = %e, "Socket write failed");
                        return;
                    }
                }
                // Outbox dropped by the registry: this connection was superseded.
                close(&mut sink, 1000, "superseded").await;
            }
            .in_current_span(),
        );

        loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_operation(connection, &identity, text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Client closed connection");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Dropping binary frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Connection failed");
                        break;
                    }
                    None => break,
                },
                _ = &mut writer => {
                    debug!("Writer finished, closing session loop");
                    break;
                }
            }
        }

        self.session.with(|registry| registry.unregister(connection));
        writer.abort();
        info!("Session loop ended");
    }

    /// Decodes and applies one inbound operation.
    #[instrument(skip(self, text))]
    fn handle_operation(&self, connection: ConnectionId, identity: &str, text: &str) {
        let operation = match decode_operation(text) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(error = %e, "Dropping malformed operation");
                return;
            }
        };
        debug!(index = operation.index(), "Operation received");

        self.session.with(|registry| {
            if registry.identity_of(connection).is_none() {
                debug!("Operation from detached connection ignored");
                return;
            }
            match registry.submit_move(identity, operation.index()) {
                Ok(snapshot) => {
                    registry.broadcast(&snapshot);
                }
                Err(e) => {
                    if let Some(frame) = ServerFrame::rejection(&e) {
                        registry.send_to(connection, frame);
                    }
                }
            }
        });
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    jar: CookieJar,
    State(server): State<GameServer>,
) -> Response {
    let identity = jar
        .get(PLAYER_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|identity| !identity.is_empty());
    ws.on_upgrade(move |socket| server.handle_socket(socket, identity))
}

async fn log_request(req: Request) -> Request {
    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

async fn close(sink: &mut SplitSink<WebSocket, Message>, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Failed to send close frame");
    }
}
