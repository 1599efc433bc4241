//! Client connection manager.
//!
//! [`ConnectionManager`] owns the link to the server and the last applied
//! projection. It cycles `disconnected → connecting → connected` forever,
//! always presenting the same identity token so the server resumes the same
//! role. The presentation layer talks to it through a [`ClientHandle`] and
//! receives [`Notification`]s.

use crate::games::tictactoe::{GameStatus, PlayerId, Snapshot};
use crate::protocol::{ServerFrame, decode_frame, encode_operation};
use async_trait::async_trait;
use derive_more::{Display, Error};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Read-only view of the game held by a client.
pub type Projection = Snapshot;

/// Connectivity of the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum LinkState {
    /// No link; waiting out the backoff.
    #[default]
    Disconnected,
    /// Attempting to open a link.
    Connecting,
    /// Link open.
    Connected,
}

/// Events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A link was established.
    Connected,
    /// The link was lost.
    Disconnected,
    /// A state event replaced the projection.
    State(Projection),
    /// The server rejected one of our operations.
    Rejected(String),
}

/// Error raised by a connector or link.
#[derive(Debug, Clone, Display, Error)]
#[display("Client error: {} at {}:{}", message, file, line)]
pub struct ClientError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ClientError {
    /// Creates a new client error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Opens links to the game server.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Link type produced by this connector.
    type Link: Link;

    /// Opens a link presenting `identity` as the reconnect token.
    async fn connect(&self, identity: &str) -> Result<Self::Link, ClientError>;
}

/// A message-oriented, bidirectional link carrying text frames.
#[async_trait]
pub trait Link: Send + 'static {
    /// Next inbound text frame; `None` once the link is closed.
    async fn recv(&mut self) -> Option<Result<String, ClientError>>;

    /// Sends a text frame.
    async fn send(&mut self, text: String) -> Result<(), ClientError>;

    /// Closes the link normally.
    async fn close(&mut self);
}

/// Why a link stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkEnd {
    /// Dropped by the server or the network; reconnect.
    Dropped,
    /// The handle was dropped; stop.
    Shutdown,
}

/// Handle used by the presentation layer.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    identity: PlayerId,
    intents: mpsc::UnboundedSender<usize>,
    projection: watch::Receiver<Projection>,
    link_state: watch::Receiver<LinkState>,
}

impl ClientHandle {
    /// Own identity token.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Requests a move at `index`; the manager drops it unless it is our turn.
    pub fn submit_move(&self, index: usize) {
        if self.intents.send(index).is_err() {
            debug!(index, "Connection manager stopped, intent dropped");
        }
    }

    /// Latest applied projection.
    pub fn projection(&self) -> Projection {
        self.projection.borrow().clone()
    }

    /// Current connectivity.
    pub fn link_state(&self) -> LinkState {
        *self.link_state.borrow()
    }
}

/// Reconnecting client state machine.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    identity: PlayerId,
    backoff: Duration,
    connect_timeout: Duration,
    projection: watch::Sender<Projection>,
    link_state: watch::Sender<LinkState>,
    notifications: mpsc::UnboundedSender<Notification>,
    intents: mpsc::UnboundedReceiver<usize>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a manager plus the handle and notification stream for the UI.
    ///
    /// The manager stops once every [`ClientHandle`] clone is dropped.
    pub fn new(
        connector: C,
        identity: PlayerId,
        backoff: Duration,
        connect_timeout: Duration,
    ) -> (Self, ClientHandle, mpsc::UnboundedReceiver<Notification>) {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (projection_tx, projection_rx) = watch::channel(Projection::default());
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);

        let handle = ClientHandle {
            identity: identity.clone(),
            intents: intent_tx,
            projection: projection_rx,
            link_state: state_rx,
        };
        let manager = Self {
            connector,
            identity,
            backoff,
            connect_timeout,
            projection: projection_tx,
            link_state: state_tx,
            notifications: notify_tx,
            intents: intent_rx,
        };
        (manager, handle, notify_rx)
    }

    /// Runs the reconnect loop until the handle is dropped.
    #[instrument(skip(self), fields(identity = %self.identity))]
    pub async fn run(mut self) {
        loop {
            self.set_state(LinkState::Connecting);
            let attempt = tokio::select! {
                attempt = tokio::time::timeout(
                    self.connect_timeout,
                    self.connector.connect(&self.identity),
                ) => attempt,
                _ = handle_dropped(&mut self.intents) => {
                    self.set_state(LinkState::Disconnected);
                    info!("Client handle dropped while connecting, stopping");
                    return;
                }
            };

            match attempt {
                Ok(Ok(link)) => {
                    self.set_state(LinkState::Connected);
                    info!("Connected");
                    self.notify(Notification::Connected);
                    self.discard_pending_intents();

                    let end = self.pump(link).await;

                    self.set_state(LinkState::Disconnected);
                    info!(?end, "Disconnected");
                    self.notify(Notification::Disconnected);
                    if end == LinkEnd::Shutdown {
                        return;
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Connection attempt failed");
                    self.set_state(LinkState::Disconnected);
                }
                Err(_) => {
                    warn!(timeout = ?self.connect_timeout, "Connection attempt timed out");
                    self.set_state(LinkState::Disconnected);
                }
            }

            if !self.wait_backoff().await {
                info!("Client handle dropped, stopping");
                return;
            }
        }
    }

    /// Relays frames and intents until the link ends.
    async fn pump(&mut self, mut link: C::Link) -> LinkEnd {
        loop {
            tokio::select! {
                inbound = link.recv() => match inbound {
                    Some(Ok(text)) => self.apply_text(&text),
                    Some(Err(e)) => {
                        warn!(error = %e, "Link failed");
                        return LinkEnd::Dropped;
                    }
                    None => return LinkEnd::Dropped,
                },
                intent = self.intents.recv() => match intent {
                    Some(index) => {
                        if let Err(e) = self.forward_intent(&mut link, index).await {
                            warn!(error = %e, "Failed to send operation");
                            return LinkEnd::Dropped;
                        }
                    }
                    None => {
                        link.close().await;
                        return LinkEnd::Shutdown;
                    }
                },
            }
        }
    }

    /// Applies one inbound frame. State events replace the projection.
    fn apply_text(&mut self, text: &str) {
        match decode_frame(text) {
            Ok(ServerFrame::Data { payload }) => {
                debug!(status = %payload.status(), "State event applied");
                self.projection.send_replace(payload.clone());
                self.notify(Notification::State(payload));
            }
            Ok(ServerFrame::Error { kind, message }) => {
                info!(%kind, %message, "Operation rejected by server");
                self.notify(Notification::Rejected(message));
            }
            Err(e) => warn!(error = %e, "Ignoring undecodable frame"),
        }
    }

    /// Sends the intent if the projection says it is our move.
    async fn forward_intent(&self, link: &mut C::Link, index: usize) -> Result<(), ClientError> {
        if !self.may_move() {
            debug!(index, "Ignoring intent, not our turn");
            return Ok(());
        }
        let text = match encode_operation(index) {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Ignoring invalid intent");
                return Ok(());
            }
        };
        debug!(index, "Sending operation");
        link.send(text).await
    }

    fn may_move(&self) -> bool {
        let projection = self.projection.borrow();
        *projection.status() == GameStatus::InProgress
            && projection.whose_turn().as_deref() == Some(self.identity.as_str())
    }

    /// Sleeps for the backoff while dropping intents. `false` on shutdown.
    async fn wait_backoff(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.backoff) => true,
            _ = handle_dropped(&mut self.intents) => false,
        }
    }

    /// Drops intents queued while the link was down.
    fn discard_pending_intents(&mut self) {
        while let Ok(index) = self.intents.try_recv() {
            debug!(index, "Discarding stale intent");
        }
    }

    fn set_state(&self, state: LinkState) {
        self.link_state.send_replace(state);
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }
}

/// Resolves once every [`ClientHandle`] is gone, dropping intents meanwhile.
async fn handle_dropped(intents: &mut mpsc::UnboundedReceiver<usize>) {
    while let Some(index) = intents.recv().await {
        debug!(index, "Ignoring intent while disconnected");
    }
}

/// Generates a fresh identity token for this client process.
pub fn new_identity() -> PlayerId {
    uuid::Uuid::new_v4().to_string()
}
