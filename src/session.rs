//! Session registry: which identity owns which live connection.

use crate::games::tictactoe::{Game, GameError, Mark, PlayerId, Snapshot};
use crate::protocol::ServerFrame;
use derive_getters::Getters;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Server-assigned identifier of one websocket connection.
pub type ConnectionId = u64;

/// Outbound queue of one connection, drained by its writer task.
pub type Outbox = mpsc::UnboundedSender<ServerFrame>;

#[derive(Debug)]
struct Attachment {
    identity: PlayerId,
    outbox: Outbox,
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct Registration {
    /// Handle of the attached connection.
    connection: ConnectionId,
    /// Role of the identity.
    mark: Mark,
}

/// The game plus the connections attached to it.
///
/// Role assignment is delegated to [`Game::join`]; the registry only tracks
/// which connection currently speaks for each identity.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    game: Game,
    connections: HashMap<ConnectionId, Attachment>,
    next_connection: ConnectionId,
}

impl SessionRegistry {
    /// Creates a registry around a fresh game.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating game session");
        Self::default()
    }

    /// Returns the game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Number of attached connections.
    pub fn attached(&self) -> usize {
        self.connections.len()
    }

    /// Identity owning `connection`, if it is still attached.
    pub fn identity_of(&self, connection: ConnectionId) -> Option<&str> {
        self.connections
            .get(&connection)
            .map(|a| a.identity.as_str())
    }

    /// Attaches a connection for `identity`, joining the game if needed.
    ///
    /// Any older connection of the same identity is detached and its outbox
    /// dropped, which closes it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionFull`] if both roles belong to other
    /// identities.
    #[instrument(skip(self, outbox))]
    pub fn register(&mut self, identity: &str, outbox: Outbox) -> Result<Registration, GameError> {
        let mark = self.game.join(identity)?;

        let superseded: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, a)| a.identity == identity)
            .map(|(id, _)| *id)
            .collect();
        for id in superseded {
            self.connections.remove(&id);
            info!(connection = id, "Superseded older connection of the same identity");
        }

        let connection = self.next_connection;
        self.next_connection += 1;
        self.connections.insert(
            connection,
            Attachment {
                identity: identity.to_string(),
                outbox,
            },
        );
        info!(connection, %mark, "Connection registered");

        Ok(Registration { connection, mark })
    }

    /// Detaches `connection`, keeping its identity's role.
    ///
    /// Returns the identity it belonged to, or `None` if it was already
    /// detached or superseded.
    #[instrument(skip(self))]
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<PlayerId> {
        let Some(attachment) = self.connections.remove(&connection) else {
            debug!("Connection already detached");
            return None;
        };
        self.game.leave(&attachment.identity);
        info!(identity = %attachment.identity, "Connection unregistered");
        Some(attachment.identity)
    }

    /// Applies a move through the game.
    pub fn submit_move(&mut self, identity: &str, index: usize) -> Result<Snapshot, GameError> {
        self.game.submit_move(identity, index)
    }

    /// Queues `snapshot` on every attached connection.
    ///
    /// Delivery failures are logged and the connection detached; they never
    /// reach the caller. Returns the number of connections reached.
    #[instrument(skip(self, snapshot), fields(status = %snapshot.status()))]
    pub fn broadcast(&mut self, snapshot: &Snapshot) -> usize {
        let frame = ServerFrame::state(snapshot.clone());
        let mut dropped = Vec::new();
        for (id, attachment) in &self.connections {
            if attachment.outbox.send(frame.clone()).is_err() {
                warn!(connection = id, identity = %attachment.identity, "Broadcast to dropped connection");
                dropped.push(*id);
            }
        }
        for id in &dropped {
            self.unregister(*id);
        }
        let reached = self.connections.len();
        debug!(reached, dropped = dropped.len(), "Broadcast complete");
        reached
    }

    /// Queues `frame` on a single connection. Returns `false` if it is gone.
    #[instrument(skip(self, frame))]
    pub fn send_to(&mut self, connection: ConnectionId, frame: ServerFrame) -> bool {
        let delivered = self
            .connections
            .get(&connection)
            .is_some_and(|a| a.outbox.send(frame).is_ok());
        if !delivered {
            warn!("Direct send to dropped connection");
            self.unregister(connection);
        }
        delivered
    }
}

/// Shared, serialized access to the session registry.
///
/// Every mutation runs under one lock, so joins, moves and leaves from
/// different connections never interleave.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionRegistry>>,
}

impl SharedSession {
    /// Creates a handle to a fresh session.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionRegistry::new())),
        }
    }

    /// Runs `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionRegistry) -> R) -> R {
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut registry)
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.with(|registry| registry.game().snapshot())
    }
}
