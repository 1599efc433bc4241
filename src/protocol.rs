//! Wire protocol shared by the server and the terminal client.
//!
//! Every message is a JSON text frame:
//!
//! - client → server: `{"payload": {"turn": 4}}`
//! - server → client: `{"data": {"payload": {"status": .., "whose_turn": .., "grid": [..]}}}`
//! - server → offending client: `{"error": {"kind": "not_your_turn", "message": ".."}}`

use crate::games::tictactoe::{CELL_COUNT, GameError, Snapshot};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Cookie carrying the player identity on the websocket handshake.
pub const PLAYER_COOKIE: &str = "player_id";

/// Close code sent when both roles are taken.
pub const CLOSE_SESSION_FULL: u16 = 4000;

/// Close reason paired with [`CLOSE_SESSION_FULL`].
pub const SESSION_FULL_REASON: &str = "session full";

/// Close code (policy violation) sent when the handshake carries no identity.
pub const CLOSE_MISSING_IDENTITY: u16 = 1008;

/// A request to mark one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operation {
    /// Cell index, 0-8.
    pub turn: u8,
}

impl Operation {
    /// Builds an operation, checking the index range.
    pub fn new(index: usize) -> Result<Self, ProtocolError> {
        u8::try_from(index)
            .ok()
            .filter(|turn| usize::from(*turn) < CELL_COUNT)
            .map(|turn| Self { turn })
            .ok_or(ProtocolError::OutOfRange {
                turn: i64::try_from(index).unwrap_or(i64::MAX),
            })
    }

    /// Cell index as `usize`.
    pub fn index(self) -> usize {
        usize::from(self.turn)
    }
}

#[derive(Serialize)]
struct OperationFrame {
    payload: Operation,
}

/// Inbound shape before range checking; `turn` is wide so that
/// out-of-range integers are reported as such rather than as parse noise.
#[derive(Deserialize)]
struct RawOperationFrame {
    payload: RawOperation,
}

#[derive(Deserialize)]
struct RawOperation {
    turn: i64,
}

/// Kind of a rejected operation echoed to the player who sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectionKind {
    /// Occupied cell or index out of range.
    IllegalMove,
    /// Wrong player or game not in progress.
    NotYourTurn,
}

/// Message sent from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full game state snapshot.
    Data {
        /// The snapshot.
        payload: Snapshot,
    },
    /// A rejected operation, sent only to its sender.
    Error {
        /// What went wrong.
        kind: RejectionKind,
        /// Human-readable description.
        message: String,
    },
}

impl ServerFrame {
    /// Wraps a snapshot as a state event.
    pub fn state(snapshot: Snapshot) -> Self {
        Self::Data { payload: snapshot }
    }

    /// Builds the rejection echoed for a move-time error.
    ///
    /// Returns `None` for [`GameError::SessionFull`], which is reported by
    /// closing the connection instead.
    pub fn rejection(error: &GameError) -> Option<Self> {
        let kind = match error {
            GameError::IllegalMove { .. } => RejectionKind::IllegalMove,
            GameError::NotYourTurn => RejectionKind::NotYourTurn,
            GameError::SessionFull => return None,
        };
        Some(Self::Error {
            kind,
            message: error.to_string(),
        })
    }
}

/// Malformed or unencodable message.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ProtocolError {
    /// Not JSON, or not the expected shape.
    #[display("Malformed message: {reason}")]
    Malformed {
        /// Parser diagnostic.
        reason: String,
    },

    /// Cell index outside 0-8.
    #[display("Cell index {turn} out of range 0-8")]
    OutOfRange {
        /// The offending index.
        turn: i64,
    },

    /// Serialization failed.
    #[display("Failed to encode message: {reason}")]
    Encode {
        /// Serializer diagnostic.
        reason: String,
    },
}

/// Encodes a move request for cell `index`.
#[instrument]
pub fn encode_operation(index: usize) -> Result<String, ProtocolError> {
    let frame = OperationFrame {
        payload: Operation::new(index)?,
    };
    serde_json::to_string(&frame).map_err(|e| ProtocolError::Encode {
        reason: e.to_string(),
    })
}

/// Decodes a move request.
///
/// # Errors
///
/// [`ProtocolError::Malformed`] for anything that is not
/// `{"payload": {"turn": <integer>}}`, [`ProtocolError::OutOfRange`] for an
/// integer outside 0-8.
#[instrument(skip(text), fields(len = text.len()))]
pub fn decode_operation(text: &str) -> Result<Operation, ProtocolError> {
    let raw: RawOperationFrame =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
            reason: e.to_string(),
        })?;
    let turn = raw.payload.turn;
    usize::try_from(turn)
        .map_err(|_| ProtocolError::OutOfRange { turn })
        .and_then(|index| Operation::new(index).map_err(|_| ProtocolError::OutOfRange { turn }))
}

/// Encodes a server message.
#[instrument(skip(frame))]
pub fn encode_frame(frame: &ServerFrame) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(|e| ProtocolError::Encode {
        reason: e.to_string(),
    })
}

/// Decodes a server message.
#[instrument(skip(text), fields(len = text.len()))]
pub fn decode_frame(text: &str) -> Result<ServerFrame, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
        reason: e.to_string(),
    })
}
