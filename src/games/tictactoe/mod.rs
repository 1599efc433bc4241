//! Noughts and crosses: board model and authoritative game state machine.

mod error;
mod rules;
mod types;

pub use error::{GameError, IllegalMoveReason};
pub use rules::{Game, PlayerId, Seat, Snapshot};
pub use types::{Board, CELL_COUNT, Cell, GameStatus, Mark};
