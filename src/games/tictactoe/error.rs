//! Errors raised by the board and the game state machine.

use derive_more::{Display, Error};

/// Why a move was refused by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum IllegalMoveReason {
    /// Index outside 0-8.
    #[display("index out of range")]
    OutOfRange,
    /// The target cell already holds a mark.
    #[display("cell already occupied")]
    Occupied,
    /// Attempted to place an empty cell.
    #[display("empty is not a mark")]
    EmptyMark,
}

/// Error that can occur when joining a game or submitting a move.
///
/// Every variant is terminal for the single operation that caused it and
/// leaves the game state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// The board rejected the move.
    #[display("Illegal move at {index}: {reason}")]
    IllegalMove {
        /// Requested cell index.
        index: usize,
        /// Why the board refused it.
        reason: IllegalMoveReason,
    },

    /// The identity does not hold the turn, or the game is not in progress.
    #[display("Not your turn")]
    NotYourTurn,

    /// Both roles are already held by other identities.
    #[display("Session already has 2 players")]
    SessionFull,
}

impl GameError {
    /// Shorthand for an [`GameError::IllegalMove`].
    pub fn illegal(index: usize, reason: IllegalMoveReason) -> Self {
        Self::IllegalMove { index, reason }
    }
}
