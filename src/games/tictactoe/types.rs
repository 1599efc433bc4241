//! Core domain types for noughts and crosses.

use super::error::{GameError, IllegalMoveReason};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// Winning lines: rows, columns, diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2], [3, 4, 5], [6, 7, 8], // Rows
    [0, 3, 6], [1, 4, 7], [2, 5, 8], // Columns
    [0, 4, 8], [2, 4, 6],            // Diagonals
];

/// A player's mark.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Mark {
    /// First player to join; moves first.
    Nought,
    /// Second player to join.
    Cross,
}

impl Mark {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::Nought => Mark::Cross,
            Mark::Cross => Mark::Nought,
        }
    }
}

/// State of a single cell.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Holds a nought.
    Nought,
    /// Holds a cross.
    Cross,
}

impl Cell {
    /// Returns the mark in this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Nought => Some(Mark::Nought),
            Cell::Cross => Some(Mark::Cross),
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Nought => Cell::Nought,
            Mark::Cross => Cell::Cross,
        }
    }
}

/// 3x3 board, cells in row-major order (0-8).
///
/// Serializes as a plain array of nine cell states, which is also the
/// `grid` field of the wire state event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cell at the given index, `None` if out of range.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Returns all cells.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Number of cells holding a mark.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| **c != Cell::Empty).count()
    }

    /// Places `cell` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::IllegalMove`] if the index is outside 0-8, the
    /// target cell is occupied, or `cell` is [`Cell::Empty`].
    #[instrument(skip(self))]
    pub fn apply(&mut self, index: usize, cell: Cell) -> Result<(), GameError> {
        if cell == Cell::Empty {
            return Err(GameError::illegal(index, IllegalMoveReason::EmptyMark));
        }
        let slot = self
            .cells
            .get_mut(index)
            .ok_or(GameError::illegal(index, IllegalMoveReason::OutOfRange))?;
        if *slot != Cell::Empty {
            return Err(GameError::illegal(index, IllegalMoveReason::Occupied));
        }
        *slot = cell;
        Ok(())
    }

    /// Returns the mark occupying a complete row, column or diagonal.
    pub fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|&[a, b, c]| {
            let cell = self.cells[a];
            if cell == self.cells[b] && cell == self.cells[c] {
                cell.mark()
            } else {
                None
            }
        })
    }

    /// Checks if no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| *c != Cell::Empty)
    }
}

impl From<[Cell; CELL_COUNT]> for Board {
    fn from(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }
}

/// Lifecycle of a game. Transitions only move forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameStatus {
    /// Fewer than two players have joined.
    #[default]
    Awaiting,
    /// Both roles assigned, no terminal condition yet.
    InProgress,
    /// A line was completed.
    FinishedWon,
    /// The board filled with no line.
    FinishedDraw,
}

impl GameStatus {
    /// True for `finished_won` and `finished_draw`.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::FinishedWon | GameStatus::FinishedDraw)
    }
}
