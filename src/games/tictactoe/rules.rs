//! Authoritative game state machine.
//!
//! [`Game`] owns the board and decides who may move. It knows nothing about
//! connections: callers identify players by their stable identity string.

use super::error::GameError;
use super::types::{Board, GameStatus, Mark};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Stable identity of a player, carried across reconnects.
pub type PlayerId = String;

/// A role held by an identity.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Seat {
    /// Identity holding this role.
    identity: PlayerId,
    /// Mark assigned to the role.
    mark: Mark,
    /// Whether a live connection is attached.
    attached: bool,
}

/// Full observable game state, sent to clients as a single event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Snapshot {
    /// Game status.
    status: GameStatus,
    /// Identity holding the turn; `None` before the game starts.
    whose_turn: Option<PlayerId>,
    /// The nine cells.
    grid: Board,
}

/// Noughts and crosses engine for a single match.
#[derive(Debug, Clone, Default)]
pub struct Game {
    board: Board,
    status: GameStatus,
    turn: Option<PlayerId>,
    seats: Vec<Seat>,
    winner: Option<Mark>,
    history: Vec<usize>,
}

impl Game {
    /// Creates a game with no players.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Returns the identity whose move is legal.
    pub fn turn(&self) -> Option<&str> {
        self.turn.as_deref()
    }

    /// Returns the winning mark of a finished game.
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    /// Returns the applied cell indices in order.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Returns the assigned roles in join order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Returns the mark held by `identity`.
    pub fn mark_of(&self, identity: &str) -> Option<Mark> {
        self.seat(identity).map(|s| s.mark)
    }

    /// Returns the identity holding `mark`.
    pub fn identity_of(&self, mark: Mark) -> Option<&str> {
        self.seats
            .iter()
            .find(|s| s.mark == mark)
            .map(|s| s.identity.as_str())
    }

    /// Captures the current observable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.status, self.turn.clone(), self.board.clone())
    }

    fn seat(&self, identity: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.identity == identity)
    }

    /// Admits `identity` to the game and returns its mark.
    ///
    /// Joining again with an identity that already holds a role re-attaches
    /// it and changes nothing else. The second distinct identity starts the
    /// game with nought to move.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionFull`] if both roles belong to other
    /// identities.
    #[instrument(skip(self))]
    pub fn join(&mut self, identity: &str) -> Result<Mark, GameError> {
        if let Some(seat) = self.seats.iter_mut().find(|s| s.identity == identity) {
            seat.attached = true;
            debug!(mark = %seat.mark, "Identity resumed existing role");
            return Ok(seat.mark);
        }

        let mark = match self.seats.len() {
            0 => Mark::Nought,
            1 => Mark::Cross,
            _ => {
                warn!("Session already has 2 players");
                return Err(GameError::SessionFull);
            }
        };

        self.seats.push(Seat {
            identity: identity.to_string(),
            mark,
            attached: true,
        });
        info!(%mark, "Assigned role");

        if self.seats.len() == 2 {
            self.status = GameStatus::InProgress;
            self.turn = self.identity_of(Mark::Nought).map(str::to_string);
            info!(turn = ?self.turn, "Both roles assigned, game in progress");
        }

        Ok(mark)
    }

    /// Places the mark of `identity` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotYourTurn`] if the game is not in progress or
    /// `identity` does not hold the turn, and [`GameError::IllegalMove`] if
    /// the board rejects the index. Neither mutates the game.
    #[instrument(skip(self))]
    pub fn submit_move(&mut self, identity: &str, index: usize) -> Result<Snapshot, GameError> {
        if self.status != GameStatus::InProgress || self.turn.as_deref() != Some(identity) {
            warn!(status = %self.status, turn = ?self.turn, "Move out of turn");
            return Err(GameError::NotYourTurn);
        }
        let mark = self.mark_of(identity).ok_or(GameError::NotYourTurn)?;

        self.board.apply(index, mark.into()).inspect_err(|e| {
            warn!(error = %e, "Board rejected move");
        })?;
        self.history.push(index);

        if let Some(winner) = self.board.winner() {
            self.status = GameStatus::FinishedWon;
            self.winner = Some(winner);
            info!(%winner, moves = self.history.len(), "Game won");
        } else if self.board.is_full() {
            self.status = GameStatus::FinishedDraw;
            info!(moves = self.history.len(), "Game drawn");
        } else {
            self.turn = self.identity_of(mark.opponent()).map(str::to_string);
            debug!(turn = ?self.turn, "Turn passed");
        }

        Ok(self.snapshot())
    }

    /// Marks the role of `identity` detached, keeping role and board.
    ///
    /// Returns `false` if `identity` holds no role.
    #[instrument(skip(self))]
    pub fn leave(&mut self, identity: &str) -> bool {
        match self.seats.iter_mut().find(|s| s.identity == identity) {
            Some(seat) => {
                seat.attached = false;
                info!(mark = %seat.mark, "Player detached");
                true
            }
            None => false,
        }
    }
}
