//! Application state and logic.

use super::connection::{LinkState, Notification, Projection};
use super::input::{Intent, move_cursor};
use crate::games::tictactoe::{Cell, GameStatus, Mark};
use tracing::debug;

/// Main application state.
#[derive(Debug, Clone)]
pub struct App {
    identity: String,
    projection: Projection,
    link_state: LinkState,
    cursor: usize,
    hover: Option<usize>,
    rejection: Option<String>,
    should_quit: bool,
}

impl App {
    /// Creates the application for the client holding `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            projection: Projection::default(),
            link_state: LinkState::Disconnected,
            cursor: 4,
            hover: None,
            rejection: None,
            should_quit: false,
        }
    }

    /// Latest projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Connectivity shown in the footer.
    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    /// Keyboard cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cell under the mouse, if any.
    pub fn hover(&self) -> Option<usize> {
        self.hover
    }

    /// Whether the user asked to quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Handles a notification from the connection manager.
    pub fn handle_notification(&mut self, notification: Notification) {
        debug!(?notification, "Handling notification");

        match notification {
            Notification::Connected => self.link_state = LinkState::Connected,
            Notification::Disconnected => self.link_state = LinkState::Disconnected,
            Notification::State(projection) => {
                self.projection = projection;
                self.rejection = None;
            }
            Notification::Rejected(message) => self.rejection = Some(message),
        }
    }

    /// Translates an input intent; returns the cell to play, if any.
    pub fn handle_intent(&mut self, intent: Intent) -> Option<usize> {
        match intent {
            Intent::Quit => {
                self.should_quit = true;
                None
            }
            Intent::Cursor(key) => {
                self.cursor = move_cursor(self.cursor, key);
                None
            }
            Intent::Hover(index) => {
                self.hover = index;
                None
            }
            Intent::Confirm => Some(self.cursor),
            Intent::Play(index) => {
                self.cursor = index;
                Some(index)
            }
        }
    }

    /// Our mark as implied by the projection.
    ///
    /// Noughts always move first, so when it is our turn the counts of each
    /// mark on the grid tell us which one we hold.
    pub fn own_mark(&self) -> Option<Mark> {
        let turn = self.projection.whose_turn().as_deref()?;
        let cells = self.projection.grid().cells();
        let noughts = cells.iter().filter(|c| **c == Cell::Nought).count();
        let crosses = cells.iter().filter(|c| **c == Cell::Cross).count();
        let to_move = if noughts == crosses {
            Mark::Nought
        } else {
            Mark::Cross
        };
        match self.projection.status() {
            GameStatus::InProgress if turn == self.identity => Some(to_move),
            GameStatus::InProgress => Some(to_move.opponent()),
            _ => None,
        }
    }

    /// Whether the projection says we may move.
    pub fn my_turn(&self) -> bool {
        *self.projection.status() == GameStatus::InProgress
            && self.projection.whose_turn().as_deref() == Some(self.identity.as_str())
    }

    /// Text for the status line.
    pub fn status_message(&self) -> String {
        if let Some(rejection) = &self.rejection {
            return format!("Rejected: {}", rejection);
        }
        let mine = self.projection.whose_turn().as_deref() == Some(self.identity.as_str());
        match self.projection.status() {
            GameStatus::Awaiting => "Waiting for an opponent...".to_string(),
            GameStatus::InProgress => match (mine, self.own_mark()) {
                (true, Some(mark)) => format!("Your turn ({})", mark),
                (false, Some(mark)) => format!("Opponent's turn (you are {})", mark),
                _ => "Game in progress".to_string(),
            },
            GameStatus::FinishedWon if mine => "You win!".to_string(),
            GameStatus::FinishedWon => "You lose.".to_string(),
            GameStatus::FinishedDraw => "Draw.".to_string(),
        }
    }
}
