//! Keyboard and mouse mapping.

use crate::games::tictactoe::CELL_COUNT;
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

/// What a terminal event asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Leave the client.
    Quit,
    /// Move the cursor with an arrow key.
    Cursor(KeyCode),
    /// Play the cell under the cursor.
    Confirm,
    /// Play a specific cell.
    Play(usize),
    /// The mouse moved over a cell, or off the grid.
    Hover(Option<usize>),
}

/// Maps a key press. Digits `1`-`9` name cells row by row.
pub fn key_intent(code: KeyCode) -> Option<Intent> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Intent::Quit),
        KeyCode::Char(c @ '1'..='9') => Some(Intent::Play(c as usize - '1' as usize)),
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => Some(Intent::Cursor(code)),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Intent::Confirm),
        _ => None,
    }
}

/// Maps a mouse event against the rendered cell rectangles.
pub fn mouse_intent(event: MouseEvent, cells: &[Rect; CELL_COUNT]) -> Option<Intent> {
    let hit = cell_at(cells, event.column, event.row);
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => hit.map(Intent::Play),
        MouseEventKind::Moved => Some(Intent::Hover(hit)),
        _ => None,
    }
}

/// Index of the cell containing the terminal position, if any.
pub fn cell_at(cells: &[Rect; CELL_COUNT], column: u16, row: u16) -> Option<usize> {
    cells
        .iter()
        .position(|area| area.contains(Position::new(column, row)))
}

/// Moves cursor based on arrow keys. The cursor stops at the edges.
pub fn move_cursor(cursor: usize, key: KeyCode) -> usize {
    let (row, col) = (cursor / 3, cursor % 3);
    let (row, col) = match key {
        KeyCode::Up => (row.saturating_sub(1), col),
        KeyCode::Down => ((row + 1).min(2), col),
        KeyCode::Left => (row, col.saturating_sub(1)),
        KeyCode::Right => (row, (col + 1).min(2)),
        _ => (row, col),
    };
    row * 3 + col
}
