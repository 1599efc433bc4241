//! Stateless UI rendering for noughts and crosses.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::app::App;
use super::connection::LinkState;
use crate::games::tictactoe::{CELL_COUNT, Cell};

const BOARD_WIDTH: u16 = 38;
const BOARD_HEIGHT: u16 = 11;

/// Renders the whole screen and returns the cell rectangles for hit-testing.
pub fn draw(frame: &mut Frame, app: &App) -> [Rect; CELL_COUNT] {
    let [header, board, status, footer] = screen(frame.area());

    let title = Paragraph::new(format!("Noughts & Crosses v{}", env!("CARGO_PKG_VERSION")))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, header);

    let cells = cell_areas(board);
    draw_board(frame, board, &cells, app);

    let status_text = Paragraph::new(app.status_message())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_text, status);

    frame.render_widget(footer_line(app.link_state()), footer);

    cells
}

/// Splits the screen into header, board, status and footer.
fn screen(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),            // Title
            Constraint::Min(BOARD_HEIGHT),    // Board
            Constraint::Length(3),            // Status
            Constraint::Length(1),            // Footer
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

/// Rectangles of the nine cells, row by row, centred in `area`.
pub fn cell_areas(area: Rect) -> [Rect; CELL_COUNT] {
    let board_area = center_rect(area, BOARD_WIDTH, BOARD_HEIGHT);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(board_area);

    let mut cells = [Rect::default(); CELL_COUNT];
    for (r, row) in [rows[0], rows[2], rows[4]].into_iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(12),
                Constraint::Length(1),
                Constraint::Length(12),
                Constraint::Length(1),
                Constraint::Length(12),
            ])
            .split(row);
        cells[r * 3] = cols[0];
        cells[r * 3 + 1] = cols[2];
        cells[r * 3 + 2] = cols[4];
    }
    cells
}

fn draw_board(frame: &mut Frame, area: Rect, cells: &[Rect; CELL_COUNT], app: &App) {
    let board_area = center_rect(area, BOARD_WIDTH, BOARD_HEIGHT);
    let separator = Style::default().fg(Color::DarkGray);

    // Grid lines first; cells are drawn over them.
    for row in [3u16, 7] {
        let line = Rect::new(board_area.x, board_area.y + row, board_area.width, 1);
        frame.render_widget(Paragraph::new("─".repeat(line.width as usize)).style(separator), line);
    }
    for col in [12u16, 25] {
        for row in 0..board_area.height {
            if row == 3 || row == 7 {
                continue;
            }
            let spot = Rect::new(board_area.x + col, board_area.y + row, 1, 1);
            frame.render_widget(Paragraph::new("│").style(separator), spot);
        }
    }

    let grid = app.projection().grid();
    for (index, cell_area) in cells.iter().enumerate() {
        let cell = grid.get(index).unwrap_or_default();
        draw_cell(frame, *cell_area, index, cell, app);
    }
}

fn draw_cell(frame: &mut Frame, area: Rect, index: usize, cell: Cell, app: &App) {
    let (symbol, base_style) = match cell {
        Cell::Empty => (
            format!("{}", index + 1),
            Style::default().fg(Color::DarkGray),
        ),
        Cell::Nought => (
            "O".to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Cell::Cross => (
            "X".to_string(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ),
    };

    let style = if index == app.cursor() {
        base_style.bg(Color::White).fg(Color::Black)
    } else if app.hover() == Some(index) && cell == Cell::Empty && app.my_turn() {
        base_style.bg(Color::DarkGray).fg(Color::White)
    } else {
        base_style
    };

    // Vertically centre the symbol in the three-line cell.
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}  ", symbol), style)),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

/// Footer with key help and the connection indicator.
fn footer_line(state: LinkState) -> Paragraph<'static> {
    let (label, color) = match state {
        LinkState::Connected => ("Connected", Color::Green),
        LinkState::Connecting | LinkState::Disconnected => ("Disconnected", Color::Red),
    };
    Paragraph::new(Line::from(vec![
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" Quit | Websocket: "),
        Span::styled(label, Style::default().fg(color)),
    ]))
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((area.height.saturating_sub(height)) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((area.width.saturating_sub(width)) / 2),
        ])
        .split(vert[1])[1]
}
