//! Tests for the game state machine and session registry working together.

use noughts_and_crosses::{
    Cell, GameError, GameStatus, IllegalMoveReason, Mark, ServerFrame, SessionRegistry,
};
use tokio::sync::mpsc;

const E: Cell = Cell::Empty;
const N: Cell = Cell::Nought;
const X: Cell = Cell::Cross;

#[test]
fn test_nought_wins_top_row() {
    let mut registry = SessionRegistry::new();
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    assert_eq!(*registry.register("A", tx_a).unwrap().mark(), Mark::Nought);
    assert_eq!(*registry.register("B", tx_b).unwrap().mark(), Mark::Cross);

    let mut last = None;
    for (who, index) in [("A", 0), ("B", 4), ("A", 1), ("B", 5), ("A", 2)] {
        let snapshot = registry.submit_move(who, index).unwrap();
        registry.broadcast(&snapshot);
        last = Some(snapshot);
    }
    let last = last.unwrap();

    assert_eq!(last.grid().cells(), &[N, N, N, E, X, X, E, E, E]);
    assert_eq!(*last.status(), GameStatus::FinishedWon);
    assert_eq!(last.whose_turn().as_deref(), Some("A"));
    assert_eq!(registry.game().winner(), Some(Mark::Nought));
    assert_eq!(registry.game().history(), &[0, 4, 1, 5, 2]);

    // Both players observed the same five states in commit order.
    let mut seen_a = Vec::new();
    while let Ok(frame) = rx_a.try_recv() {
        seen_a.push(frame);
    }
    let mut seen_b = Vec::new();
    while let Ok(frame) = rx_b.try_recv() {
        seen_b.push(frame);
    }
    assert_eq!(seen_a.len(), 5);
    assert_eq!(seen_a, seen_b);
    assert_eq!(seen_a.last(), Some(&ServerFrame::state(last)));
}

#[test]
fn test_moves_after_finish_are_refused() {
    let mut registry = SessionRegistry::new();
    registry.register("A", mpsc::unbounded_channel().0).unwrap();
    registry.register("B", mpsc::unbounded_channel().0).unwrap();
    for (who, index) in [("A", 0), ("B", 4), ("A", 1), ("B", 5), ("A", 2)] {
        registry.submit_move(who, index).unwrap();
    }

    assert_eq!(registry.submit_move("B", 8), Err(GameError::NotYourTurn));
    assert_eq!(registry.submit_move("A", 8), Err(GameError::NotYourTurn));
    assert_eq!(registry.game().board().occupied(), 5);
}

#[test]
fn test_rejected_moves_leave_state_untouched() {
    let mut registry = SessionRegistry::new();
    registry.register("A", mpsc::unbounded_channel().0).unwrap();
    registry.register("B", mpsc::unbounded_channel().0).unwrap();
    registry.submit_move("A", 4).unwrap();
    let before = registry.game().snapshot();

    assert_eq!(
        registry.submit_move("B", 4),
        Err(GameError::illegal(4, IllegalMoveReason::Occupied))
    );
    assert_eq!(
        registry.submit_move("B", 9),
        Err(GameError::illegal(9, IllegalMoveReason::OutOfRange))
    );
    assert_eq!(registry.submit_move("A", 0), Err(GameError::NotYourTurn));
    assert_eq!(registry.game().snapshot(), before);
}

#[test]
fn test_waiting_for_second_player() {
    let mut registry = SessionRegistry::new();
    registry.register("A", mpsc::unbounded_channel().0).unwrap();
    let snapshot = registry.game().snapshot();
    assert_eq!(*snapshot.status(), GameStatus::Awaiting);
    assert_eq!(snapshot.whose_turn(), &None);
    assert_eq!(registry.submit_move("A", 0), Err(GameError::NotYourTurn));
}

#[test]
fn test_disconnected_player_resumes_role_and_turn() {
    let mut registry = SessionRegistry::new();
    let a = registry.register("A", mpsc::unbounded_channel().0).unwrap();
    registry.register("B", mpsc::unbounded_channel().0).unwrap();
    registry.submit_move("A", 0).unwrap();
    registry.submit_move("B", 4).unwrap();

    registry.unregister(*a.connection());
    // B cannot move for the absent player.
    assert_eq!(registry.submit_move("B", 1), Err(GameError::NotYourTurn));

    let again = registry.register("A", mpsc::unbounded_channel().0).unwrap();
    assert_eq!(*again.mark(), Mark::Nought);
    let snapshot = registry.submit_move("A", 1).unwrap();
    assert_eq!(snapshot.grid().cells(), &[N, N, E, E, X, E, E, E, E]);
}
