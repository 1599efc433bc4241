//! Websocket server tests over real sockets.

use futures::{SinkExt, StreamExt};
use noughts_and_crosses::protocol::decode_frame;
use noughts_and_crosses::{
    Cell, ConnectionManager, GameServer, GameStatus, Notification, Projection, RejectionKind,
    ServerFrame, Snapshot, WsConnector,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const E: Cell = Cell::Empty;
const N: Cell = Cell::Nought;
const X: Cell = Cell::Cross;

async fn start_server() -> SocketAddr {
    start_server_with(GameServer::new()).await
}

async fn start_server_with(server: GameServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));
    addr
}

async fn connect(addr: SocketAddr, identity: Option<&str>) -> Client {
    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    if let Some(identity) = identity {
        let cookie = HeaderValue::from_str(&format!("player_id={}", identity)).unwrap();
        request.headers_mut().insert(header::COOKIE, cookie);
    }
    let (ws, _) = connect_async(request).await.unwrap();
    ws
}

async fn next_message(ws: &mut Client) -> Message {
    timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("read failed")
}

async fn next_frame(ws: &mut Client) -> ServerFrame {
    match next_message(ws).await {
        Message::Text(text) => decode_frame(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

async fn next_state(ws: &mut Client) -> Snapshot {
    match next_frame(ws).await {
        ServerFrame::Data { payload } => payload,
        other => panic!("expected a state event, got {:?}", other),
    }
}

async fn expect_close(ws: &mut Client) -> (u16, String) {
    match next_message(ws).await {
        Message::Close(Some(frame)) => (u16::from(frame.code), frame.reason.as_str().to_string()),
        other => panic!("expected a close frame, got {:?}", other),
    }
}

async fn send_move(ws: &mut Client, index: i64) {
    let text = format!(r#"{{"payload":{{"turn":{}}}}}"#, index);
    ws.send(Message::text(text)).await.unwrap();
}

async fn assert_silent(ws: &mut Client) {
    assert!(
        timeout(Duration::from_millis(200), ws.next()).await.is_err(),
        "unexpected message"
    );
}

/// Connects both players and drains the join events.
async fn start_match(addr: SocketAddr) -> (Client, Client) {
    let mut a = connect(addr, Some("A")).await;
    assert_eq!(*next_state(&mut a).await.status(), GameStatus::Awaiting);
    let mut b = connect(addr, Some("B")).await;
    let seen_a = next_state(&mut a).await;
    let seen_b = next_state(&mut b).await;
    assert_eq!(seen_a, seen_b);
    (a, b)
}

#[tokio::test]
async fn test_join_events() {
    let addr = start_server().await;

    let mut a = connect(addr, Some("A")).await;
    let first = next_state(&mut a).await;
    assert_eq!(*first.status(), GameStatus::Awaiting);
    assert_eq!(first.whose_turn(), &None);
    assert_eq!(first.grid().cells(), &[E; 9]);

    let mut b = connect(addr, Some("B")).await;
    for ws in [&mut a, &mut b] {
        let state = next_state(ws).await;
        assert_eq!(*state.status(), GameStatus::InProgress);
        assert_eq!(state.whose_turn().as_deref(), Some("A"));
    }
}

#[tokio::test]
async fn test_full_game_broadcast_in_order() {
    let addr = start_server().await;
    let (mut a, mut b) = start_match(addr).await;

    for (mover, index) in [("A", 0), ("B", 4), ("A", 1), ("B", 5), ("A", 2)] {
        let ws = if mover == "A" { &mut a } else { &mut b };
        send_move(ws, index).await;
        let seen_a = next_state(&mut a).await;
        let seen_b = next_state(&mut b).await;
        assert_eq!(seen_a, seen_b);
        assert_eq!(seen_a.grid().get(index as usize), Some(if mover == "A" { N } else { X }));
    }

    send_move(&mut b, 8).await;
    match next_frame(&mut b).await {
        ServerFrame::Error { kind, .. } => assert_eq!(kind, RejectionKind::NotYourTurn),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_final_state_of_winning_game() {
    let addr = start_server().await;
    let (mut a, mut b) = start_match(addr).await;

    let mut last = None;
    for (mover, index) in [("A", 0), ("B", 4), ("A", 1), ("B", 5), ("A", 2)] {
        let ws = if mover == "A" { &mut a } else { &mut b };
        send_move(ws, index).await;
        next_state(&mut b).await;
        last = Some(next_state(&mut a).await);
    }
    let last = last.unwrap();
    assert_eq!(last.grid().cells(), &[N, N, N, E, X, X, E, E, E]);
    assert_eq!(*last.status(), GameStatus::FinishedWon);
}

#[tokio::test]
async fn test_hosted_session_matches_broadcast() {
    let server = GameServer::new();
    let addr = start_server_with(server.clone()).await;
    let (mut a, mut b) = start_match(addr).await;

    send_move(&mut a, 4).await;
    let seen = next_state(&mut a).await;
    next_state(&mut b).await;

    assert_eq!(server.session().snapshot(), seen);
    server.session().with(|registry| {
        assert_eq!(registry.attached(), 2);
        assert_eq!(registry.game().history(), &[4]);
    });
}

#[tokio::test]
async fn test_rejection_only_reaches_offender() {
    let addr = start_server().await;
    let (mut a, mut b) = start_match(addr).await;

    send_move(&mut b, 0).await;
    match next_frame(&mut b).await {
        ServerFrame::Error { kind, message } => {
            assert_eq!(kind, RejectionKind::NotYourTurn);
            assert!(!message.is_empty());
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_silent(&mut a).await;

    send_move(&mut a, 4).await;
    next_state(&mut a).await;
    next_state(&mut b).await;

    send_move(&mut b, 4).await;
    match next_frame(&mut b).await {
        ServerFrame::Error { kind, .. } => assert_eq!(kind, RejectionKind::IllegalMove),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_malformed_input_is_dropped() {
    let addr = start_server().await;
    let (mut a, mut b) = start_match(addr).await;

    a.send(Message::text("not json")).await.unwrap();
    a.send(Message::text(r#"{"payload":{}}"#)).await.unwrap();
    send_move(&mut a, 42).await;
    send_move(&mut a, -1).await;
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;

    // The connection is still usable.
    send_move(&mut a, 0).await;
    assert_eq!(next_state(&mut a).await.grid().get(0), Some(N));
    assert_eq!(next_state(&mut b).await.grid().get(0), Some(N));
}

#[tokio::test]
async fn test_third_identity_is_refused() {
    let addr = start_server().await;
    let (mut a, mut b) = start_match(addr).await;

    let mut c = connect(addr, Some("C")).await;
    let (code, reason) = expect_close(&mut c).await;
    assert_eq!(code, 4000);
    assert_eq!(reason, "session full");

    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn test_missing_identity_is_refused() {
    let addr = start_server().await;
    let mut anonymous = connect(addr, None).await;
    let (code, _) = expect_close(&mut anonymous).await;
    assert_eq!(code, 1008);
}

#[tokio::test]
async fn test_reconnect_resumes_role() {
    let addr = start_server().await;
    let (mut a, mut b) = start_match(addr).await;

    send_move(&mut a, 0).await;
    next_state(&mut a).await;
    next_state(&mut b).await;

    a.close(None).await.unwrap();
    drop(a);

    let mut a = connect(addr, Some("A")).await;
    let resumed = next_state(&mut a).await;
    assert_eq!(resumed.grid().get(0), Some(N));
    assert_eq!(resumed.whose_turn().as_deref(), Some("B"));
    next_state(&mut b).await;

    send_move(&mut b, 4).await;
    assert_eq!(next_state(&mut a).await.grid().get(4), Some(X));
    assert_eq!(next_state(&mut b).await.grid().get(4), Some(X));
}

#[tokio::test]
async fn test_newer_connection_supersedes_older() {
    let addr = start_server().await;
    let mut old = connect(addr, Some("A")).await;
    next_state(&mut old).await;

    let mut new = connect(addr, Some("A")).await;
    assert_eq!(*next_state(&mut new).await.status(), GameStatus::Awaiting);
    let (code, reason) = expect_close(&mut old).await;
    assert_eq!(code, 1000);
    assert_eq!(reason, "superseded");

    // The role still belongs to A through the new connection.
    let mut b = connect(addr, Some("B")).await;
    let joined_b = next_state(&mut b).await;
    let joined_new = next_state(&mut new).await;
    assert_eq!(joined_b, joined_new);
    assert_eq!(joined_b.whose_turn().as_deref(), Some("A"));

    send_move(&mut new, 0).await;
    for ws in [&mut new, &mut b] {
        let state = next_state(ws).await;
        assert_eq!(state.grid().get(0), Some(N));
        assert_eq!(state.whose_turn().as_deref(), Some("B"));
        assert_eq!(*state.status(), GameStatus::InProgress);
    }
}

async fn wait_for_state(
    notifications: &mut mpsc::UnboundedReceiver<Notification>,
    accept: impl Fn(&Projection) -> bool,
) -> Projection {
    timeout(Duration::from_secs(5), async {
        loop {
            match notifications.recv().await {
                Some(Notification::State(projection)) if accept(&projection) => return projection,
                Some(_) => continue,
                None => panic!("connection manager stopped"),
            }
        }
    })
    .await
    .expect("timed out waiting for state")
}

#[tokio::test]
async fn test_connection_managers_play_through_server() {
    let addr = start_server().await;
    let url = format!("ws://{}/ws", addr);
    let backoff = Duration::from_millis(100);
    let connect_timeout = Duration::from_secs(2);

    let (manager_a, handle_a, mut notes_a) =
        ConnectionManager::new(WsConnector::new(url.clone()), "A".into(), backoff, connect_timeout);
    let task_a = tokio::spawn(manager_a.run());
    wait_for_state(&mut notes_a, |p| *p.status() == GameStatus::Awaiting).await;

    let (manager_b, handle_b, mut notes_b) =
        ConnectionManager::new(WsConnector::new(url), "B".into(), backoff, connect_timeout);
    let task_b = tokio::spawn(manager_b.run());
    wait_for_state(&mut notes_a, |p| *p.status() == GameStatus::InProgress).await;
    wait_for_state(&mut notes_b, |p| *p.status() == GameStatus::InProgress).await;

    // Out of turn: the manager never sends it.
    handle_b.submit_move(8);
    handle_a.submit_move(0);
    let seen = wait_for_state(&mut notes_b, |p| p.grid().get(0) == Some(N)).await;
    assert_eq!(seen.grid().get(8), Some(E));
    assert_eq!(handle_b.projection(), seen);

    drop(handle_a);
    drop(handle_b);
    timeout(Duration::from_secs(5), task_a).await.unwrap().unwrap();
    timeout(Duration::from_secs(5), task_b).await.unwrap().unwrap();
}
