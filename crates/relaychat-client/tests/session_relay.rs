//! End-to-end session tests against a scripted in-process relay.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use relaychat_client::config::ClientConfig;
use relaychat_client::{ChatSession, ConnectionStatus, LogEntry, SessionEvent};

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

type RelayWs = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}"))
}

async fn accept(listener: &TcpListener) -> RelayWs {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn send_env(ws: &mut RelayWs, author: &str, content: &str) {
    let frame = json!({ "author": author, "content": content }).to_string();
    ws.send(Message::Text(frame)).await.unwrap();
}

/// Next text frame, or `None` once the client closed.
async fn next_text(ws: &mut RelayWs) -> Option<String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(s))) => return Some(s),
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn hold_open(ws: &mut RelayWs) {
    while next_text(ws).await.is_some() {}
}

async fn next_event(session: &mut ChatSession) -> SessionEvent {
    timeout(TIMEOUT, session.next_event())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

fn session(address: &str) -> ChatSession {
    ChatSession::new(ClientConfig::with_address(address))
}

fn entry(author: &str, content: &str) -> LogEntry {
    LogEntry::new(author, content)
}

#[tokio::test]
async fn identity_then_chat_message() {
    let (listener, address) = bind().await;
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u42").await;
        send_env(&mut ws, "Alice", "hi").await;
        hold_open(&mut ws).await;
    });

    let mut s = session(&address);
    s.start().unwrap();
    assert_eq!(s.status(), ConnectionStatus::Connecting);

    match next_event(&mut s).await {
        SessionEvent::IdentityAssigned(id) => assert_eq!(id, "u42"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.status(), ConnectionStatus::Connected);

    match next_event(&mut s).await {
        SessionEvent::Message(e) => assert_eq!(e, entry("Alice", "hi")),
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(s.identity(), Some("u42"));
    assert_eq!(s.status(), ConnectionStatus::Connected);
    assert_eq!(s.messages(), &[entry("Alice", "hi")]);
}

#[tokio::test]
async fn open_socket_without_identity_is_not_connected() {
    let (listener, address) = bind().await;
    let (go_tx, go_rx) = oneshot::channel::<()>();
    let (seen_tx, seen_rx) = oneshot::channel::<Option<String>>();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(Message::Text("garbage".into())).await.unwrap();
        send_env(&mut ws, "Alice", "before identity").await;
        go_rx.await.unwrap();
        send_env(&mut ws, "server-clientid", "u7").await;
        let _ = seen_tx.send(next_text(&mut ws).await);
        hold_open(&mut ws).await;
    });

    let mut s = session(&address);
    s.start().unwrap();

    // the malformed frame is skipped without an event
    match next_event(&mut s).await {
        SessionEvent::Message(e) => assert_eq!(e, entry("Alice", "before identity")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.status(), ConnectionStatus::Connecting);

    s.send_chat("early");
    go_tx.send(()).unwrap();

    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));
    s.send_chat("later");

    let first = timeout(TIMEOUT, seen_rx).await.unwrap().unwrap().unwrap();
    let v: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(v, json!({ "author": "u7", "content": "later" }));

    assert_eq!(
        s.messages(),
        &[
            entry("Alice", "before identity"),
            entry("Me", "early"),
            entry("Me", "later"),
        ]
    );
}

#[tokio::test]
async fn request_purge_sends_sentinel_and_clears_immediately() {
    let (listener, address) = bind().await;
    let (frames_tx, frames_rx) = oneshot::channel::<Vec<Value>>();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u42").await;
        let mut frames = Vec::new();
        while frames.len() < 4 {
            let Some(text) = next_text(&mut ws).await else { break };
            frames.push(serde_json::from_str(&text).unwrap());
        }
        let _ = frames_tx.send(frames);
        hold_open(&mut ws).await;
    });

    let mut s = session(&address);
    s.start().unwrap();
    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));

    for text in ["a", "b", "c"] {
        s.send_chat(text);
    }
    assert_eq!(s.messages().len(), 3);

    let mut log_rx = s.subscribe_log();
    s.request_purge();
    assert!(s.messages().is_empty());
    assert!(log_rx.has_changed().unwrap());
    assert_eq!(s.identity(), Some("u42"));
    assert_eq!(s.status(), ConnectionStatus::Connected);

    let frames = timeout(TIMEOUT, frames_rx).await.unwrap().unwrap();
    assert_eq!(
        frames,
        vec![
            json!({ "author": "u42", "content": "a" }),
            json!({ "author": "u42", "content": "b" }),
            json!({ "author": "u42", "content": "c" }),
            json!({ "author": "request-purge", "content": "" }),
        ]
    );
}

#[tokio::test]
async fn relay_purge_broadcast_resets_log() {
    let (listener, address) = bind().await;
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u1").await;
        send_env(&mut ws, "Alice", "m1").await;
        send_env(&mut ws, "Bob", "m2").await;
        send_env(&mut ws, "request-purge", "ignored").await;
        send_env(&mut ws, "Carol", "m3").await;
        hold_open(&mut ws).await;
    });

    let mut s = session(&address);
    s.start().unwrap();

    let mut kinds = Vec::new();
    for _ in 0..5 {
        kinds.push(match next_event(&mut s).await {
            SessionEvent::IdentityAssigned(_) => "identity",
            SessionEvent::Message(_) => "message",
            SessionEvent::Purged => "purged",
            SessionEvent::Disconnected(_) => "disconnected",
        });
    }

    assert_eq!(kinds, ["identity", "message", "message", "purged", "message"]);
    assert_eq!(s.messages(), &[entry("Carol", "m3")]);
    assert_eq!(s.identity(), Some("u1"));
    assert_eq!(s.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn send_while_disconnected_is_silent() {
    let (listener, address) = bind().await;
    let mut s = session(&address);

    s.send_chat("hello");
    s.request_purge();
    s.send_chat("again");

    assert_eq!(s.status(), ConnectionStatus::Disconnected);
    assert!(s.identity().is_none());
    assert_eq!(s.messages(), &[entry("Me", "again")]);
    assert!(s.drain_pending().is_empty());

    // nothing ever dialed the relay
    assert!(timeout(QUIET, listener.accept()).await.is_err());
}

#[tokio::test]
async fn relay_close_disconnects_and_manual_reconnect_gets_new_identity() {
    let (listener, address) = bind().await;
    tokio::spawn(async move {
        let mut first = accept(&listener).await;
        send_env(&mut first, "server-clientid", "u1").await;
        send_env(&mut first, "Alice", "hi").await;
        first.close(None).await.unwrap();

        let mut second = accept(&listener).await;
        send_env(&mut second, "server-clientid", "u2").await;
        hold_open(&mut second).await;
    });

    let mut s = session(&address);
    s.start().unwrap();
    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));
    assert!(matches!(next_event(&mut s).await, SessionEvent::Message(_)));

    match next_event(&mut s).await {
        SessionEvent::Disconnected(e) => assert_eq!(e.code().as_str(), "TRANSPORT_CLOSED"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.status(), ConnectionStatus::Disconnected);
    assert_eq!(s.identity(), Some("u1"));
    assert_eq!(s.messages(), &[entry("Alice", "hi")]);

    // no automatic retry
    assert!(timeout(QUIET, s.next_event()).await.is_err());
    assert_eq!(s.status(), ConnectionStatus::Disconnected);

    s.start().unwrap();
    assert_eq!(s.status(), ConnectionStatus::Connecting);
    match next_event(&mut s).await {
        SessionEvent::IdentityAssigned(id) => assert_eq!(id, "u2"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.status(), ConnectionStatus::Connected);
    assert_eq!(s.identity(), Some("u2"));
    assert_eq!(s.messages(), &[entry("Alice", "hi")]);
}

#[tokio::test]
async fn connect_failure_reports_disconnected() {
    let (listener, address) = bind().await;
    drop(listener);

    let mut s = session(&address);
    s.start().unwrap();
    assert_eq!(s.status(), ConnectionStatus::Connecting);

    match next_event(&mut s).await {
        SessionEvent::Disconnected(e) => assert_eq!(e.code().as_str(), "TRANSPORT_ERROR"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn start_without_valid_address_fails_fast() {
    for cfg in [
        ClientConfig::default(),
        ClientConfig::with_address("http://127.0.0.1:1"),
    ] {
        let mut s = ChatSession::new(cfg);
        let err = s.start().expect_err("must fail");
        assert_eq!(err.code().as_str(), "INVALID_CONFIGURATION");
        assert_eq!(s.status(), ConnectionStatus::Disconnected);
        assert!(s.drain_pending().is_empty());
    }
}

#[tokio::test]
async fn stop_closes_transport_once_and_is_idempotent() {
    let (listener, address) = bind().await;
    let (closed_tx, closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u9").await;
        hold_open(&mut ws).await;
        let _ = closed_tx.send(());
    });

    let mut s = session(&address);
    s.start().unwrap();
    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));
    s.send_chat("bye");

    s.stop();
    assert_eq!(s.status(), ConnectionStatus::Disconnected);
    s.stop();
    assert_eq!(s.status(), ConnectionStatus::Disconnected);

    timeout(TIMEOUT, closed_rx).await.unwrap().unwrap();

    // the released link's own close event is not surfaced
    assert!(timeout(QUIET, s.next_event()).await.is_err());
    assert_eq!(s.identity(), Some("u9"));
    assert_eq!(s.messages(), &[entry("Me", "bye")]);
}

#[tokio::test]
async fn dropping_session_releases_transport() {
    let (listener, address) = bind().await;
    let (closed_tx, closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u3").await;
        hold_open(&mut ws).await;
        let _ = closed_tx.send(());
    });

    let mut s = session(&address);
    s.start().unwrap();
    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));
    drop(s);

    timeout(TIMEOUT, closed_rx).await.unwrap().unwrap();
}

#[tokio::test]
async fn restart_replaces_live_link() {
    let (listener, address) = bind().await;
    // the first link may be released before it ever dials, so serve any number
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else { return };
                send_env(&mut ws, "server-clientid", "fresh").await;
                hold_open(&mut ws).await;
            });
        }
    });

    let mut s = session(&address);
    s.start().unwrap();
    s.start().unwrap();
    assert_eq!(s.status(), ConnectionStatus::Connecting);

    match next_event(&mut s).await {
        SessionEvent::IdentityAssigned(id) => assert_eq!(id, "fresh"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn stop_closes_transport_while_events_are_backed_up() {
    let (listener, address) = bind().await;
    let (closed_tx, closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u5").await;
        // more than the session's event queue holds
        for i in 0..2000 {
            let frame = json!({ "author": "Alice", "content": i.to_string() }).to_string();
            if ws.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        hold_open(&mut ws).await;
        let _ = closed_tx.send(());
    });

    let mut s = session(&address);
    s.start().unwrap();
    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));

    // let the link fill the event queue and block on it
    tokio::time::sleep(Duration::from_millis(300)).await;
    s.stop();
    assert_eq!(s.status(), ConnectionStatus::Disconnected);

    let _ = timeout(Duration::from_secs(3), closed_rx)
        .await
        .expect("transport still open after stop()");
}

#[tokio::test]
async fn full_outbound_queue_still_echoes_locally() {
    let (listener, address) = bind().await;
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_env(&mut ws, "server-clientid", "u6").await;
        // never read: outbound frames pile up
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(ws);
    });

    let mut cfg = ClientConfig::with_address(&address);
    cfg.relay.outbound_queue = 1;
    let mut s = ChatSession::new(cfg);
    assert_eq!(s.config().relay.outbound_queue, 1);

    s.start().unwrap();
    assert!(matches!(next_event(&mut s).await, SessionEvent::IdentityAssigned(_)));

    for i in 0..200 {
        s.send_chat(&i.to_string());
    }

    assert_eq!(s.status(), ConnectionStatus::Connected);
    assert_eq!(s.messages().len(), 200);
    let local = s.state().local_author();
    assert!(s.messages().iter().all(|e| e.author == local));
    assert_eq!(s.messages()[199], entry("Me", "199"));
}
