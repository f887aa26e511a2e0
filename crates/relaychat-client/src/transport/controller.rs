//! Connection controller.
//!
//! Responsibilities:
//! - Own at most one live link (one WebSocket connection attempt) at a time
//! - Spawn one tokio task per link that connects, then pumps outbound frames and
//!   forwards inbound frames / close / errors as tagged `LinkEvent`s
//! - Release exactly once: `stop()` takes the link, dropping its outbound queue
//!   and its release signal; the task flushes what is queued, closes the socket
//!   if it opened, and exits. Every wait on the event queue also watches the
//!   release signal, so a session that is not draining events cannot keep a
//!   released socket open. Later calls find nothing to release.
//!
//! Events carry the `LinkId` they came from so the consumer can discard events
//! of a link that was already stopped or replaced by a restart.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use relaychat_core::error::{ChatError, Result};

use crate::config::RelaySection;
use crate::transport::address::RelayAddress;

/// Monotonic id of a link within one controller.
pub type LinkId = u64;

const EVENT_QUEUE: usize = 1024;

/// Raw inbound payload, not yet decoded.
#[derive(Debug)]
pub enum Inbound {
    Text(String),
    Binary(Bytes),
}

#[derive(Debug)]
pub enum LinkEvent {
    /// Transport handshake finished. Not "connected": that takes an identity.
    Opened,
    Frame(Inbound),
    /// Closed by the relay, or after a local release.
    Closed,
    /// Connect, read or write failure. Handled like `Closed`.
    Failed(ChatError),
}

struct Link {
    id: LinkId,
    out_tx: mpsc::Sender<String>,
    // Dropping this is the release signal; it reaches the task even while it
    // waits on a full event queue.
    _release: oneshot::Sender<()>,
}

pub struct ConnectionController {
    events_tx: mpsc::Sender<(LinkId, LinkEvent)>,
    events_rx: mpsc::Receiver<(LinkId, LinkEvent)>,
    link: Option<Link>,
    last_link: LinkId,
    connect_timeout: Duration,
    outbound_queue: usize,
}

impl ConnectionController {
    pub fn new(relay: &RelaySection) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        Self {
            events_tx,
            events_rx,
            link: None,
            last_link: 0,
            connect_timeout: Duration::from_millis(relay.connect_timeout_ms),
            outbound_queue: relay.outbound_queue,
        }
    }

    /// Open a new link, releasing the current one first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, address: &RelayAddress) -> LinkId {
        self.stop();

        self.last_link += 1;
        let id = self.last_link;
        let (out_tx, out_rx) = mpsc::channel(self.outbound_queue);
        let (release, released) = oneshot::channel();

        tokio::spawn(run_link(
            id,
            address.as_str().to_string(),
            self.connect_timeout,
            out_rx,
            released,
            self.events_tx.clone(),
        ));

        self.link = Some(Link {
            id,
            out_tx,
            _release: release,
        });
        id
    }

    /// Release the live link. Returns false when there was nothing to release.
    pub fn stop(&mut self) -> bool {
        match self.link.take() {
            Some(link) => {
                tracing::debug!(link = link.id, "releasing link");
                true
            }
            None => false,
        }
    }

    pub fn current_link(&self) -> Option<LinkId> {
        self.link.as_ref().map(|l| l.id)
    }

    /// Queue a text frame on the live link. Never blocks.
    pub fn transmit(&self, frame: String) -> Result<()> {
        let link = self.link.as_ref().ok_or(ChatError::SendWhileDisconnected)?;
        link.out_tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ChatError::TransportError("outbound queue full".into())
            }
            mpsc::error::TrySendError::Closed(_) => ChatError::TransportClosed,
        })
    }

    /// Next event from any link, in arrival order.
    ///
    /// The controller keeps a sender for future links, so this only returns
    /// `None` if the channel is torn down.
    pub async fn recv(&mut self) -> Option<(LinkId, LinkEvent)> {
        self.events_rx.recv().await
    }

    /// Non-blocking variant of `recv`.
    pub fn try_recv(&mut self) -> Option<(LinkId, LinkEvent)> {
        self.events_rx.try_recv().ok()
    }
}

impl Drop for ConnectionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Outcome of handing an event to the session.
enum Forward {
    Sent,
    /// Owner called `stop()` (or dropped the controller) meanwhile.
    Released,
    /// Session is gone.
    Dropped,
}

/// Forward one event without letting a full event queue delay a release.
async fn forward(
    events: &mpsc::Sender<(LinkId, LinkEvent)>,
    released: &mut oneshot::Receiver<()>,
    id: LinkId,
    event: LinkEvent,
) -> Forward {
    tokio::select! {
        res = events.send((id, event)) => match res {
            Ok(()) => Forward::Sent,
            Err(_) => Forward::Dropped,
        },
        _ = released => Forward::Released,
    }
}

async fn run_link(
    id: LinkId,
    address: String,
    connect_timeout: Duration,
    mut out_rx: mpsc::Receiver<String>,
    mut released: oneshot::Receiver<()>,
    events: mpsc::Sender<(LinkId, LinkEvent)>,
) {
    let connected = tokio::select! {
        res = timeout(connect_timeout, connect_async(address.as_str())) => res,
        _ = &mut released => {
            tracing::debug!(link = id, "released before open");
            return;
        }
    };

    let ws = match connected {
        Ok(Ok((ws, _resp))) => ws,
        Ok(Err(e)) => {
            let err = ChatError::TransportError(format!("connect failed: {e}"));
            let _ = forward(&events, &mut released, id, LinkEvent::Failed(err)).await;
            return;
        }
        Err(_) => {
            let err = ChatError::TransportError(format!(
                "connect timed out after {}ms",
                connect_timeout.as_millis()
            ));
            let _ = forward(&events, &mut released, id, LinkEvent::Failed(err)).await;
            return;
        }
    };

    tracing::debug!(link = id, relay = %address, "transport open");
    let (mut ws_tx, mut ws_rx) = ws.split();

    match forward(&events, &mut released, id, LinkEvent::Opened).await {
        Forward::Sent => {}
        Forward::Released | Forward::Dropped => {
            let _ = ws_tx.close().await;
            return;
        }
    }

    let end = loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(frame) => {
                        if let Err(e) = ws_tx.send(Message::Text(frame)).await {
                            let err = ChatError::TransportError(format!("send failed: {e}"));
                            break LinkEvent::Failed(err);
                        }
                    }
                    None => {
                        let _ = ws_tx.close().await;
                        break LinkEvent::Closed;
                    }
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let inbound = match incoming {
                    Some(Ok(Message::Text(s))) => Inbound::Text(s),
                    Some(Ok(Message::Binary(b))) => Inbound::Binary(Bytes::from(b)),
                    Some(Ok(Message::Close(_))) | None => break LinkEvent::Closed,
                    // ping/pong are answered by tungstenite
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let err = ChatError::TransportError(format!("read failed: {e}"));
                        break LinkEvent::Failed(err);
                    }
                };
                match forward(&events, &mut released, id, LinkEvent::Frame(inbound)).await {
                    Forward::Sent => {}
                    Forward::Released => {
                        // flush what the owner queued before letting go
                        while let Ok(frame) = out_rx.try_recv() {
                            if ws_tx.send(Message::Text(frame)).await.is_err() {
                                break;
                            }
                        }
                        let _ = ws_tx.close().await;
                        tracing::debug!(link = id, "released while forwarding");
                        return;
                    }
                    Forward::Dropped => {
                        let _ = ws_tx.close().await;
                        return;
                    }
                }
            }
        }
    };

    tracing::debug!(link = id, ?end, "link finished");
    let _ = forward(&events, &mut released, id, end).await;
}
