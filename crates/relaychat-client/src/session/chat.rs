//! `ChatSession`: the object a frontend holds.
//!
//! Outbound: `send_chat` / `request_purge` -> codec -> controller.
//! Inbound: `next_event` pulls one controller event at a time, decodes and
//! classifies it, and applies it to `SessionState`. Frames are applied strictly
//! in arrival order; nothing else mutates the state.

use tracing::{debug, info, trace, warn};

use relaychat_core::error::{ChatError, Result};
use relaychat_core::protocol::{self, Envelope, Frame};

use crate::config::ClientConfig;
use crate::session::state::{ConnectionStatus, LogEntry, SessionState};
use crate::transport::{ConnectionController, Inbound, LinkEvent, LinkId, RelayAddress};

/// What an applied event changed.
#[derive(Debug)]
pub enum SessionEvent {
    IdentityAssigned(String),
    Message(LogEntry),
    Purged,
    /// Link closed or failed; reconnecting is up to the caller.
    Disconnected(ChatError),
}

pub struct ChatSession {
    cfg: ClientConfig,
    state: SessionState,
    controller: ConnectionController,
}

impl ChatSession {
    pub fn new(cfg: ClientConfig) -> Self {
        let state = SessionState::new(cfg.session.local_author.clone());
        let controller = ConnectionController::new(&cfg.relay);
        Self {
            cfg,
            state,
            controller,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&str> {
        self.state.identity()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    pub fn messages(&self) -> &[LogEntry] {
        self.state.messages()
    }

    pub fn subscribe_log(&self) -> tokio::sync::watch::Receiver<u64> {
        self.state.subscribe()
    }

    /// Open a (new) connection. Also the manual reconnect.
    ///
    /// An invalid or missing address fails before anything changes.
    pub fn start(&mut self) -> Result<()> {
        let address = RelayAddress::parse(self.cfg.relay.address.as_deref())?;
        let link = self.controller.start(&address);
        self.state.on_connecting();
        info!(link, relay = %address, "connecting");
        Ok(())
    }

    /// Release the connection. Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.controller.stop() {
            self.state.on_disconnected();
            info!("stopped");
        }
    }

    /// Send a chat line and echo it locally.
    ///
    /// Only transmitted while connected; otherwise dropped without error.
    pub fn send_chat(&mut self, text: &str) {
        match (self.state.status(), self.state.identity()) {
            (ConnectionStatus::Connected, Some(identity)) => {
                let frame = protocol::encode(text, identity);
                self.transmit(frame);
            }
            (status, _) => debug!(%status, "not connected, chat line not transmitted"),
        }
        self.state.on_local_send(text);
    }

    /// Ask the relay to purge the shared log and clear the local one right away.
    pub fn request_purge(&mut self) {
        if self.state.status() == ConnectionStatus::Connected {
            self.transmit(Envelope::purge_request().to_wire());
        } else {
            debug!(status = %self.state.status(), "not connected, purge request not transmitted");
        }
        self.state.on_purge_notice();
    }

    fn transmit(&self, frame: String) {
        match self.controller.transmit(frame) {
            Ok(()) => {}
            Err(ChatError::SendWhileDisconnected) => debug!("no live link, outbound frame dropped"),
            Err(e) => warn!(error = %e, code = e.code().as_str(), "outbound frame dropped"),
        }
    }

    /// Apply the next relevant event, waiting for one if needed.
    ///
    /// Malformed frames and events from released links are consumed silently.
    /// Pends forever while no link is live.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let (link, event) = self.controller.recv().await?;
            if let Some(ev) = self.apply(link, event) {
                return Some(ev);
            }
        }
    }

    /// Apply every event that is already queued.
    pub fn drain_pending(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Some((link, event)) = self.controller.try_recv() {
            out.extend(self.apply(link, event));
        }
        out
    }

    fn apply(&mut self, link: LinkId, event: LinkEvent) -> Option<SessionEvent> {
        if self.controller.current_link() != Some(link) {
            trace!(link, ?event, "ignoring event from released link");
            return None;
        }

        match event {
            LinkEvent::Opened => {
                debug!(link, "transport open, waiting for identity");
                None
            }
            LinkEvent::Frame(inbound) => self.on_frame(link, inbound),
            LinkEvent::Closed => Some(self.on_link_down(link, ChatError::TransportClosed)),
            LinkEvent::Failed(e) => Some(self.on_link_down(link, e)),
        }
    }

    fn on_frame(&mut self, link: LinkId, inbound: Inbound) -> Option<SessionEvent> {
        let decoded = match &inbound {
            Inbound::Text(s) => protocol::decode(s),
            Inbound::Binary(b) => protocol::decode_bytes(b),
        };
        let env = match decoded {
            Ok(env) => env,
            Err(e) => {
                debug!(link, error = %e, "dropping malformed frame");
                return None;
            }
        };

        match protocol::classify(env) {
            Frame::IdentityAssignment(id) => {
                info!(link, identity = %id, "identity assigned");
                self.state.on_identity_assigned(id.clone());
                Some(SessionEvent::IdentityAssigned(id))
            }
            Frame::PurgeNotice => {
                debug!(link, "purge notice");
                self.state.on_purge_notice();
                Some(SessionEvent::Purged)
            }
            Frame::ChatMessage(env) => {
                let entry = LogEntry::from(env);
                trace!(link, author = %entry.author, "chat message");
                self.state.on_chat_message(entry.clone());
                Some(SessionEvent::Message(entry))
            }
        }
    }

    fn on_link_down(&mut self, link: LinkId, error: ChatError) -> SessionEvent {
        // The task is gone already; this only drops the handle.
        self.controller.stop();
        self.state.on_disconnected();
        warn!(link, error = %error, "disconnected");
        SessionEvent::Disconnected(error)
    }
}
