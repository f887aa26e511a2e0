//! Session state: identity, connection status, message log.
//!
//! Single writer for all three. Status moves only through
//! `on_connecting` / `on_identity_assigned` / `on_disconnected`; the log only
//! grows, except for a purge which empties it. Every log mutation bumps the
//! revision published on the watch channel, after the mutation is applied.

use std::fmt;

use tokio::sync::watch;

use relaychat_core::protocol::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    /// Identity received; the link is usable.
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Displayable chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub author: String,
    pub content: String,
}

impl LogEntry {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
        }
    }
}

impl From<Envelope> for LogEntry {
    fn from(env: Envelope) -> Self {
        Self {
            author: env.author,
            content: env.content,
        }
    }
}

pub struct SessionState {
    identity: Option<String>,
    status: ConnectionStatus,
    log: Vec<LogEntry>,
    local_author: String,
    revision: watch::Sender<u64>,
}

impl SessionState {
    pub fn new(local_author: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            identity: None,
            status: ConnectionStatus::Disconnected,
            log: Vec::new(),
            local_author: local_author.into(),
            revision,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn messages(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn local_author(&self) -> &str {
        &self.local_author
    }

    /// Log-changed hook. The value is a revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Overwrites any previous identity.
    pub fn on_identity_assigned(&mut self, id: impl Into<String>) {
        self.identity = Some(id.into());
        self.status = ConnectionStatus::Connected;
    }

    pub fn on_purge_notice(&mut self) {
        self.log.clear();
        self.log_changed();
    }

    pub fn on_chat_message(&mut self, entry: LogEntry) {
        self.log.push(entry);
        self.log_changed();
    }

    /// Optimistic echo; never rolled back.
    pub fn on_local_send(&mut self, content: impl Into<String>) {
        let entry = LogEntry::new(self.local_author.clone(), content);
        self.log.push(entry);
        self.log_changed();
    }

    /// Identity and log survive so the display stays continuous.
    pub fn on_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn on_connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    fn log_changed(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
