//! Top-level facade crate for relaychat.
//!
//! Re-exports the protocol crate and the client library so users can depend on a single crate.

pub mod core {
    pub use relaychat_core::*;
}

pub mod client {
    pub use relaychat_client::*;
}
