//! Chat envelope protocol.
//!
//! Every frame in either direction is a JSON object with exactly two string
//! fields, `content` and `author`. A few reserved `author` values turn the
//! envelope into a control message:
//! - `server-clientid`: relay -> client identity assignment (`content` = identity)
//! - `request-purge`: either direction, clears the shared log (`content` ignored)
//!
//! Parsers are panic-free: malformed input is reported as `ChatError` instead of
//! panicking, so one hostile frame never ends a session.

pub mod codec;
pub mod envelope;

pub use codec::{classify, decode, decode_bytes, encode, Frame};
pub use envelope::{Envelope, AUTHOR_CLIENT_ID, AUTHOR_REQUEST_PURGE};
