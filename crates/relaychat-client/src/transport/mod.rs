//! Transport layer: relay address validation and the connection controller.

pub mod address;
pub mod controller;

pub use address::RelayAddress;
pub use controller::{ConnectionController, Inbound, LinkEvent, LinkId};
