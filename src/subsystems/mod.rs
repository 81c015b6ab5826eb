//! Subsystem modules for docchat.

pub mod agents;
#[cfg(feature = "channel-pty")]
pub mod comms;
pub mod extract;
pub mod memory;
pub mod retrieval;
pub mod safety;
