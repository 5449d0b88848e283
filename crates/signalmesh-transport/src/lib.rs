//! Loopback UDP transport.
//!
//! Every mesh node owns one UDP port on `127.0.0.1`. Peers are addressed by
//! port only; nothing ever leaves the host.
//!
//! This is the lowest layer of signalmesh. The node crate builds its receive
//! loop and send path on the [`LoopbackSocket`] type provided here.

pub mod error;
pub mod udp;

pub use error::{Result, TransportError};
pub use udp::{loopback_addr, LoopbackSocket};
