//! Mesh node: the UDP socket, its peer directory, and signal dispatch.
//!
//! This is the layer applications talk to. Register handlers per signal,
//! start the socket, and emit signals to peers by port, by name, or to all
//! configured peers at once. Nothing here waits for a reply: every signal is
//! one-way, and any response is a separate signal correlated by the payload.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod peer;
pub mod sender;
pub mod socket;
pub mod stats;

mod admission;

pub use config::{MeshConfig, SignalRef, TumblerConfig};
pub use dispatch::{DispatchOutcome, Handler, HandlerError, HandlerResult, SignalDispatcher};
pub use error::{ConfigError, MeshError, Result, SendError};
pub use peer::{Peer, PeerDirectory};
pub use sender::{BroadcastReport, MeshSender};
pub use socket::{MeshSocket, SocketState};
pub use stats::MeshStats;

pub use signalmesh_tumbler::{Tumbler, TumblerStats};
pub use signalmesh_wire::Message;
