//! Fire-and-forget signal mesh over loopback UDP.
//!
//! Cooperating processes on one host each own a UDP port on `127.0.0.1` and
//! exchange small typed JSON messages, identified by a 16-bit signal code, in
//! a single datagram each. Nothing is acknowledged or retried.
//!
//! # Crate Structure
//!
//! - [`wire`]: 12-byte header codec, signal table, `Message`
//! - [`transport`]: loopback UDP endpoint
//! - [`tumbler`]: named admission whitelist
//! - [`node`]: mesh socket, peers, dispatch (behind `node` feature)
//! - [`schema`]: optional per-signal JSON Schema admission (behind `schema` feature)
//!
//! ```no_run
//! # #[cfg(feature = "node")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use signalmesh::node::{MeshConfig, MeshSocket};
//! use signalmesh::wire::{BUILD_STARTED, INSPECTION_PASSED};
//!
//! let config = MeshConfig::new(41002).with_peer("builder", 41001);
//! let mut socket = MeshSocket::new(config)?;
//! let reply = socket.sender();
//! socket.on(BUILD_STARTED, move |msg, _from| {
//!     reply.send_to_peer("builder", INSPECTION_PASSED, &msg.payload);
//!     Ok(())
//! })?;
//! socket.start().await?;
//! # Ok(())
//! # }
//! ```

/// Re-export codec types.
pub mod wire {
    pub use signalmesh_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use signalmesh_transport::*;
}

/// Re-export admission whitelist types.
pub mod tumbler {
    pub use signalmesh_tumbler::*;
}

/// Re-export mesh node types (requires `node` feature).
#[cfg(feature = "node")]
pub mod node {
    pub use signalmesh_node::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use signalmesh_schema::*;
}
