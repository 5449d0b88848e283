use std::path::PathBuf;

use crate::socket::SocketState;

/// Errors surfaced by the mesh socket.
///
/// Only [`MeshError::Bind`] comes out of `start()` at runtime; everything
/// that happens inside the receive loop is logged and counted instead.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// The node's port could not be bound. Never retried.
    #[error("bind failed: {0}")]
    Bind(#[source] signalmesh_transport::TransportError),

    /// Transport-level error outside of bind.
    #[error("transport error: {0}")]
    Transport(#[from] signalmesh_transport::TransportError),

    /// Invalid node configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// `start()` called on a socket that is not `Unbound`.
    #[error("cannot start mesh socket in state {0}")]
    InvalidState(SocketState),

    /// Handler registration after `start()`.
    #[error("handler registry is frozen once the socket has started")]
    RegistryFrozen,

    /// Schema registry error.
    #[cfg(feature = "schema")]
    #[error("schema error: {0}")]
    Schema(#[from] signalmesh_schema::SchemaError),
}

/// Errors from a single outbound send.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The payload could not be encoded.
    #[error("encode failed: {0}")]
    Wire(#[from] signalmesh_wire::WireError),

    /// The OS refused the write.
    #[error("write failed: {0}")]
    Transport(#[from] signalmesh_transport::TransportError),

    /// The socket has not been started, or has been stopped.
    #[error("mesh socket is not bound")]
    NotBound,
}

/// Errors in node configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config is not valid JSON or has the wrong shape.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two peers share a name.
    #[error("duplicate peer name: {0}")]
    DuplicatePeer(String),

    /// A peer entry is unusable.
    #[error("invalid peer {name:?}: {reason}")]
    InvalidPeer { name: String, reason: String },

    /// `max_datagram_size` cannot hold a header or exceeds what UDP carries.
    #[error("max_datagram_size {size} outside {min}..={max}")]
    DatagramSize { size: usize, min: usize, max: usize },

    /// A tumbler entry names a signal this node does not know.
    #[error("unknown signal: {0}")]
    UnknownSignal(String),
}

pub type Result<T> = std::result::Result<T, MeshError>;
