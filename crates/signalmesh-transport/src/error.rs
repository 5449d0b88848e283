use std::net::SocketAddr;

/// Errors that can occur in UDP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the node's port.
    #[error("failed to bind udp port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    /// Failed to write a datagram.
    #[error("failed to send datagram to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The OS accepted fewer bytes than the datagram holds.
    #[error("short write to {addr} ({written} of {expected} bytes)")]
    ShortWrite {
        addr: SocketAddr,
        written: usize,
        expected: usize,
    },

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
