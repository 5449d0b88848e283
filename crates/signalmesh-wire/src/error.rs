/// Reasons a datagram is refused by the decoder.
///
/// None of these are fatal to a receive loop: the datagram is dropped and
/// the loop moves on.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes than a full header.
    #[error("datagram too short ({len} bytes, header is {header})")]
    TooShort { len: usize, header: usize },

    /// The header declares more body bytes than the datagram carries.
    #[error("datagram truncated (header declares {declared} body bytes, {available} available)")]
    Truncated { declared: usize, available: usize },

    /// The body is not valid UTF-8 JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// Strict decoding only: the header carries a version this node does not speak.
    #[error("unsupported protocol version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },
}

/// Errors that can occur while encoding or decoding datagrams.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The inbound datagram could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The encoded datagram would not fit the configured maximum.
    #[error("datagram too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
