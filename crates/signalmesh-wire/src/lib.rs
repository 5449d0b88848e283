//! Wire format for signalmesh datagrams.
//!
//! Every datagram is a fixed 12-byte header followed by a JSON body:
//! - A 2-byte little-endian signal code
//! - A 2-byte little-endian protocol version (always 1 on encode)
//! - A 4-byte little-endian body length
//! - A 4-byte little-endian unix timestamp (whole seconds)
//!
//! One datagram carries exactly one message. Decode fails closed: a
//! datagram that cannot be fully understood never becomes a [`Message`].

pub mod codec;
pub mod error;
pub mod message;
pub mod signal;

pub use codec::{
    decode, decode_with_config, encode, encode_at, encode_message, encode_with_config, unix_now,
    WireConfig, HEADER_SIZE, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION,
};
pub use error::{DecodeError, Result, WireError};
pub use message::Message;
pub use signal::{
    known_signals, signal_from_name, signal_name, SignalCode, BUILD_STARTED, EMITTED,
    INSPECTION_FAILED, INSPECTION_PASSED, INSPECTION_REQUESTED, LESSON_EXTRACTED,
    PRE_INSPECTION_COMPLETE, PRE_INSPECTION_REQUESTED, PROMPT_VALIDATION_REQUESTED, RECEIVED,
    SKILL_VALIDATION_REQUESTED,
};
