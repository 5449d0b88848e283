use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::codec::{unix_now, PROTOCOL_VERSION};
use crate::signal::signal_name;

/// A decoded mesh message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// The signal code from the shared mesh enumeration.
    pub signal: u16,
    /// Protocol version carried in the header.
    pub version: u16,
    /// Sender wall clock at encode time, unix seconds.
    pub timestamp: u32,
    /// JSON body. `Value::Null` when the body was empty.
    pub payload: Value,
}

impl Message {
    /// Create a message stamped with the current time and protocol version.
    pub fn new(signal: u16, payload: Value) -> Self {
        Self {
            signal,
            version: PROTOCOL_VERSION,
            timestamp: unix_now(),
            payload,
        }
    }

    /// Deserialize the payload into a typed value.
    pub fn payload_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }

    /// Human-readable name of the signal, `"UNKNOWN"` for codes outside the table.
    pub fn signal_name(&self) -> &'static str {
        signal_name(self.signal)
    }

    /// `false` when the body was empty.
    pub fn has_payload(&self) -> bool {
        !self.payload.is_null()
    }
}
