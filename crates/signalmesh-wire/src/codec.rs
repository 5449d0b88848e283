use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value;

use crate::error::{DecodeError, Result, WireError};
use crate::message::Message;

/// Header: signal (2) + version (2) + body length (4) + timestamp (4) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Version written by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Configuration for the datagram codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// Maximum encoded datagram size (header + body). Default: 65 507 bytes.
    pub max_datagram_size: usize,
    /// Reject datagrams whose version differs from [`PROTOCOL_VERSION`].
    pub strict_version: bool,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: MAX_DATAGRAM_SIZE,
            strict_version: false,
        }
    }
}

/// Current wall clock in whole unix seconds.
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Encode a payload for `signal`, stamped with the current time.
///
/// A payload serializing to JSON `null` produces a zero-length body.
pub fn encode<T: Serialize + ?Sized>(signal: u16, payload: &T) -> Result<Bytes> {
    encode_at(signal, payload, unix_now())
}

/// Encode a payload with an explicit timestamp.
pub fn encode_at<T: Serialize + ?Sized>(signal: u16, payload: &T, timestamp: u32) -> Result<Bytes> {
    let body = serialize_body(payload)?;
    encode_parts(
        signal,
        PROTOCOL_VERSION,
        timestamp,
        &body,
        MAX_DATAGRAM_SIZE,
    )
}

/// Encode a payload stamped with the current time, honoring the size limit in `config`.
pub fn encode_with_config<T: Serialize + ?Sized>(
    signal: u16,
    payload: &T,
    config: &WireConfig,
) -> Result<Bytes> {
    let body = serialize_body(payload)?;
    encode_parts(
        signal,
        PROTOCOL_VERSION,
        unix_now(),
        &body,
        config.max_datagram_size,
    )
}

/// Encode a message using its own version and timestamp.
pub fn encode_message(message: &Message, config: &WireConfig) -> Result<Bytes> {
    let body = serialize_body(&message.payload)?;
    encode_parts(
        message.signal,
        message.version,
        message.timestamp,
        &body,
        config.max_datagram_size,
    )
}

/// Encode into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬─────────────┬─────────────┬──────────────┐
/// │ Signal     │ Version    │ Body length │ Timestamp   │ Body         │
/// │ (2B LE)    │ (2B LE)    │ (4B LE)     │ (4B LE)     │ (JSON, N B)  │
/// └────────────┴────────────┴─────────────┴─────────────┴──────────────┘
/// ```
fn encode_parts(
    signal: u16,
    version: u16,
    timestamp: u32,
    body: &[u8],
    max_datagram_size: usize,
) -> Result<Bytes> {
    let size = HEADER_SIZE + body.len();
    if size > max_datagram_size || body.len() > u32::MAX as usize {
        return Err(WireError::BodyTooLarge {
            size,
            max: max_datagram_size,
        });
    }

    let mut dst = BytesMut::with_capacity(size);
    dst.put_u16_le(signal);
    dst.put_u16_le(version);
    dst.put_u32_le(body.len() as u32);
    dst.put_u32_le(timestamp);
    dst.put_slice(body);
    Ok(dst.freeze())
}

fn serialize_body<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    if body == b"null" {
        return Ok(Vec::new());
    }
    Ok(body)
}

/// Decode one datagram with the default configuration.
pub fn decode(src: &[u8]) -> std::result::Result<Message, DecodeError> {
    decode_with_config(src, &WireConfig::default())
}

/// Decode one datagram.
///
/// Bytes past the declared body length are ignored.
pub fn decode_with_config(
    src: &[u8],
    config: &WireConfig,
) -> std::result::Result<Message, DecodeError> {
    if src.len() < HEADER_SIZE {
        return Err(DecodeError::TooShort {
            len: src.len(),
            header: HEADER_SIZE,
        });
    }

    let signal = u16::from_le_bytes([src[0], src[1]]);
    let version = u16::from_le_bytes([src[2], src[3]]);
    let body_len = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
    let timestamp = u32::from_le_bytes([src[8], src[9], src[10], src[11]]);

    if config.strict_version && version != PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            expected: PROTOCOL_VERSION,
        });
    }

    let available = src.len() - HEADER_SIZE;
    if body_len > available {
        return Err(DecodeError::Truncated {
            declared: body_len,
            available,
        });
    }

    let payload = if body_len == 0 {
        Value::Null
    } else {
        let body = &src[HEADER_SIZE..HEADER_SIZE + body_len];
        serde_json::from_slice(body).map_err(DecodeError::MalformedPayload)?
    };

    if version != PROTOCOL_VERSION {
        tracing::debug!(signal, version, "decoded datagram with foreign protocol version");
    }

    Ok(Message {
        signal,
        version,
        timestamp,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::signal::BUILD_STARTED;

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = json!({
            "build_id": "b-1",
            "server_path": "/srv",
            "tags": ["a", "b"],
            "nested": { "n": 1.5, "ok": true, "none": null }
        });

        let wire = encode(BUILD_STARTED, &payload).unwrap();
        let msg = decode(&wire).unwrap();

        assert_eq!(msg.signal, BUILD_STARTED);
        assert_eq!(msg.version, PROTOCOL_VERSION);
        assert_eq!(msg.payload, payload);
        assert_eq!(msg.payload["build_id"], "b-1");
    }

    #[test]
    fn test_header_layout_is_little_endian() {
        let wire = encode_at(0x0102, &json!({"x": 1}), 0x0A0B_0C0D).unwrap();
        let body = br#"{"x":1}"#;

        assert_eq!(wire.len(), HEADER_SIZE + body.len());
        assert_eq!(&wire[0..2], &[0x02, 0x01]);
        assert_eq!(&wire[2..4], &[0x01, 0x00]);
        assert_eq!(&wire[4..8], &(body.len() as u32).to_le_bytes());
        assert_eq!(&wire[8..12], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(&wire[12..], body);
    }

    #[test]
    fn test_null_payload_has_empty_body() {
        let wire = encode(7, &Value::Null).unwrap();
        assert_eq!(wire.len(), HEADER_SIZE);

        let msg = decode(&wire).unwrap();
        assert_eq!(msg.signal, 7);
        assert!(msg.payload.is_null());
    }

    #[test]
    fn test_scalar_payloads_roundtrip() {
        for payload in [json!(0), json!("text"), json!([1, 2, 3]), json!(false), json!({})] {
            let msg = decode(&encode(1, &payload).unwrap()).unwrap();
            assert_eq!(msg.payload, payload);
        }
    }

    #[test]
    fn test_timestamp_tracks_wall_clock() {
        let before = unix_now();
        let msg = decode(&encode(1, &json!({"t": true})).unwrap()).unwrap();
        let after = unix_now();

        assert!(msg.timestamp + 2 >= before);
        assert!(msg.timestamp <= after + 2);
    }

    #[test]
    fn test_decode_too_short() {
        let result = decode(&[0xC3, 0x00, 0x01]);
        assert!(matches!(result, Err(DecodeError::TooShort { len: 3, .. })));
        assert!(matches!(decode(&[]), Err(DecodeError::TooShort { .. })));
    }

    #[test]
    fn test_decode_truncated_body() {
        let wire = encode(1, &json!({"hello": "world"})).unwrap();
        let result = decode(&wire[..wire.len() - 3]);
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_decode_declared_length_overflows() {
        let mut buf = BytesMut::new();
        buf.put_u16_le(1);
        buf.put_u16_le(PROTOCOL_VERSION);
        buf.put_u32_le(u32::MAX);
        buf.put_u32_le(0);
        buf.put_slice(b"{}");

        assert!(matches!(
            decode(&buf),
            Err(DecodeError::Truncated { declared, available: 2 }) if declared == u32::MAX as usize
        ));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let mut buf = BytesMut::new();
        let body = b"not-json{";
        buf.put_u16_le(1);
        buf.put_u16_le(PROTOCOL_VERSION);
        buf.put_u32_le(body.len() as u32);
        buf.put_u32_le(0);
        buf.put_slice(body);

        assert!(matches!(decode(&buf), Err(DecodeError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_invalid_utf8_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u16_le(1);
        buf.put_u16_le(PROTOCOL_VERSION);
        buf.put_u32_le(2);
        buf.put_u32_le(0);
        buf.put_slice(&[0xFF, 0xFE]);

        assert!(matches!(decode(&buf), Err(DecodeError::MalformedPayload(_))));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut wire = BytesMut::from(&encode(3, &json!([1])).unwrap()[..]);
        wire.put_slice(b"garbage");

        let msg = decode(&wire).unwrap();
        assert_eq!(msg.payload, json!([1]));
    }

    #[test]
    fn test_foreign_version_tolerated_unless_strict() {
        let msg = Message {
            signal: 9,
            version: 2,
            timestamp: 100,
            payload: json!({"v": 2}),
        };
        let wire = encode_message(&msg, &WireConfig::default()).unwrap();

        assert_eq!(decode(&wire).unwrap(), msg);

        let strict = WireConfig {
            strict_version: true,
            ..WireConfig::default()
        };
        assert!(matches!(
            decode_with_config(&wire, &strict),
            Err(DecodeError::UnsupportedVersion { found: 2, expected: 1 })
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_datagram() {
        let config = WireConfig {
            max_datagram_size: 32,
            ..WireConfig::default()
        };
        let msg = Message::new(1, json!({"blob": "x".repeat(64)}));

        assert!(matches!(
            encode_message(&msg, &config),
            Err(WireError::BodyTooLarge { max: 32, .. })
        ));
    }
}
