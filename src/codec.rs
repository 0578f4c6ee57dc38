//! Pluggable payload and packet serialization
//!
//! The [`Codec`] trait covers two layers: turning handler-facing values into
//! payload bytes and back, and turning whole [`Packet`]s into wire blobs. The
//! payload layer is what varies between deployments, so the packet-blob
//! methods default to the built-in binary framing and rarely need overriding.
//!
//! [`JsonCodec`] is the built-in implementation. It is a good default for
//! debugging (human-readable payloads) and interop, at the cost of size.

use crate::common::Packet;
use crate::error::{ProdigyError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Pluggable (de)serialization capability.
///
/// Payload types must implement serde's `Serialize`/`DeserializeOwned`; the
/// codec decides the byte format. `Clone + Send + Sync` so a codec instance can
/// be shared by the dispatch loop, senders, and handler tasks.
pub trait Codec: Clone + Send + Sync + 'static {
    /// Encode a payload value to bytes.
    fn encode_payload<T: Serialize>(&self, value: &T) -> Result<Bytes>;

    /// Decode payload bytes as the requested type.
    ///
    /// Fails with [`ProdigyError::PayloadDecode`] on a type mismatch.
    fn decode_payload<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T>;

    /// Encode a whole packet into its wire blob.
    fn encode_packet(&self, packet: &Packet) -> Result<Bytes> {
        packet.encode()
    }

    /// Decode a wire blob back into a packet.
    ///
    /// Fails with [`ProdigyError::Protocol`] on malformed input.
    fn decode_packet(&self, buf: Bytes) -> Result<Packet> {
        Packet::decode(buf)
    }
}

/// JSON codec backed by serde_json.
///
/// An empty payload decodes as JSON `null`, so `()` and `Option<T>` round-trip
/// for body-less messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_payload<T: Serialize>(&self, value: &T) -> Result<Bytes> {
        let encoded = serde_json::to_vec(value)
            .map_err(|e| ProdigyError::payload_encode(e.to_string()))?;
        Ok(Bytes::from(encoded))
    }

    fn decode_payload<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T> {
        let buf = if buf.is_empty() { b"null" } else { buf };
        serde_json::from_slice(buf).map_err(|e| ProdigyError::payload_decode(e.to_string()))
    }
}
