//! Common types for the Prodigy wire protocol

use crate::error::{ProdigyError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Wire protocol constants
pub mod wire {
    /// Fixed header size in bytes
    pub const HEADER_SIZE: usize = 17;
    /// Kind byte: request packet
    pub const KIND_REQUEST: u8 = 1;
    /// Kind byte: response packet
    pub const KIND_RESPONSE: u8 = 2;
    /// Maximum encoded length of a protocol or message-type name
    pub const MAX_NAME_LEN: usize = u16::MAX as usize;
}

/// Exchange identifier type
///
/// A 64-bit opaque correlation token, generated per outbound request and echoed
/// verbatim by the matching response.
pub type ExchangeId = u64;

/// Packet classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// A request: dispatched to a registered handler at the receiving peer
    Request,
    /// A response: delivered to the pending exchange with the same id
    Response,
}

impl PacketKind {
    fn as_byte(self) -> u8 {
        match self {
            PacketKind::Request => wire::KIND_REQUEST,
            PacketKind::Response => wire::KIND_RESPONSE,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            wire::KIND_REQUEST => Ok(PacketKind::Request),
            wire::KIND_RESPONSE => Ok(PacketKind::Response),
            other => Err(ProdigyError::protocol(format!(
                "unknown packet kind byte {other}"
            ))),
        }
    }
}

/// Self-describing wire packet
///
/// Carries routing metadata (`exchange_id`, `kind`) plus the addressed
/// destination (`protocol_name`, `message_type`) and an opaque payload.
///
/// Equality is defined over `(protocol_name, message_type, payload)` only;
/// `exchange_id` and `kind` are routing metadata, not identity. Routing never
/// relies on packet equality — responses are matched by `exchange_id`.
#[derive(Debug, Clone)]
pub struct Packet {
    pub exchange_id: ExchangeId,
    pub kind: PacketKind,
    pub protocol_name: String,
    pub message_type: String,
    pub payload: Bytes,
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.protocol_name == other.protocol_name
            && self.message_type == other.message_type
            && self.payload == other.payload
    }
}

impl Eq for Packet {}

impl Packet {
    /// Create a request packet
    pub fn request(
        exchange_id: ExchangeId,
        protocol_name: impl Into<String>,
        message_type: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            exchange_id,
            kind: PacketKind::Request,
            protocol_name: protocol_name.into(),
            message_type: message_type.into(),
            payload,
        }
    }

    /// Create a response packet echoing the given exchange id
    pub fn response(
        exchange_id: ExchangeId,
        protocol_name: impl Into<String>,
        message_type: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            exchange_id,
            kind: PacketKind::Response,
            protocol_name: protocol_name.into(),
            message_type: message_type.into(),
            payload,
        }
    }

    /// Check if this is a request packet
    pub fn is_request(&self) -> bool {
        self.kind == PacketKind::Request
    }

    /// Check if this is a response packet
    pub fn is_response(&self) -> bool {
        self.kind == PacketKind::Response
    }

    /// Total encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        wire::HEADER_SIZE + self.protocol_name.len() + self.message_type.len() + self.payload.len()
    }

    /// Encode the packet into its wire representation.
    ///
    /// Layout (little-endian):
    /// `u64 exchange_id | u8 kind | u16 proto_len | u16 type_len | u32 payload_len`
    /// followed by the protocol name, message type, and payload bytes.
    pub fn encode(&self) -> Result<Bytes> {
        if self.protocol_name.len() > wire::MAX_NAME_LEN {
            return Err(ProdigyError::protocol("protocol name too long"));
        }
        if self.message_type.len() > wire::MAX_NAME_LEN {
            return Err(ProdigyError::protocol("message type too long"));
        }

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u64_le(self.exchange_id);
        buf.put_u8(self.kind.as_byte());
        buf.put_u16_le(self.protocol_name.len() as u16);
        buf.put_u16_le(self.message_type.len() as u16);
        buf.put_u32_le(self.payload.len() as u32);
        buf.extend_from_slice(self.protocol_name.as_bytes());
        buf.extend_from_slice(self.message_type.as_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf.freeze())
    }

    /// Decode a packet from its wire representation.
    ///
    /// The whole buffer must be consumed; short or trailing bytes are a
    /// protocol error.
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.len() < wire::HEADER_SIZE {
            return Err(ProdigyError::protocol(format!(
                "packet too small: {} bytes",
                buf.len()
            )));
        }

        let exchange_id = buf.get_u64_le();
        let kind = PacketKind::from_byte(buf.get_u8())?;
        let proto_len = buf.get_u16_le() as usize;
        let type_len = buf.get_u16_le() as usize;
        let payload_len = buf.get_u32_le() as usize;

        if buf.len() != proto_len + type_len + payload_len {
            return Err(ProdigyError::protocol(format!(
                "packet body length mismatch: got {}, expected {}",
                buf.len(),
                proto_len + type_len + payload_len
            )));
        }

        let protocol_name = String::from_utf8(buf.split_to(proto_len).to_vec())
            .map_err(|_| ProdigyError::protocol("protocol name is not valid UTF-8"))?;
        let message_type = String::from_utf8(buf.split_to(type_len).to_vec())
            .map_err(|_| ProdigyError::protocol("message type is not valid UTF-8"))?;

        Ok(Self {
            exchange_id,
            kind,
            protocol_name,
            message_type,
            payload: buf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Packet {
        Packet::request(
            0x0123_4567_89ab_cdef,
            "chat",
            "message",
            Bytes::from_static(b"hello"),
        )
    }

    #[test]
    fn test_roundtrip() {
        let packet = sample();
        let encoded = packet.encode().unwrap();
        let decoded = Packet::decode(encoded).unwrap();

        assert_eq!(decoded, packet);
        assert_eq!(decoded.exchange_id, packet.exchange_id);
        assert_eq!(decoded.kind, packet.kind);
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let packet = Packet::response(7, "p", "t", Bytes::new());
        let decoded = Packet::decode(packet.encode().unwrap()).unwrap();

        assert_eq!(decoded.exchange_id, 7);
        assert_eq!(decoded.kind, PacketKind::Response);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_equality_ignores_routing_metadata() {
        let a = Packet::request(1, "p", "t", Bytes::from_static(b"x"));
        let b = Packet::response(2, "p", "t", Bytes::from_static(b"x"));

        // Same (protocol, type, payload): equal despite differing id and kind.
        assert_eq!(a, b);

        let c = Packet::request(1, "p", "t", Bytes::from_static(b"y"));
        assert_ne!(a, c);
    }

    #[test]
    fn test_decode_too_small() {
        let err = Packet::decode(Bytes::from_static(&[0u8; 5])).unwrap_err();
        assert!(matches!(err, ProdigyError::Protocol { .. }));
    }

    #[test]
    fn test_decode_bad_kind() {
        let mut encoded = BytesMut::from(&sample().encode().unwrap()[..]);
        encoded[8] = 99;
        let err = Packet::decode(encoded.freeze()).unwrap_err();
        assert!(matches!(err, ProdigyError::Protocol { .. }));
    }

    #[test]
    fn test_decode_truncated_body() {
        let encoded = sample().encode().unwrap();
        let truncated = encoded.slice(..encoded.len() - 2);
        assert!(Packet::decode(truncated).is_err());
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut buf = BytesMut::from(&sample().encode().unwrap()[..]);
        buf.extend_from_slice(b"junk");
        assert!(Packet::decode(buf.freeze()).is_err());
    }

    #[test]
    fn test_encoded_len() {
        let packet = sample();
        assert_eq!(packet.encode().unwrap().len(), packet.encoded_len());
    }
}
