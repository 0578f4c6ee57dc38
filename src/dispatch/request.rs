//! Inbound request view handed to protocol handlers

use crate::codec::Codec;
use crate::common::{ExchangeId, Packet};
use crate::error::{ProdigyError, Result};
use crate::metrics::RunnerMetrics;
use crate::transport::NetworkProvider;
use bytes::Bytes;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::trace;

/// One inbound request, exclusive to its handler invocation.
///
/// Exposes the packet metadata read-only plus a one-shot [`respond`] that
/// echoes the request's exchange id back to the sender. Responding is
/// optional; a request left unanswered makes the remote `exchange` time out.
///
/// [`respond`]: Request::respond
pub struct Request<C: Codec> {
    exchange_id: ExchangeId,
    protocol_name: String,
    message_type: String,
    payload: Bytes,
    sender_addr: SocketAddr,
    responded: bool,

    provider: Arc<dyn NetworkProvider>,
    codec: C,
    metrics: Arc<RunnerMetrics>,
}

impl<C: Codec> Request<C> {
    pub(crate) fn from_packet(
        packet: Packet,
        sender_addr: SocketAddr,
        provider: Arc<dyn NetworkProvider>,
        codec: C,
        metrics: Arc<RunnerMetrics>,
    ) -> Self {
        Self {
            exchange_id: packet.exchange_id,
            protocol_name: packet.protocol_name,
            message_type: packet.message_type,
            payload: packet.payload,
            sender_addr,
            responded: false,
            provider,
            codec,
            metrics,
        }
    }

    /// Address of the peer that sent this request
    pub fn sender(&self) -> SocketAddr {
        self.sender_addr
    }

    /// Correlation id of the exchange this request belongs to
    pub fn exchange_id(&self) -> ExchangeId {
        self.exchange_id
    }

    /// Protocol this request was addressed to
    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    /// Message type within the protocol
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decode the payload as `T`
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        self.codec.decode_payload(&self.payload)
    }

    /// Whether a response has already been sent
    pub fn has_responded(&self) -> bool {
        self.responded
    }

    /// Send a response back to the requesting peer.
    ///
    /// The response packet carries the same exchange id as the request so the
    /// remote pending-response table can correlate it. A second call fails
    /// with [`ProdigyError::AlreadyResponded`]; the flag is only set once the
    /// transport accepted the first response, so a failed transmit may be
    /// retried.
    pub async fn respond<B: Serialize>(&mut self, body: Option<&B>) -> Result<()> {
        if self.responded {
            return Err(ProdigyError::AlreadyResponded);
        }

        let payload = match body {
            Some(value) => self.codec.encode_payload(value)?,
            None => Bytes::new(),
        };

        let packet = Packet::response(
            self.exchange_id,
            self.protocol_name.clone(),
            self.message_type.clone(),
            payload,
        );
        let encoded = self.codec.encode_packet(&packet)?;

        self.provider
            .send_to(&encoded, self.sender_addr)
            .await
            .map_err(|e| ProdigyError::transport(e.to_string()))?;
        self.metrics.record_packet_sent();
        self.responded = true;

        trace!(
            exchange_id = self.exchange_id,
            peer = %self.sender_addr,
            protocol = %self.protocol_name,
            message_type = %self.message_type,
            "response sent"
        );

        Ok(())
    }
}

impl<C: Codec> std::fmt::Debug for Request<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("exchange_id", &self.exchange_id)
            .field("protocol_name", &self.protocol_name)
            .field("message_type", &self.message_type)
            .field("payload_len", &self.payload.len())
            .field("sender", &self.sender_addr)
            .field("responded", &self.responded)
            .finish()
    }
}
