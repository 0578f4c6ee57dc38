//! Outbound messaging capability
//!
//! [`Sender`] is the handle through which application code and handlers emit
//! packets: fire-and-forget [`send`], or a correlated [`exchange`] that
//! suspends until the matching response arrives or a timeout elapses. Senders
//! are cheap to clone and share the runner's provider, codec, and
//! pending-response table.
//!
//! [`send`]: Sender::send
//! [`exchange`]: Sender::exchange

use crate::codec::Codec;
use crate::common::{ExchangeId, Packet};
use crate::dispatch::pending::PendingResponses;
use crate::error::{ProdigyError, Result};
use crate::metrics::RunnerMetrics;
use crate::transport::NetworkProvider;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Clonable outbound capability bound to one runner endpoint.
pub struct Sender<C: Codec> {
    provider: Arc<dyn NetworkProvider>,
    codec: C,
    pending: Arc<PendingResponses>,
    metrics: Arc<RunnerMetrics>,
    exchange_timeout: Duration,
}

impl<C: Codec> Clone for Sender<C> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            codec: self.codec.clone(),
            pending: Arc::clone(&self.pending),
            metrics: Arc::clone(&self.metrics),
            exchange_timeout: self.exchange_timeout,
        }
    }
}

impl<C: Codec> Sender<C> {
    pub(crate) fn new(
        provider: Arc<dyn NetworkProvider>,
        codec: C,
        pending: Arc<PendingResponses>,
        metrics: Arc<RunnerMetrics>,
        exchange_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            codec,
            pending,
            metrics,
            exchange_timeout,
        }
    }

    fn encode_body<B: Serialize>(&self, body: Option<&B>) -> Result<Bytes> {
        match body {
            Some(value) => self.codec.encode_payload(value),
            None => Ok(Bytes::new()),
        }
    }

    async fn transmit(&self, packet: &Packet, recipient: SocketAddr) -> Result<()> {
        let encoded = self.codec.encode_packet(packet)?;
        self.provider
            .send_to(&encoded, recipient)
            .await
            .map_err(|e| ProdigyError::transport(e.to_string()))?;
        self.metrics.record_packet_sent();
        Ok(())
    }

    /// Send a one-way request packet. No response is awaited.
    ///
    /// Completes when the provider accepts the datagram. Pass `None::<&()>`
    /// for a body-less message.
    pub async fn send<B: Serialize>(
        &self,
        protocol_name: &str,
        message_type: &str,
        recipient: SocketAddr,
        body: Option<&B>,
    ) -> Result<()> {
        let payload = self.encode_body(body)?;
        let packet = Packet::request(fresh_exchange_id(), protocol_name, message_type, payload);

        self.transmit(&packet, recipient).await?;

        trace!(
            exchange_id = packet.exchange_id,
            peer = %recipient,
            protocol = %protocol_name,
            message_type = %message_type,
            "one-way request sent"
        );

        Ok(())
    }

    /// Send a request and suspend until the matching response arrives,
    /// decoding its payload as `T`. Uses the configured default timeout.
    pub async fn exchange<T, B>(
        &self,
        protocol_name: &str,
        message_type: &str,
        recipient: SocketAddr,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.exchange_with_timeout(
            protocol_name,
            message_type,
            recipient,
            body,
            self.exchange_timeout,
        )
        .await
    }

    /// [`exchange`](Sender::exchange) with an explicit timeout.
    ///
    /// The pending-response slot is reserved before the datagram is handed to
    /// the provider, so a response racing the send cannot be lost. On any
    /// failure path (transport error, timeout, caller cancellation) the slot
    /// is removed.
    pub async fn exchange_with_timeout<T, B>(
        &self,
        protocol_name: &str,
        message_type: &str,
        recipient: SocketAddr,
        body: Option<&B>,
        timeout: Duration,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let payload = self.encode_body(body)?;
        let exchange_id = fresh_exchange_id();

        // Reserve before send; the slot guard cancels itself on every
        // non-success exit from this function.
        let slot = self.pending.reserve(exchange_id)?;

        let packet = Packet::request(exchange_id, protocol_name, message_type, payload);
        self.transmit(&packet, recipient).await?;

        trace!(
            exchange_id,
            peer = %recipient,
            protocol = %protocol_name,
            message_type = %message_type,
            timeout_ms = timeout.as_millis() as u64,
            "exchange started"
        );

        let response = slot.wait(timeout).await?;
        self.codec.decode_payload(&response.payload)
    }

    /// Number of exchanges currently awaiting a response on this endpoint
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Local address of the underlying endpoint
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.provider.local_addr().map_err(ProdigyError::Io)
    }
}

impl<C: Codec> std::fmt::Debug for Sender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("pending", &self.pending.len())
            .field("exchange_timeout", &self.exchange_timeout)
            .finish()
    }
}

/// Draw a fresh 64-bit exchange id.
fn fresh_exchange_id() -> ExchangeId {
    rand::random::<u64>()
}
