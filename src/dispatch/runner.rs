//! Protocol runner: endpoint lifecycle and the dispatch loop
//!
//! A [`ProtocolRunner`] owns one datagram endpoint and multiplexes every
//! protocol registered on it. Lifecycle is an explicit state machine:
//!
//! ```text
//! New --bind()--> Bound --run()--> Running --close()--> Closed
//! ```
//!
//! `run()` spawns two background tasks: one driving the provider's internal
//! progress, and the dispatch loop that receives datagrams, delivers response
//! packets to pending exchanges, and spawns a task per inbound request.

use crate::codec::{Codec, JsonCodec};
use crate::common::PacketKind;
use crate::config::RunnerConfig;
use crate::dispatch::pending::PendingResponses;
use crate::dispatch::protocol::Protocol;
use crate::dispatch::registry::ProtocolRegistry;
use crate::dispatch::request::Request;
use crate::dispatch::sender::Sender;
use crate::error::{ProdigyError, Result};
use crate::metrics::RunnerMetrics;
use crate::transport::{NetworkProvider, UdpProvider};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerState {
    New,
    Bound,
    Running,
    Closed,
}

/// One peer endpoint: registered protocols, pending exchanges, dispatch loop.
pub struct ProtocolRunner<C: Codec = JsonCodec> {
    codec: C,
    config: RunnerConfig,
    state: RunnerState,

    provider: Option<Arc<dyn NetworkProvider>>,
    registry: Arc<ProtocolRegistry<C>>,
    pending: Arc<PendingResponses>,
    metrics: Arc<RunnerMetrics>,

    // Background tasks
    dispatch_task: Option<tokio::task::JoinHandle<()>>,
    provider_task: Option<tokio::task::JoinHandle<()>>,
}

impl ProtocolRunner<JsonCodec> {
    /// Create a runner using the built-in JSON payload codec
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_codec(JsonCodec, config)
    }
}

impl<C: Codec> ProtocolRunner<C> {
    /// Create a runner with a custom payload codec
    pub fn with_codec(codec: C, config: RunnerConfig) -> Self {
        Self {
            codec,
            config,
            state: RunnerState::New,
            provider: None,
            registry: Arc::new(ProtocolRegistry::new()),
            pending: Arc::new(PendingResponses::new()),
            metrics: Arc::new(RunnerMetrics::new()),
            dispatch_task: None,
            provider_task: None,
        }
    }

    fn expect_state(&self, expected: RunnerState, op: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProdigyError::invalid_state(format!(
                "{op} requires {expected:?} state, runner is {:?}",
                self.state
            )))
        }
    }

    /// Bind the runner to a local UDP endpoint.
    ///
    /// Validates the configuration and claims the address; a bind conflict
    /// surfaces the underlying I/O error.
    pub async fn bind(&mut self, addr: SocketAddr) -> Result<()> {
        self.expect_state(RunnerState::New, "bind")?;
        self.config.validate()?;

        let provider = UdpProvider::bind(addr, &self.config).await?;
        self.install_provider(Arc::new(provider))
    }

    /// Bind the runner to an already-constructed transport provider.
    pub fn bind_provider(&mut self, provider: Arc<dyn NetworkProvider>) -> Result<()> {
        self.expect_state(RunnerState::New, "bind")?;
        self.config.validate()?;
        self.install_provider(provider)
    }

    fn install_provider(&mut self, provider: Arc<dyn NetworkProvider>) -> Result<()> {
        let addr = provider.local_addr()?;
        self.provider = Some(provider);
        self.state = RunnerState::Bound;
        info!(addr = %addr, "runner bound");
        Ok(())
    }

    /// Register a protocol on this runner. Last registration per name wins.
    ///
    /// Allowed in any state, including while the dispatch loop is running;
    /// the new handlers apply to subsequent packets.
    pub async fn register_protocol(&self, protocol: Protocol<C>) {
        self.registry.register(protocol).await;
    }

    /// Start the dispatch loop and the provider progress task.
    pub fn run(&mut self) -> Result<()> {
        self.expect_state(RunnerState::Bound, "run")?;

        let provider = self.provider_handle()?;

        let progress = Arc::clone(&provider);
        self.provider_task = Some(tokio::spawn(async move {
            if let Err(e) = progress.run().await {
                error!(error = %e, "provider progress task failed");
            }
        }));

        let registry = Arc::clone(&self.registry);
        let pending = Arc::clone(&self.pending);
        let metrics = Arc::clone(&self.metrics);
        let codec = self.codec.clone();
        let exchange_timeout = self.config.exchange_timeout;
        let recv_buffer_len = self.config.window_size as usize;
        self.dispatch_task = Some(tokio::spawn(dispatch_loop(
            provider,
            registry,
            pending,
            codec,
            metrics,
            exchange_timeout,
            recv_buffer_len,
        )));

        self.state = RunnerState::Running;
        if let Some(addr) = self.local_addr() {
            info!(addr = %addr, "runner started");
        }
        Ok(())
    }

    /// Obtain an outbound [`Sender`] for this endpoint.
    ///
    /// Available from the moment the runner is bound.
    pub fn sender(&self) -> Result<Sender<C>> {
        let provider = self.provider_handle()?;
        Ok(Sender::new(
            provider,
            self.codec.clone(),
            Arc::clone(&self.pending),
            Arc::clone(&self.metrics),
            self.config.exchange_timeout,
        ))
    }

    fn provider_handle(&self) -> Result<Arc<dyn NetworkProvider>> {
        self.provider
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ProdigyError::invalid_state("runner is not bound"))
    }

    /// Stop the dispatch loop and release the endpoint. Idempotent.
    ///
    /// Outstanding `exchange` callers observe a transport error immediately;
    /// handler tasks already running fail fast on the closed provider.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == RunnerState::Closed {
            return Ok(());
        }

        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        if let Some(task) = self.provider_task.take() {
            task.abort();
        }

        if let Some(provider) = &self.provider {
            provider.close()?;
        }
        self.pending.clear();

        let addr = self.local_addr();
        self.state = RunnerState::Closed;
        match addr {
            Some(addr) => info!(addr = %addr, "runner closed"),
            None => info!("runner closed"),
        }
        Ok(())
    }

    /// Local address, once bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.provider
            .as_ref()
            .and_then(|p| p.local_addr().ok())
    }

    /// Number of exchanges currently awaiting responses on this endpoint
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Dispatch counters for this runner
    pub fn metrics(&self) -> Arc<RunnerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether the dispatch loop is running
    pub fn is_running(&self) -> bool {
        self.state == RunnerState::Running
    }

    /// Whether the runner has been closed
    pub fn is_closed(&self) -> bool {
        self.state == RunnerState::Closed
    }
}

impl<C: Codec> Drop for ProtocolRunner<C> {
    fn drop(&mut self) {
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        if let Some(task) = self.provider_task.take() {
            task.abort();
        }
    }
}

impl<C: Codec> std::fmt::Debug for ProtocolRunner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRunner")
            .field("state", &self.state)
            .field("local_addr", &self.local_addr())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// The dispatch loop: single reader of the provider.
///
/// Classifies each datagram and either fulfills a pending exchange (response)
/// or spawns a handler task (request). Malformed packets, unknown routes, and
/// late responses are logged and dropped without affecting the loop.
async fn dispatch_loop<C: Codec>(
    provider: Arc<dyn NetworkProvider>,
    registry: Arc<ProtocolRegistry<C>>,
    pending: Arc<PendingResponses>,
    codec: C,
    metrics: Arc<RunnerMetrics>,
    exchange_timeout: Duration,
    recv_buffer_len: usize,
) {
    // Sized from the configured window: a datagram the provider would refuse
    // to send cannot be received whole either.
    let mut buf = vec![0u8; recv_buffer_len];

    loop {
        let (size, peer_addr) = match provider.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!(error = %e, "receive failed, dispatch loop stopping");
                break;
            }
        };
        metrics.record_packet_received();

        let packet = match codec.decode_packet(Bytes::copy_from_slice(&buf[..size])) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(peer = %peer_addr, error = %e, "dropping malformed packet");
                metrics.record_decode_failure();
                continue;
            }
        };

        match packet.kind {
            PacketKind::Response => {
                let exchange_id = packet.exchange_id;
                if pending.deliver(exchange_id, packet) {
                    metrics.record_response_delivered();
                } else {
                    // Late reply after timeout, or a response we never asked for.
                    debug!(
                        exchange_id,
                        peer = %peer_addr,
                        "dropping response with no pending exchange"
                    );
                    metrics.record_late_response();
                }
            }
            PacketKind::Request => {
                let Some(handler) = registry
                    .lookup(&packet.protocol_name, &packet.message_type)
                    .await
                else {
                    debug!(
                        peer = %peer_addr,
                        protocol = %packet.protocol_name,
                        message_type = %packet.message_type,
                        "dropping request for unknown route"
                    );
                    metrics.record_unknown_route();
                    continue;
                };

                let protocol = packet.protocol_name.clone();
                let message_type = packet.message_type.clone();
                let request = Request::from_packet(
                    packet,
                    peer_addr,
                    Arc::clone(&provider),
                    codec.clone(),
                    Arc::clone(&metrics),
                );
                let sender = Sender::new(
                    Arc::clone(&provider),
                    codec.clone(),
                    Arc::clone(&pending),
                    Arc::clone(&metrics),
                    exchange_timeout,
                );

                metrics.record_request_dispatched();
                let task_metrics = Arc::clone(&metrics);

                // Handlers get their own task so the loop keeps pumping; an
                // inline handler performing an exchange against this same
                // runner would wait on a response the blocked loop could
                // never deliver. The task boundary also isolates panics.
                tokio::spawn(async move {
                    if let Err(e) = handler(request, sender).await {
                        warn!(
                            error = %e,
                            peer = %peer_addr,
                            protocol = %protocol,
                            message_type = %message_type,
                            "handler failed"
                        );
                        task_metrics.record_handler_failure();
                    }
                });
            }
        }
    }
}
