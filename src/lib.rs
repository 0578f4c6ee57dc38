//! # Prodigy - Peer-to-Peer Protocol Messaging
//!
//! A small async framework for peer-to-peer messaging over datagram
//! transports. Applications declare *protocols* — named collections of typed
//! message handlers — and drive them over a single bound endpoint. Packets are
//! self-describing; some are fire-and-forget, others follow a request/response
//! exchange correlated by a 64-bit exchange id.
//!
//! ## Features
//!
//! - **Async-First Design**: built on Tokio; every suspension point yields
//! - **Concurrent Exchanges**: many request/response round trips multiplexed
//!   over one endpoint, each parked on its own one-shot slot
//! - **Handler Isolation**: inbound requests run in their own tasks; a failing
//!   or slow handler never stalls the dispatch loop
//! - **Pluggable Transport**: anything implementing [`NetworkProvider`]
//! - **Pluggable Payloads**: serde-based [`Codec`], JSON by default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prodigy::{Protocol, ProtocolRunner, RunnerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runner = ProtocolRunner::new(RunnerConfig::default());
//!     runner.bind("127.0.0.1:7001".parse()?).await?;
//!
//!     runner
//!         .register_protocol(
//!             Protocol::builder("greeter")
//!                 .on("hello", |mut request, _sender| async move {
//!                     let name: String = request.payload_as()?;
//!                     request.respond(Some(&format!("hello, {name}"))).await
//!                 })
//!                 .build(),
//!         )
//!         .await;
//!
//!     runner.run()?;
//!
//!     // Ask a peer running the same protocol
//!     let sender = runner.sender()?;
//!     let reply: String = sender
//!         .exchange_with_timeout(
//!             "greeter",
//!             "hello",
//!             "127.0.0.1:7002".parse()?,
//!             Some(&"prodigy".to_string()),
//!             Duration::from_secs(5),
//!         )
//!         .await?;
//!     println!("{reply}");
//!
//!     runner.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Authoring API     │  Protocol, ProtocolBuilder
//! ├─────────────────────┤
//! │   Dispatch Engine   │  ProtocolRunner, Sender, Request,
//! │                     │  registry + pending-response table
//! ├─────────────────────┤
//! │   Codec Layer       │  Codec trait, JsonCodec, packet framing
//! ├─────────────────────┤
//! │   Transport Layer   │  NetworkProvider trait, UdpProvider
//! └─────────────────────┘
//! ```

// Dispatch engine: runner, sender, request view, protocol authoring
pub mod dispatch;
pub use dispatch::{Protocol, ProtocolBuilder, ProtocolRunner, Request, Sender};

// Transport abstraction
pub mod transport;
pub use transport::{NetworkProvider, UdpProvider};

// Payload and packet serialization
pub mod codec;
pub use codec::{Codec, JsonCodec};

// Common types and utilities
pub mod common;
pub mod config;
pub mod error;
pub mod metrics;

// Re-exports
pub use common::{ExchangeId, Packet, PacketKind};
pub use config::RunnerConfig;
pub use error::{ProdigyError, Result};
pub use metrics::{MetricsSnapshot, RunnerMetrics};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: u32 = 1;
