//! Configuration types for Prodigy runners

use crate::error::{ProdigyError, Result};
use std::time::Duration;

/// Runner configuration builder
///
/// The transport knobs (`retransmit_timeout`, `flush_interval`, `window_size`)
/// are forwarded to the network provider. `window_size` bounds datagrams in
/// both directions: the built-in plain-UDP provider rejects oversized sends,
/// and the dispatch loop sizes its receive buffer from it. The retransmission
/// knobs take effect on providers that implement reliable delivery.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Default timeout for `exchange` calls
    pub exchange_timeout: Duration,
    /// Transport-level retransmission timeout
    pub retransmit_timeout: Duration,
    /// Transport-level flow-control flush interval
    pub flush_interval: Duration,
    /// Maximum datagram size in bytes
    pub window_size: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            exchange_timeout: Duration::from_secs(10),
            retransmit_timeout: Duration::from_secs(15),
            flush_interval: Duration::from_millis(100),
            window_size: 1400,
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default `exchange` timeout
    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    /// Set the transport retransmission timeout
    pub fn retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.retransmit_timeout = timeout;
        self
    }

    /// Set the transport flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the maximum datagram size
    pub fn window_size(mut self, size: u32) -> Self {
        self.window_size = size;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.exchange_timeout.is_zero() {
            return Err(ProdigyError::config(
                "Exchange timeout must be greater than zero",
            ));
        }

        if self.retransmit_timeout.is_zero() {
            return Err(ProdigyError::config(
                "Retransmit timeout must be greater than zero",
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(ProdigyError::config(
                "Flush interval must be greater than zero",
            ));
        }

        if self.window_size < 64 || self.window_size > 65535 {
            return Err(ProdigyError::config(
                "Window size must be between 64 and 65535",
            ));
        }

        Ok(())
    }
}

/// Preset configurations for common use cases
impl RunnerConfig {
    /// Configuration for latency-sensitive exchanges
    pub fn realtime() -> Self {
        Self::default()
            .exchange_timeout(Duration::from_secs(10))
            .retransmit_timeout(Duration::from_secs(10))
            .flush_interval(Duration::from_millis(20))
    }

    /// Configuration for bulkier payloads on patient links
    pub fn bulk() -> Self {
        Self::default()
            .exchange_timeout(Duration::from_secs(30))
            .retransmit_timeout(Duration::from_secs(30))
            .window_size(8192)
    }
}
