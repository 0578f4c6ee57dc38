//! In-process counters for runner observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by a runner's dispatch loop and senders.
///
/// All counters use relaxed ordering; they feed debug logging and tests, not
/// synchronization.
#[derive(Debug, Default)]
pub struct RunnerMetrics {
    /// Packets handed to the provider
    pub packets_sent: AtomicU64,
    /// Datagrams received by the dispatch loop
    pub packets_received: AtomicU64,
    /// Requests routed to a handler task
    pub requests_dispatched: AtomicU64,
    /// Responses delivered to a pending exchange
    pub responses_delivered: AtomicU64,
    /// Datagrams that failed packet decoding
    pub decode_failures: AtomicU64,
    /// Requests dropped for an unknown protocol or message type
    pub unknown_routes: AtomicU64,
    /// Responses dropped because no exchange was pending
    pub late_responses: AtomicU64,
    /// Handler tasks that returned an error
    pub handler_failures: AtomicU64,
}

impl RunnerMetrics {
    /// Create a zeroed metrics block
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_packet_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_packet_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_response_delivered(&self) {
        self.responses_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_route(&self) {
        self.unknown_routes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_late_response(&self) {
        self.late_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            responses_delivered: self.responses_delivered.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            unknown_routes: self.unknown_routes.load(Ordering::Relaxed),
            late_responses: self.late_responses.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`RunnerMetrics`] counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub requests_dispatched: u64,
    pub responses_delivered: u64,
    pub decode_failures: u64,
    pub unknown_routes: u64,
    pub late_responses: u64,
    pub handler_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = RunnerMetrics::new();
        metrics.record_packet_sent();
        metrics.record_packet_sent();
        metrics.record_late_response();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_sent, 2);
        assert_eq!(snapshot.late_responses, 1);
        assert_eq!(snapshot.packets_received, 0);
    }
}
