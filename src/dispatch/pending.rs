//! Pending-response correlation table
//!
//! Maps in-flight exchange ids to one-shot delivery slots. The dispatch loop
//! fulfills slots as responses arrive; the caller side holds a [`PendingSlot`]
//! guard whose drop removes the reservation, so success, timeout, error, and
//! task cancellation all clean up exactly once.

use crate::common::{ExchangeId, Packet};
use crate::error::{ProdigyError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::trace;

/// Correlation table shared between the dispatch loop and exchange callers.
#[derive(Debug, Default)]
pub(crate) struct PendingResponses {
    // std Mutex: critical sections are single map operations, and slot
    // cleanup must run from a synchronous Drop.
    slots: Mutex<HashMap<ExchangeId, oneshot::Sender<Packet>>>,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ExchangeId, oneshot::Sender<Packet>>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve a one-shot slot for `exchange_id`.
    ///
    /// Must happen before the request is transmitted, so a response racing the
    /// send cannot be lost. Fails if the id is already reserved: with 64-bit
    /// random ids a collision indicates a broken id source.
    pub fn reserve(self: &Arc<Self>, exchange_id: ExchangeId) -> Result<PendingSlot> {
        let (tx, rx) = oneshot::channel();

        let mut slots = self.slots();
        if slots.contains_key(&exchange_id) {
            return Err(ProdigyError::internal(format!(
                "exchange id collision: {exchange_id:#018x}"
            )));
        }
        slots.insert(exchange_id, tx);
        drop(slots);

        Ok(PendingSlot {
            exchange_id,
            rx: Some(rx),
            table: Arc::clone(self),
        })
    }

    /// Fulfill the slot for `exchange_id`, if one is pending.
    ///
    /// Returns true when the packet reached a waiting caller. Unknown ids and
    /// slots whose caller already gave up (deliver losing a race with cancel)
    /// return false; the packet is dropped.
    pub fn deliver(&self, exchange_id: ExchangeId, packet: Packet) -> bool {
        let Some(tx) = self.slots().remove(&exchange_id) else {
            return false;
        };
        tx.send(packet).is_ok()
    }

    /// Remove the slot for `exchange_id` without delivery.
    ///
    /// A subsequent `deliver` for the same id is a no-op.
    pub fn cancel(&self, exchange_id: ExchangeId) -> bool {
        self.slots().remove(&exchange_id).is_some()
    }

    /// Number of exchanges currently awaiting a response.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Drop every reservation. Waiting callers observe a closed slot
    /// immediately instead of running out their timeouts.
    pub fn clear(&self) {
        self.slots().clear();
    }
}

/// Reservation guard for one in-flight exchange.
///
/// Consumed by [`PendingSlot::wait`]; dropping it (timeout path, transport
/// error, caller cancellation) removes the reservation from the table.
#[derive(Debug)]
pub(crate) struct PendingSlot {
    exchange_id: ExchangeId,
    rx: Option<oneshot::Receiver<Packet>>,
    table: Arc<PendingResponses>,
}

impl PendingSlot {
    /// Suspend until the response arrives or `timeout` elapses.
    pub async fn wait(mut self, timeout: Duration) -> Result<Packet> {
        let Some(rx) = self.rx.take() else {
            return Err(ProdigyError::internal("pending slot already consumed"));
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(packet)) => Ok(packet),
            // Sender dropped without delivery: the endpoint shut down.
            Ok(Err(_)) => Err(ProdigyError::transport(
                "endpoint closed while awaiting response",
            )),
            Err(_) => {
                trace!(exchange_id = self.exchange_id, "exchange timed out");
                Err(ProdigyError::timeout(timeout.as_millis() as u64))
            }
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        // No-op if deliver already removed the entry.
        self.table.cancel(self.exchange_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(id: ExchangeId) -> Packet {
        Packet::response(id, "p", "t", Bytes::from_static(b"ok"))
    }

    #[tokio::test]
    async fn test_reserve_then_deliver() {
        let table = Arc::new(PendingResponses::new());
        let slot = table.reserve(7).unwrap();
        assert_eq!(table.len(), 1);

        assert!(table.deliver(7, response(7)));
        let packet = slot.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(packet.exchange_id, 7);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_collision_detected() {
        let table = Arc::new(PendingResponses::new());
        let _slot = table.reserve(1).unwrap();

        let err = table.reserve(1).unwrap_err();
        assert!(matches!(err, ProdigyError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_deliver_unknown_id_is_dropped() {
        let table = Arc::new(PendingResponses::new());
        assert!(!table.deliver(99, response(99)));
    }

    #[tokio::test]
    async fn test_cancel_then_deliver_is_noop() {
        let table = Arc::new(PendingResponses::new());
        let slot = table.reserve(3).unwrap();

        assert!(table.cancel(3));
        assert!(!table.deliver(3, response(3)));
        assert_eq!(table.len(), 0);

        // The caller observes a closed slot, not a packet.
        let err = slot.wait(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ProdigyError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_timeout_removes_slot() {
        let table = Arc::new(PendingResponses::new());
        let slot = table.reserve(5).unwrap();

        let err = slot.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_dropping_slot_cleans_table() {
        let table = Arc::new(PendingResponses::new());
        {
            let _slot = table.reserve(11).unwrap();
            assert_eq!(table.len(), 1);
        }
        assert_eq!(table.len(), 0);
    }
}
