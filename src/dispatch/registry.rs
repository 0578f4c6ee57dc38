//! Protocol registry for routing requests to handlers

use crate::codec::Codec;
use crate::dispatch::protocol::{HandlerFn, Protocol};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Registry mapping protocol names to protocol descriptors.
///
/// Read on every dispatched request; writable at any time, including while the
/// dispatch loop is running. Registrations made after `run()` are visible to
/// subsequent packets.
pub(crate) struct ProtocolRegistry<C: Codec> {
    protocols: RwLock<HashMap<String, Arc<Protocol<C>>>>,
}

impl<C: Codec> ProtocolRegistry<C> {
    pub fn new() -> Self {
        Self {
            protocols: RwLock::new(HashMap::new()),
        }
    }

    /// Register a protocol under its name. Last writer wins.
    pub async fn register(&self, protocol: Protocol<C>) {
        let name = protocol.name().to_string();
        let mut protocols = self.protocols.write().await;
        if protocols.insert(name.clone(), Arc::new(protocol)).is_some() {
            debug!(protocol = %name, "re-registered protocol, previous descriptor replaced");
        }
    }

    /// Look up the handler for `(protocol_name, message_type)`.
    pub async fn lookup(&self, protocol_name: &str, message_type: &str) -> Option<HandlerFn<C>> {
        let protocols = self.protocols.read().await;
        protocols.get(protocol_name)?.handler(message_type)
    }
}
