//! Protocol descriptors and the handler authoring surface
//!
//! A protocol is a named bundle of message handlers. Authors build one with
//! [`Protocol::builder`]:
//!
//! ```rust
//! use prodigy::{Protocol, JsonCodec};
//!
//! let protocol: Protocol<JsonCodec> = Protocol::builder("room")
//!     .on("echo", |mut request, _sender| async move {
//!         let body: Vec<u8> = request.payload_as()?;
//!         request.respond(Some(&body)).await
//!     })
//!     .build();
//! ```
//!
//! Handlers receive the inbound [`Request`] view and a [`Sender`] clone, so
//! they can respond, fire follow-up messages, or start exchanges of their own.

use crate::codec::{Codec, JsonCodec};
use crate::dispatch::request::Request;
use crate::dispatch::sender::Sender;
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future produced by a handler invocation
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Shared, type-erased message handler
pub type HandlerFn<C> = Arc<dyn Fn(Request<C>, Sender<C>) -> HandlerFuture + Send + Sync>;

/// Immutable protocol descriptor: a name plus its message handlers.
///
/// Built once via [`ProtocolBuilder`] and read-only afterward.
pub struct Protocol<C: Codec = JsonCodec> {
    name: String,
    handlers: HashMap<String, HandlerFn<C>>,
}

impl<C: Codec> Protocol<C> {
    /// Start building a protocol with the given name
    pub fn builder(name: impl Into<String>) -> ProtocolBuilder<C> {
        ProtocolBuilder {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    /// Protocol name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the handler for a message type
    pub fn handler(&self, message_type: &str) -> Option<HandlerFn<C>> {
        self.handlers.get(message_type).cloned()
    }

    /// Registered message types
    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl<C: Codec> std::fmt::Debug for Protocol<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("name", &self.name)
            .field("message_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Declarative builder collecting `(message_type, handler)` pairs.
pub struct ProtocolBuilder<C: Codec = JsonCodec> {
    name: String,
    handlers: HashMap<String, HandlerFn<C>>,
}

impl<C: Codec> ProtocolBuilder<C> {
    /// Register a handler for `message_type`.
    ///
    /// Registering the same message type twice keeps the last handler.
    pub fn on<F, Fut>(mut self, message_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request<C>, Sender<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: HandlerFn<C> =
            Arc::new(move |request, sender| Box::pin(handler(request, sender)));
        self.handlers.insert(message_type.into(), handler);
        self
    }

    /// Finalize the descriptor
    pub fn build(self) -> Protocol<C> {
        Protocol {
            name: self.name,
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;

    #[test]
    fn test_builder_collects_handlers() {
        let protocol: Protocol<JsonCodec> = Protocol::builder("chat")
            .on("join", |_request, _sender| async { Ok(()) })
            .on("leave", |_request, _sender| async { Ok(()) })
            .build();

        assert_eq!(protocol.name(), "chat");
        assert_eq!(protocol.handler_count(), 2);
        assert!(protocol.handler("join").is_some());
        assert!(protocol.handler("leave").is_some());
        assert!(protocol.handler("missing").is_none());
    }

    #[test]
    fn test_duplicate_message_type_keeps_last() {
        let protocol: Protocol<JsonCodec> = Protocol::builder("p")
            .on("m", |_request, _sender| async { Ok(()) })
            .on("m", |_request, _sender| async { Ok(()) })
            .build();

        assert_eq!(protocol.handler_count(), 1);
    }
}
