//! Protocol dispatch engine
//!
//! Everything between the wire and user handlers: the protocol registry, the
//! pending-response correlation table, the sender capability, the request
//! view, and the runner that pumps the transport.

mod pending;
pub mod protocol;
mod registry;
pub mod request;
pub mod runner;
pub mod sender;

// Re-exports for convenience
pub use protocol::{HandlerFn, HandlerFuture, Protocol, ProtocolBuilder};
pub use request::Request;
pub use runner::ProtocolRunner;
pub use sender::Sender;
