//! Abstract datagram transport for Prodigy
//!
//! The [`NetworkProvider`] trait lets the dispatch engine run over any async
//! datagram transport — plain UDP, a reliable-UDP implementation, or an
//! in-memory pair for tests. The built-in [`UdpProvider`] is backed by
//! `tokio::net::UdpSocket`.
//!
//! Binding is a constructor on the concrete provider (see
//! [`UdpProvider::bind`]); the trait covers the operations the engine needs
//! after binding, and is object-safe so providers are shared as
//! `Arc<dyn NetworkProvider>`.

use crate::config::RunnerConfig;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

/// Boxed future returned by [`NetworkProvider::send_to`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = io::Result<usize>> + Send + 'a>>;

/// Boxed future returned by [`NetworkProvider::recv_from`].
pub type RecvFuture<'a> =
    Pin<Box<dyn Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a>>;

/// Boxed future returned by [`NetworkProvider::run`].
pub type IoFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// Async datagram endpoint used by the dispatch engine.
///
/// `send_to` may be called concurrently from any task; implementors serialize
/// internally. The engine makes no assumption about reliability or ordering
/// beyond what the provider documents.
pub trait NetworkProvider: Send + Sync + 'static {
    /// Send `buf` to `target`, returning the number of bytes accepted.
    ///
    /// Completes when the transport accepts the datagram, not when the peer
    /// acknowledges it.
    fn send_to<'a>(&'a self, buf: &'a [u8], target: SocketAddr) -> SendFuture<'a>;

    /// Receive a datagram into `buf`, returning `(bytes_read, source_address)`.
    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a>;

    /// Drive internal I/O progress (retransmission timers, pacing).
    ///
    /// Runs until cancelled. Providers without internal work park forever.
    fn run<'a>(&'a self) -> IoFuture<'a>;

    /// Release resources. Idempotent; subsequent sends and receives fail.
    fn close(&self) -> io::Result<()>;

    /// Return the local address this provider is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

// ---------------------------------------------------------------------------
// UdpProvider — default implementation backed by tokio::net::UdpSocket
// ---------------------------------------------------------------------------

mod udp {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::UdpSocket;

    /// Default [`NetworkProvider`] wrapping a `tokio::net::UdpSocket`.
    ///
    /// Plain UDP: no retransmission and no pacing, so [`RunnerConfig`]'s
    /// reliability knobs are ignored here; `window_size` caps outbound
    /// datagrams. The receive side is sized by the dispatch loop from the
    /// same knob.
    pub struct UdpProvider {
        socket: UdpSocket,
        window_size: usize,
        closed: AtomicBool,
    }

    impl UdpProvider {
        /// Bind a new UDP socket to `addr`.
        ///
        /// Fails with the underlying `io::Error` when the address is unusable
        /// (already bound, no permission).
        pub async fn bind(addr: SocketAddr, config: &RunnerConfig) -> io::Result<Self> {
            let socket = UdpSocket::bind(addr).await?;
            Ok(Self::with_socket(socket, config))
        }

        /// Wrap an existing `UdpSocket`.
        pub fn with_socket(socket: UdpSocket, config: &RunnerConfig) -> Self {
            Self {
                socket,
                window_size: config.window_size as usize,
                closed: AtomicBool::new(false),
            }
        }

        fn check_open(&self) -> io::Result<()> {
            if self.closed.load(Ordering::Acquire) {
                Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "provider closed",
                ))
            } else {
                Ok(())
            }
        }
    }

    impl NetworkProvider for UdpProvider {
        fn send_to<'a>(&'a self, buf: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
            Box::pin(async move {
                self.check_open()?;
                if buf.len() > self.window_size {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "datagram of {} bytes exceeds window of {}",
                            buf.len(),
                            self.window_size
                        ),
                    ));
                }
                self.socket.send_to(buf, target).await
            })
        }

        fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a> {
            Box::pin(async move {
                self.check_open()?;
                self.socket.recv_from(buf).await
            })
        }

        fn run<'a>(&'a self) -> IoFuture<'a> {
            // No internal timers for plain UDP. Park until cancelled.
            Box::pin(std::future::pending::<io::Result<()>>())
        }

        fn close(&self) -> io::Result<()> {
            self.closed.store(true, Ordering::Release);
            Ok(())
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            self.socket.local_addr()
        }
    }
}

pub use udp::UdpProvider;
