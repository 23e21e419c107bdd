//! # Server
//!
//! Owns the registry and runs one worker per connection.
//!
//! A worker reads a `Call`, dispatches it, writes the `Reply`, and repeats until the
//! peer closes the stream. Calls on one connection are strictly sequential; handlers
//! run to completion on the worker before the next envelope is read.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use dynrpc::CodecError;
use dynrpc::FrameReader;
use dynrpc::encode_reply;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::net::TcpListener;
use tokio::net::ToSocketAddrs;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::registry::Registry;
use crate::registry::Service;
use crate::registry::ServiceEntry;

/// Strong type for connection identifiers, used in log fields.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug)]
pub enum ServerError {
    /// Binding the listening socket failed.
    Bind(std::io::Error),
    /// The connection's byte stream broke or held garbage.
    Codec(CodecError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => write!(f, "Bind failed: {}", e),
            Self::Codec(e) => write!(f, "Connection failed: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<CodecError> for ServerError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

struct Inner {
    config: ServerConfig,
    dispatcher: Dispatcher,
    active: AtomicUsize,
    next_conn_id: AtomicU64,
}

/// A cheaply cloneable handle to one RPC server.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_registry(Arc::new(Registry::new()), config)
    }

    /// Creates a server over an existing, possibly shared, registry.
    pub fn with_registry(registry: Arc<Registry>, config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher: Dispatcher::new(registry, config.policy()),
                active: AtomicUsize::new(0),
                next_conn_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.inner.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Registers a service. Safe to call while connections are being served.
    pub fn register(&self, name: impl Into<String>, service: Service) -> Option<Arc<ServiceEntry>> {
        let name = name.into();
        info!(service = %name, methods = service.len(), "service registered");
        self.registry().register(name, service)
    }

    /// Number of connection workers currently running.
    pub fn active_connections(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Serves calls on one stream until the peer closes it.
    ///
    /// Returns `Ok(())` when the stream ends on an envelope boundary; any codec
    /// failure ends the connection and is returned.
    pub async fn serve_connection<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = ConnectionId(self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed));
        let _guard = ActiveGuard::new(&self.inner.active);
        debug!(conn = %id, "connection opened");

        let mut frames = FrameReader::with_limit(stream, self.inner.config.max_frame_bytes);
        let outcome = loop {
            let call = match frames.decode_call().await {
                Ok(Some(call)) => call,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            let reply = self.inner.dispatcher.dispatch(&call);
            if let Err(e) = encode_reply(frames.get_mut(), &reply).await {
                break Err(e);
            }
        };

        match outcome {
            Ok(()) => {
                debug!(conn = %id, "connection closed");
                Ok(())
            }
            Err(e) => {
                warn!(conn = %id, error = %e, "connection dropped");
                Err(e.into())
            }
        }
    }

    /// Binds a TCP listener for this server.
    pub async fn bind(&self, addr: impl ToSocketAddrs) -> Result<Listener> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        Ok(Listener { server: self.clone(), listener })
    }
}

/// A bound TCP socket that hands every accepted connection to a fresh worker.
pub struct Listener {
    server: Server,
    listener: TcpListener,
}

impl Listener {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(ServerError::Bind)
    }

    /// Accepts connections forever, spawning one task per connection.
    ///
    /// A failed accept is logged and skipped.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "listening");
        }

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let server = self.server.clone();
            tokio::spawn(async move {
                debug!(%peer, "accepted");
                // The worker logs its own failure.
                let _ = server.serve_connection(stream).await;
            });
        }
    }
}

/// Counts a live worker; decrements exactly once when dropped.
struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    fn new(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self { active }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
