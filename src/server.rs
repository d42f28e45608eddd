//! Connection listener and service loop.
//!
//! The listener binds one endpoint, either a Unix socket or a TCP port, with a
//! backlog of one. The service loop serves one session at a time against the
//! single collector registry until a client sends `exit` or a shutdown signal
//! arrives.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, UnixListener, UnixSocket};

use crate::collector::CollectorRegistry;
use crate::config::{ConfigError, ListenerConfig, parse_bind_address};
use crate::protocol::{Session, SessionEnd};

/// Pending connections allowed by `listen`.
const BACKLOG: u32 = 1;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors raised while setting up or running the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A socket path exists and is not a stale socket.
    #[error("socket path '{}': {reason}", .path.display())]
    SocketPath { path: PathBuf, reason: String },

    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Address the service listens on, as announced on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

/// Byte stream a session runs over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

#[derive(Debug)]
enum Socket {
    Unix(UnixListener),
    Tcp(TcpListener),
}

/// A bound listening socket. A Unix socket node is removed on drop.
#[derive(Debug)]
pub struct Listener {
    socket: Socket,
    endpoint: Endpoint,
}

/// Build a fresh socket path under the temp directory.
pub fn generate_socket_path(sut_name: Option<&str>) -> PathBuf {
    let sut = sut_name
        .map(|name| {
            let clean: String = name
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("{clean}-")
        })
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "stc-agent-{sut}{}.sock",
        uuid::Uuid::new_v4().simple()
    ))
}

/// Remove a stale socket file if one exists at `path`.
fn cleanup_socket(path: &Path) -> Result<(), ServiceError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(ServiceError::SocketPath {
                path: path.to_path_buf(),
                reason: format!("failed to stat: {e}"),
            });
        }
    };

    if !metadata.file_type().is_socket() {
        return Err(ServiceError::SocketPath {
            path: path.to_path_buf(),
            reason: "exists but is not a socket".to_string(),
        });
    }
    std::fs::remove_file(path).map_err(|e| ServiceError::SocketPath {
        path: path.to_path_buf(),
        reason: format!("failed to remove stale socket: {e}"),
    })?;
    tracing::debug!(path = %path.display(), "Removed stale socket file");
    Ok(())
}

impl Listener {
    /// Bind the endpoint described by `config`.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        match (&config.unix_socket, config.tcp_port) {
            (Some(path), None) => Self::bind_unix(path.clone()),
            (None, Some(port)) => {
                let ip = parse_bind_address(&config.bind)?;
                Self::bind_tcp(SocketAddr::new(ip, port))
            }
            (None, None) => Self::bind_unix(generate_socket_path(config.sut_name.as_deref())),
            (Some(_), Some(_)) => Err(ConfigError::ValidationError(
                "listener unix_socket and tcp_port are mutually exclusive".to_string(),
            )
            .into()),
        }
    }

    fn bind_unix(path: PathBuf) -> Result<Self, ServiceError> {
        cleanup_socket(&path)?;
        let bind_error = |source| ServiceError::Bind {
            endpoint: Endpoint::Unix(path.clone()).to_string(),
            source,
        };

        let socket = UnixSocket::new_stream().map_err(bind_error)?;
        socket.bind(&path).map_err(bind_error)?;
        let listener = socket.listen(BACKLOG).map_err(bind_error)?;

        Ok(Self {
            socket: Socket::Unix(listener),
            endpoint: Endpoint::Unix(path),
        })
    }

    fn bind_tcp(addr: SocketAddr) -> Result<Self, ServiceError> {
        let bind_error = |source| ServiceError::Bind {
            endpoint: Endpoint::Tcp(addr).to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(BACKLOG).map_err(bind_error)?;
        let local = listener.local_addr()?;

        Ok(Self {
            socket: Socket::Tcp(listener),
            endpoint: Endpoint::Tcp(local),
        })
    }

    /// The bound endpoint. For TCP this carries the actual port.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> io::Result<Box<dyn Transport>> {
        match &self.socket {
            Socket::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                tracing::debug!(endpoint = %self.endpoint, "Accepted connection");
                Ok(Box::new(stream))
            }
            Socket::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                tracing::debug!(endpoint = %self.endpoint, peer = %peer, "Accepted connection");
                Ok(Box::new(stream))
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Endpoint::Unix(path) = &self.endpoint {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed socket file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove socket file")
                }
            }
        }
    }
}

/// The service loop: one session at a time against one registry.
#[derive(Debug)]
pub struct Server {
    listener: Listener,
    registry: CollectorRegistry,
    sessions: u64,
}

impl Server {
    pub fn new(listener: Listener, registry: CollectorRegistry) -> Self {
        Self {
            listener,
            registry,
            sessions: 0,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.listener.endpoint()
    }

    /// Serve sessions until a client sends `exit`.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Serve sessions until a client sends `exit` or `shutdown` completes.
    ///
    /// Collectors still running when the loop ends are stopped, and the
    /// listener is closed.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(endpoint = %self.listener.endpoint(), "Service loop started");

        loop {
            let io = tokio::select! {
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(io) => io,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            self.sessions += 1;
            let session = Session::new(self.sessions, io);
            let end = tokio::select! {
                () = &mut shutdown => break,
                end = session.run(&mut self.registry) => end,
            };
            if end == SessionEnd::Exit {
                break;
            }
        }

        tracing::info!(sessions = self.sessions, "Service loop stopping");
        self.registry.shutdown().await;
    }
}
