//! TCP transport.
//!
//! Production transport for the roomcast line protocol: a plain tokio
//! [`TcpListener`] handing out one [`TcpStream`] per client. Framing (one
//! UTF-8 line per message, bounded length) is applied by the connection
//! handler, not here.
//!
//! # Capabilities
//!
//! - IPv4 and IPv6 listening on any `host:port` the OS accepts
//! - Ephemeral ports (`:0`) with the chosen port reported by `local_addr()`
//! - Peer addresses, used as connection identities
//!
//! # Errors
//!
//! Bind failures are reported as [`ServerError::Bind`] so the caller can
//! treat them as fatal startup errors. Accept failures (e.g. file descriptor
//! exhaustion) are plain transport errors that the acceptor logs and
//! survives.
//!
//! The protocol has no encryption or authentication. Expose it only on
//! trusted networks.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// Listening TCP socket.
///
/// Owns the listener for the lifetime of the server. Dropping the transport
/// closes the listening socket, so connection attempts made after shutdown
/// are refused by the OS instead of queueing in the backlog.
pub struct TcpTransport {
    /// Tokio listener
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind a listener on `address` (`host:port`).
    ///
    /// Resolves `address` and binds the first address that succeeds. An
    /// unresolvable address or a port already in use is a
    /// [`ServerError::Bind`].
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address: address.to_string(), source })?;

        tracing::info!("TCP transport bound to {}", address);

        Ok(Self { listener })
    }

    /// Accept the next connection.
    ///
    /// This method blocks until a connection is available.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        Ok(self.listener.accept().await?)
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}
