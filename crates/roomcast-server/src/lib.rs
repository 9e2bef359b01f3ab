//! Roomcast production server.
//!
//! Production glue that wires [`roomcast_core`]'s room logic to TCP sockets
//! using the Tokio async runtime and the system clock.
//!
//! # Architecture
//!
//! One task runs the acceptor loop, one task per admitted connection runs a
//! connection handler, and one task runs the debounced change notifier. The
//! room state and the subscriber registry are the only shared structures;
//! each has its own lock.
//!
//! Every accepted socket passes the [`AdmissionController`] first. A refused
//! socket gets a single overload line and is closed without ever becoming a
//! connection handler, so a refusal never consumes a permit. Refusals in
//! flight are capped and each is bounded by a timeout; past the cap a
//! refused socket is closed without the notice.
//!
//! # Components
//!
//! - [`Server`]: acceptor loop, admission, shutdown
//! - [`TcpTransport`]: listening socket
//! - [`SystemEnv`]: production environment (tokio timers, local wall clock)
//! - [`ProcMeminfo`]: swap metrics for `/getswap`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod meminfo;
mod system_env;
mod transport;

use std::{net::SocketAddr, time::Duration};

pub use error::ServerError;
pub use meminfo::{PROC_MEMINFO, ProcMeminfo, parse_meminfo};
use roomcast_core::{
    AdmissionController, ChangeNotifier, ConnectionId, DEFAULT_QUIET_PERIOD, Environment,
    LineSink, MAX_LINE_LENGTH, MetricsSource, Room, RoomState,
};
pub use system_env::SystemEnv;
use tokio::{net::TcpStream, task::JoinSet};
use tokio_util::sync::CancellationToken;
pub use transport::TcpTransport;

use crate::connection::{ConnectionGuard, ConnectionHandler, refuse};

/// Refused sockets that may be waiting on their overload notice at once.
const MAX_PENDING_REFUSALS: usize = 64;

/// Server configuration. Fixed for the lifetime of a [`Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:5555")
    pub bind_address: String,
    /// Maximum concurrently admitted connections
    pub max_connections: usize,
    /// Quiet period before a state change is broadcast
    pub debounce: Duration,
    /// Room state at startup
    pub initial_state: RoomState,
    /// Broadcast lines a connection may have queued before deliveries to it
    /// are dropped
    pub outbound_queue: usize,
    /// Longest accepted command line in bytes; longer lines close the
    /// connection
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5555".to_string(),
            max_connections: 5,
            debounce: DEFAULT_QUIET_PERIOD,
            initial_state: RoomState::default(),
            outbound_queue: 64,
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ServerError> {
        if self.max_connections == 0 {
            return Err(ServerError::Config("max connections must be positive".to_string()));
        }
        if self.initial_state.title.trim().is_empty() {
            return Err(ServerError::Config("initial title must not be empty".to_string()));
        }
        if self.outbound_queue == 0 {
            return Err(ServerError::Config("outbound queue must hold at least one line".into()));
        }
        if self.max_line_length == 0 {
            return Err(ServerError::Config("max line length must be positive".to_string()));
        }
        Ok(())
    }
}

/// Production roomcast server.
pub struct Server<E: Environment = SystemEnv> {
    /// Listening socket
    transport: TcpTransport,
    /// Shared room (state store, subscriber registry, metrics)
    room: Room,
    /// Connection slots
    admission: AdmissionController,
    /// Environment (sleeping, wall clock)
    env: E,
    /// Server configuration
    config: ServerConfig,
    /// Cancelled to stop the server
    shutdown: CancellationToken,
}

impl Server<SystemEnv> {
    /// Bind a server using the system clock and `/proc/meminfo` swap metrics.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with(config, SystemEnv::new(), ProcMeminfo::new()).await
    }
}

impl<E: Environment> Server<E> {
    /// Bind a server with a custom environment and metric source.
    pub async fn bind_with(
        config: ServerConfig,
        env: E,
        metrics: impl MetricsSource,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let transport = TcpTransport::bind(&config.bind_address).await?;
        let room = Room::new(config.initial_state.clone(), metrics);
        let admission = AdmissionController::new(config.max_connections);

        Ok(Self { transport, room, admission, env, config, shutdown: CancellationToken::new() })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handle on the admission controller (shares its permits).
    pub fn admission(&self) -> AdmissionController {
        self.admission.clone()
    }

    /// Handle on the shared room.
    pub fn room(&self) -> Room {
        self.room.clone()
    }

    /// Run the acceptor loop until the shutdown token is cancelled.
    ///
    /// On shutdown the listener is closed first, then every connection
    /// handler is signalled and awaited so each one runs its cleanup.
    /// Handlers abandon blocked writes when signalled, so a peer that stops
    /// reading cannot stall shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self { transport, room, admission, env, config, shutdown } = self;

        tracing::info!(
            max_connections = admission.capacity(),
            "Server listening on {}",
            transport.local_addr()?
        );

        let notifier_cancel = CancellationToken::new();
        let notifier = ChangeNotifier::new(env.clone(), &room, config.debounce);
        let notifier_task = tokio::spawn(notifier.run(notifier_cancel.clone()));

        let acceptor = Acceptor {
            room,
            admission,
            env,
            outbound_queue: config.outbound_queue,
            max_line_length: config.max_line_length,
            shutdown: shutdown.clone(),
        };
        let mut handlers = JoinSet::new();
        let mut refusals = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    log_join_error(joined);
                },
                Some(joined) = refusals.join_next(), if !refusals.is_empty() => {
                    log_join_error(joined);
                },
                accepted = transport.accept() => match accepted {
                    Ok((stream, peer)) => match acceptor.admit(stream, peer) {
                        Admission::Admitted(handler) => {
                            handlers.spawn(handler.run());
                        },
                        Admission::Refused(stream) => {
                            if refusals.len() < MAX_PENDING_REFUSALS {
                                refusals.spawn(refuse(stream, acceptor.env.clone()));
                            } else {
                                tracing::debug!(%peer, "too many pending refusals, closing");
                            }
                        },
                    },
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    },
                },
            }
        }

        drop(transport);
        tracing::info!(active = handlers.len(), "Server stopping");

        while let Some(joined) = handlers.join_next().await {
            log_join_error(joined);
        }
        while let Some(joined) = refusals.join_next().await {
            log_join_error(joined);
        }

        notifier_cancel.cancel();
        if let Err(e) = notifier_task.await {
            tracing::error!("Notifier task failed: {}", e);
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!("Connection task failed: {}", e);
    }
}

/// Outcome of routing an accepted socket through admission.
enum Admission<E: Environment> {
    /// Holds a permit; spawn the handler
    Admitted(ConnectionHandler<E>),
    /// No permit; send the overload notice and close
    Refused(TcpStream),
}

/// Per-socket admission state shared by the acceptor loop.
struct Acceptor<E: Environment> {
    room: Room,
    admission: AdmissionController,
    env: E,
    outbound_queue: usize,
    max_line_length: usize,
    shutdown: CancellationToken,
}

impl<E: Environment> Acceptor<E> {
    /// Route one accepted socket through admission.
    fn admit(&self, stream: TcpStream, peer: SocketAddr) -> Admission<E> {
        let permit = match self.admission.try_acquire() {
            Ok(permit) => permit,
            Err(refused) => {
                tracing::info!(%peer, "{}", refused);
                return Admission::Refused(stream);
            },
        };

        let id = ConnectionId::from(peer);
        tracing::info!(connection = %id, active = self.admission.active(), "Client connected");

        let (sink, outbound) = LineSink::channel(self.outbound_queue);
        let guard = ConnectionGuard::new(self.room.session(id, sink), permit);

        Admission::Admitted(ConnectionHandler::new(
            stream,
            outbound,
            guard,
            self.env.clone(),
            self.shutdown.child_token(),
            self.max_line_length,
        ))
    }
}
