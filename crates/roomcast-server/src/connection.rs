//! Connection handler.
//!
//! Owns one admitted connection from greeting to close. The handler is the
//! only writer on its socket: command replies are written inline, and
//! broadcast lines queued on the session's sink are drained between
//! commands. Each command line is fully answered before the next one is
//! read, so a client sees its replies in order.
//!
//! Input is framed by [`LinesCodec`] with a maximum line length. A line
//! that is too long, or is not valid UTF-8, ends only the connection that
//! sent it.
//!
//! Cleanup (registry removal, permit release) lives in [`ConnectionGuard`]'s
//! `Drop`, so it runs exactly once however the handler ends: client exit,
//! end-of-stream, I/O error, oversized line, server shutdown, or task abort.

use std::{fmt::Display, io, time::Duration};

use futures::StreamExt;
use roomcast_core::{AdmissionPermit, ConnectionId, Environment, Notice, Session, is_exit};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    sync::CancellationToken,
};

/// How long a refused connection gets to take its overload notice.
pub(crate) const REFUSAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a connection's read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// Client sent the exit command
    Exit,
    /// Client closed its side of the socket
    PeerClosed,
    /// Server is shutting down
    Shutdown,
}

/// Resources held for the lifetime of one admitted connection.
///
/// Dropping the guard unsubscribes the connection and frees its admission
/// slot, in that order.
pub(crate) struct ConnectionGuard {
    session: Session,
    _permit: AdmissionPermit,
}

impl ConnectionGuard {
    pub(crate) fn new(session: Session, permit: AdmissionPermit) -> Self {
        Self { session, _permit: permit }
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let was_subscribed = self.session.leave();
        tracing::info!(connection = %self.session.id(), was_subscribed, "client disconnected");
    }
}

/// Handler for one admitted TCP connection.
pub(crate) struct ConnectionHandler<E: Environment> {
    stream: TcpStream,
    outbound: mpsc::Receiver<String>,
    guard: ConnectionGuard,
    env: E,
    cancel: CancellationToken,
    max_line_length: usize,
}

impl<E: Environment> ConnectionHandler<E> {
    pub(crate) fn new(
        stream: TcpStream,
        outbound: mpsc::Receiver<String>,
        guard: ConnectionGuard,
        env: E,
        cancel: CancellationToken,
        max_line_length: usize,
    ) -> Self {
        Self { stream, outbound, guard, env, cancel, max_line_length }
    }

    /// Serve the connection until it ends, then clean up.
    ///
    /// Cancellation wins over everything else, including a write blocked on
    /// a peer that stopped reading.
    pub(crate) async fn run(self) {
        let Self { stream, mut outbound, guard, env, cancel, max_line_length } = self;
        let id = guard.session().id().clone();
        let connected_at = env.now();
        let (reader, mut writer) = stream.into_split();
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length));

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(SessionEnd::Shutdown),
            result = serve(&mut lines, &mut writer, &mut outbound, guard.session(), &env) => result,
        };

        let duration = env.now() - connected_at;
        match result {
            Ok(end) => tracing::debug!(connection = %id, ?end, ?duration, "session ended"),
            Err(LinesCodecError::MaxLineLengthExceeded) => tracing::warn!(
                connection = %id,
                max_line_length,
                "line too long, closing connection"
            ),
            Err(LinesCodecError::Io(e)) => log_io_error(&id, &e),
        }

        // Free the slot before the peer can observe EOF.
        drop(guard);
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(connection = %id, "shutdown failed: {}", e);
        }
    }
}

/// Greet, then answer commands and relay broadcasts until the session ends.
async fn serve<R, W, E>(
    lines: &mut FramedRead<R, LinesCodec>,
    writer: &mut W,
    outbound: &mut mpsc::Receiver<String>,
    session: &Session,
    env: &E,
) -> Result<SessionEnd, LinesCodecError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    E: Environment,
{
    write_line(writer, env, Notice::Greeting).await?;

    loop {
        tokio::select! {
            biased;
            line = lines.next() => {
                let Some(line) = line.transpose()? else {
                    return Ok(SessionEnd::PeerClosed);
                };
                let command = line.trim();
                tracing::debug!(connection = %session.id(), command, "received");

                if is_exit(command) {
                    write_line(writer, env, Notice::Farewell).await?;
                    return Ok(SessionEnd::Exit);
                }

                let reply = session.dispatch(command);
                write_line(writer, env, reply).await?;
            },
            Some(broadcast) = outbound.recv() => {
                write_raw(writer, &broadcast).await?;
            },
        }
    }
}

/// Send the overload notice on an unadmitted connection and close it.
///
/// Gives up after [`REFUSAL_TIMEOUT`], so a refused peer that never reads
/// cannot hold the task (or server shutdown) open.
pub(crate) async fn refuse<E: Environment>(mut stream: TcpStream, env: E) {
    let notice = async {
        write_line(&mut stream, &env, Notice::Overloaded).await?;
        stream.shutdown().await
    };

    match tokio::time::timeout(REFUSAL_TIMEOUT, notice).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::debug!("overload notice not delivered: {}", e),
        Err(_) => tracing::debug!("overload notice timed out"),
    }
}

async fn write_line<W, E>(writer: &mut W, env: &E, line: impl Display) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    E: Environment,
{
    write_raw(writer, &env.stamp(line)).await
}

async fn write_raw<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    writer.write_all(buf.as_bytes()).await
}

fn log_io_error(id: &ConnectionId, err: &io::Error) {
    match err.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => {
            tracing::debug!(connection = %id, "connection dropped: {}", err);
        },
        _ => tracing::warn!(connection = %id, "connection error: {}", err),
    }
}
