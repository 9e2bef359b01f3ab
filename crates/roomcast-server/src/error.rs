//! Server error types.

use std::io;

use thiserror::Error;

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Listening socket could not be created (port in use, bad address,
    /// permission denied).
    ///
    /// Fatal: the server never starts. Not retried.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address the server tried to bind
        address: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Configuration error (invalid option values).
    ///
    /// Fatal: fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (I/O failure on an established socket).
    ///
    /// Scoped to one connection or one accept call; the server keeps
    /// serving everyone else.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::Bind {
            address: "0.0.0.0:5555".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:5555: address in use");

        let err = ServerError::Config("max connections must be positive".to_string());
        assert_eq!(err.to_string(), "configuration error: max connections must be positive");

        let err = ServerError::from(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        assert_eq!(err.to_string(), "transport error: broken pipe");
    }

    #[test]
    fn bind_error_exposes_source() {
        let err = ServerError::Bind {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
