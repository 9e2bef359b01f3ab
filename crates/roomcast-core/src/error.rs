//! Error types for the roomcast core.
//!
//! None of these are fatal. Each one maps to a one-line reply, a logged
//! delivery failure, or a refused connection.

use thiserror::Error;

/// Rejected room state updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Rename with an empty or whitespace-only name
    #[error("title must not be empty")]
    BlankTitle,
}

/// Admission controller has no free permit.
///
/// Expected outcome under load, not a fault. The caller tells the client to
/// retry later and closes the connection.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("admission refused: all {capacity} connection slots are in use")]
pub struct AdmissionRefused {
    /// Configured capacity at the time of refusal
    pub capacity: usize,
}

/// Failure to queue a line on a connection's outbound sink.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// Connection handler is gone (disconnect in progress or finished)
    #[error("outbound sink closed")]
    Closed,

    /// Connection is not draining its queue fast enough
    #[error("outbound sink full")]
    Full,
}

/// Host metric source could not produce a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    /// Metric is not available on this platform or could not be read
    #[error("metrics unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(StateError::BlankTitle.to_string(), "title must not be empty");

        let err = AdmissionRefused { capacity: 5 };
        assert_eq!(err.to_string(), "admission refused: all 5 connection slots are in use");

        assert_eq!(SinkError::Full.to_string(), "outbound sink full");

        let err = MetricsError::Unavailable("no /proc".to_string());
        assert_eq!(err.to_string(), "metrics unavailable: no /proc");
    }
}
