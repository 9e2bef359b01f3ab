//! Environment abstraction for deterministic testing.
//!
//! Decouples room logic from system resources (monotonic clock, wall clock,
//! sleeping). Enables
//! deterministic tests on tokio's paused clock with a pinned wall clock, and
//! production use with real system time.

use std::{fmt::Display, time::Duration};

use chrono::NaiveDateTime;

/// Format of the timestamp prefixed to every line the server writes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Abstract environment providing wall-clock time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `sleep()` must complete no earlier than `duration` after it is first
///   polled
/// - Methods are infallible
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type of this environment.
    ///
    /// Production uses `std::time::Instant`; tests on tokio's paused clock use
    /// `tokio::time::Instant`.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// Used to measure elapsed durations (settling time, session length),
    /// never for display.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code (notifier, handlers) sleeps. Command dispatch never
    /// does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Current local date and time, used for line timestamps.
    fn local_time(&self) -> NaiveDateTime;

    /// Current local time formatted with [`TIMESTAMP_FORMAT`].
    fn timestamp(&self) -> String {
        self.local_time().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Prefix `line` with the current timestamp.
    fn stamp(&self, line: impl Display) -> String {
        format!("{} {line}", self.timestamp())
    }
}
