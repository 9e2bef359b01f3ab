//! Production Environment implementation using the system clocks.
//!
//! `SystemEnv` is the production implementation of the Environment trait. It
//! reads the real monotonic clock, sleeps on the tokio timer, and stamps
//! lines with the host's local time.
//!
//! # Capabilities
//!
//! - Monotonic system time (`std::time::Instant`) for measuring elapsed time
//! - Local wall-clock time (`chrono::Local`) for line timestamps
//! - Tokio async sleep for actual wall-clock delays
//!
//! Production behavior is therefore wall-clock dependent. Tests that need
//! fixed timestamps or a paused clock supply their own [`Environment`].

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use roomcast_core::Environment;

/// Production environment using system time.
///
/// Uses `std::time::Instant::now()` for elapsed-time measurement,
/// `tokio::time::sleep()` for the notifier's quiet period, and the host's
/// local time zone for the timestamp prefixed to every line. A change of the
/// host's time zone or wall clock shows up in timestamps but never in the
/// debounce timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn local_time(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
