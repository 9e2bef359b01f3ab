//! Admission control.
//!
//! A counting gate over a fixed number of permits. Acquisition never waits:
//! either a permit is free right now, or the caller is refused. A permit is
//! returned to the pool when it is dropped, so it cannot be released twice
//! and cannot leak past the connection that holds it.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AdmissionRefused;

/// Bounded gate limiting concurrently active connections.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionController {
    /// Create a controller with `capacity` permits.
    ///
    /// Capacity above [`Semaphore::MAX_PERMITS`] is clamped.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self { permits: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Take a permit if one is free. Never blocks.
    pub fn try_acquire(&self) -> Result<AdmissionPermit, AdmissionRefused> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .map(|permit| AdmissionPermit { _permit: permit })
            .map_err(|_| AdmissionRefused { capacity: self.capacity })
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Permits currently held.
    pub fn active(&self) -> usize {
        self.capacity - self.available()
    }
}

/// One occupied admission slot.
///
/// Held for the whole lifetime of a connection; dropping it frees the slot.
#[derive(Debug)]
#[must_use = "dropping the permit frees the slot immediately"]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    /// Return the slot to the pool. Same as dropping the permit.
    pub fn release(self) {
        drop(self);
    }
}
