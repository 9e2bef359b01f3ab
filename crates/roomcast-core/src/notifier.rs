//! Debounced change notifier.
//!
//! Coalesces bursts of room state changes into a single broadcast. Each
//! committed change (re)starts a quiet-period timer; only when the timer
//! runs out without a newer change does the notifier publish, and it
//! publishes the state as of expiry rather than any intermediate value.
//!
//! Superseded changes are never published separately, so the broadcast rate
//! is bounded by one per quiet period however fast the state changes.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    env::Environment,
    protocol::Notice,
    registry::{PublishReport, SubscriberRegistry},
    session::Room,
    state::RoomState,
};

/// Default quiet period between the last change and its broadcast.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Task that turns room state changes into subscriber broadcasts.
pub struct ChangeNotifier<E: Environment> {
    env: E,
    changes: watch::Receiver<RoomState>,
    registry: Arc<SubscriberRegistry>,
    quiet_period: Duration,
}

impl<E: Environment> ChangeNotifier<E> {
    /// Create a notifier for `room`.
    ///
    /// Changes committed before this call are not broadcast.
    pub fn new(env: E, room: &Room, quiet_period: Duration) -> Self {
        Self {
            env,
            changes: room.store().changes(),
            registry: room.registry_handle(),
            quiet_period,
        }
    }

    /// Run until `cancel` fires or the store is dropped.
    ///
    /// A change still settling when `cancel` fires is discarded.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                changed = self.changes.changed() => {
                    if changed.is_err() {
                        return;
                    }
                },
            }

            let first_change = self.env.now();
            if !self.settle(&cancel).await {
                return;
            }

            let report = self.broadcast();
            tracing::debug!(
                delivered = report.delivered,
                failed = report.failed,
                settled_after = ?(self.env.now() - first_change),
                "broadcast room state"
            );
        }
    }

    /// Wait out a full quiet period with no further change.
    ///
    /// Returns `false` if cancelled first.
    async fn settle(&mut self, cancel: &CancellationToken) -> bool {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return false,
                changed = self.changes.changed() => {
                    if changed.is_err() {
                        // Store is gone; flush what we have.
                        return true;
                    }
                },
                () = self.env.sleep(self.quiet_period) => return true,
            }
        }
    }

    fn broadcast(&mut self) -> PublishReport {
        let state = self.changes.borrow_and_update().clone();
        let line = self.env.stamp(Notice::StateChanged(state));
        self.registry.publish(&line)
    }
}
