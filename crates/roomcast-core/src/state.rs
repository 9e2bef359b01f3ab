//! Shared room state.
//!
//! The store wraps a `watch` channel. Every update runs under the channel's
//! lock, so it is atomic with respect to concurrent readers and writers, and
//! a committed change bumps the channel version. The change notifier listens
//! on that version instead of any presentation-layer event source.
//!
//! Updates that leave the value untouched are not changes and wake nobody.

use std::fmt;

use tokio::sync::watch;

use crate::error::StateError;

/// Window geometry and title shared by every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Window title. Never blank once set through the store.
    pub title: String,
}

impl RoomState {
    /// Create a state value.
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self { width, height, title: title.into() }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new(400, 200, "roomcast")
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}, title: '{}'", self.width, self.height, self.title)
    }
}

/// Process-wide holder of the current [`RoomState`].
#[derive(Debug)]
pub struct RoomStore {
    state: watch::Sender<RoomState>,
}

impl RoomStore {
    /// Create a store holding `initial`.
    pub fn new(initial: RoomState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Point-in-time copy of the current state.
    pub fn snapshot(&self) -> RoomState {
        self.state.borrow().clone()
    }

    /// Replace the title.
    ///
    /// Surrounding whitespace is trimmed. A blank name is rejected before
    /// anything is mutated. Returns the state as committed.
    pub fn rename(&self, name: &str) -> Result<RoomState, StateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StateError::BlankTitle);
        }

        Ok(self.update(|state| {
            if state.title == name {
                return false;
            }
            state.title = name.to_string();
            true
        }))
    }

    /// Replace the geometry. Returns the state as committed.
    pub fn resize(&self, width: u32, height: u32) -> RoomState {
        self.update(|state| {
            if state.width == width && state.height == height {
                return false;
            }
            state.width = width;
            state.height = height;
            true
        })
    }

    /// Receiver that observes every committed change.
    ///
    /// The current value counts as already seen.
    pub fn changes(&self) -> watch::Receiver<RoomState> {
        self.state.subscribe()
    }

    /// Apply `modify` atomically; it returns whether it changed anything.
    fn update(&self, modify: impl FnOnce(&mut RoomState) -> bool) -> RoomState {
        let mut committed = None;
        let changed = self.state.send_if_modified(|state| {
            let changed = modify(state);
            committed = Some(state.clone());
            changed
        });

        if changed {
            tracing::debug!("room state changed");
        }

        committed.unwrap_or_else(|| self.snapshot())
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new(RoomState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_updates_title() {
        let store = RoomStore::default();

        let state = store.rename("Lobby").unwrap();
        assert_eq!(state.title, "Lobby");
        assert_eq!(store.snapshot().title, "Lobby");
    }

    #[test]
    fn rename_trims_but_keeps_inner_spaces() {
        let store = RoomStore::default();

        store.rename("  Main   Hall \t").unwrap();
        assert_eq!(store.snapshot().title, "Main   Hall");
    }

    #[test]
    fn blank_rename_leaves_title_unchanged() {
        let store = RoomStore::new(RoomState::new(10, 20, "Lobby"));

        assert_eq!(store.rename(""), Err(StateError::BlankTitle));
        assert_eq!(store.rename("   "), Err(StateError::BlankTitle));
        assert_eq!(store.snapshot().title, "Lobby");
    }

    #[test]
    fn resize_updates_geometry_only() {
        let store = RoomStore::new(RoomState::new(10, 20, "Lobby"));

        let state = store.resize(800, 600);
        assert_eq!(state, RoomState::new(800, 600, "Lobby"));
    }

    #[test]
    fn committed_change_is_observed() {
        let store = RoomStore::default();
        let mut changes = store.changes();
        assert!(!changes.has_changed().unwrap());

        store.resize(1, 2);
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().width, 1);
    }

    #[test]
    fn noop_update_is_not_a_change() {
        let store = RoomStore::new(RoomState::new(10, 20, "Lobby"));
        let changes = store.changes();

        store.resize(10, 20);
        store.rename("Lobby").unwrap();
        assert!(!changes.has_changed().unwrap());
    }

    #[test]
    fn display_shows_geometry_and_title() {
        assert_eq!(RoomState::new(640, 480, "Lobby").to_string(), "640x480, title: 'Lobby'");
    }
}
