//! Per-connection command dispatch.
//!
//! [`Room`] bundles the process-wide shared structures. A [`Session`] gives
//! one connection access to them (never ownership) plus its own outbound
//! sink, and maps each command line to exactly one [`Reply`].

use std::sync::Arc;

use crate::{
    metrics::MetricsSource,
    protocol::{Command, Reply, parse_dimensions},
    registry::{ConnectionId, LineSink, SubscriberRegistry},
    state::{RoomState, RoomStore},
};

/// Shared room: state store, subscriber registry, and host metric source.
///
/// Cheap to clone; clones share the same underlying structures.
#[derive(Clone)]
pub struct Room {
    store: Arc<RoomStore>,
    registry: Arc<SubscriberRegistry>,
    metrics: Arc<dyn MetricsSource>,
}

impl Room {
    /// Create a room holding `initial`, reporting metrics from `metrics`.
    pub fn new(initial: RoomState, metrics: impl MetricsSource) -> Self {
        Self {
            store: Arc::new(RoomStore::new(initial)),
            registry: Arc::new(SubscriberRegistry::new()),
            metrics: Arc::new(metrics),
        }
    }

    /// The room state store.
    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    /// The subscriber registry.
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Shared handle to the subscriber registry.
    pub fn registry_handle(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.registry)
    }

    /// Open a session for a newly admitted connection.
    pub fn session(&self, id: ConnectionId, sink: LineSink) -> Session {
        Session { id, sink, room: self.clone() }
    }
}

/// Runtime context for one connection's commands.
pub struct Session {
    id: ConnectionId,
    sink: LineSink,
    room: Room,
}

impl Session {
    /// Connection this session belongs to.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Whether this connection is currently subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.room.registry.is_subscribed(&self.id)
    }

    /// Execute one command line and produce its reply.
    ///
    /// The exit verb never reaches here; see [`crate::protocol::is_exit`].
    pub fn dispatch(&self, line: &str) -> Reply {
        match Command::parse(line) {
            Command::Invalid => Reply::Invalid,
            Command::Subscribe => {
                if self.room.registry.subscribe(self.id.clone(), self.sink.clone()) {
                    tracing::info!(connection = %self.id, "subscribed");
                }
                Reply::Subscribed
            },
            Command::Unsubscribe => {
                if self.room.registry.unsubscribe(&self.id) {
                    tracing::info!(connection = %self.id, "unsubscribed");
                }
                Reply::Unsubscribed
            },
            Command::GetWindow => Reply::Window(self.room.store.snapshot()),
            Command::Rename(name) => match self.room.store.rename(name) {
                Ok(state) => Reply::Renamed(state.title),
                Err(_) => Reply::BlankName,
            },
            Command::Resize(args) => match parse_dimensions(args) {
                Some((width, height)) => {
                    self.room.store.resize(width, height);
                    Reply::Resized { width, height }
                },
                None => Reply::ResizeUsage,
            },
            Command::GetSwap => match self.room.metrics.swap_report() {
                Ok(report) => Reply::Swap(report),
                Err(e) => {
                    tracing::warn!(connection = %self.id, "swap report failed: {}", e);
                    Reply::SwapUnavailable
                },
            },
            Command::Help => Reply::Help,
            Command::Unknown(verb) => Reply::Unknown(verb),
        }
    }

    /// Drop this connection's subscription, if any.
    ///
    /// Safe to call after an explicit `/unsubscribe`; returns whether an
    /// entry was removed.
    pub fn leave(&self) -> bool {
        self.room.registry.unsubscribe(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;

    fn room() -> Room {
        Room::new(RoomState::new(400, 200, "roomcast"), || {
            Ok::<_, MetricsError>("SwapTotal: 1.00 GB, SwapFree: 1.00 GB".to_string())
        })
    }

    fn session(room: &Room, port: u16) -> (Session, tokio::sync::mpsc::Receiver<String>) {
        let (sink, rx) = LineSink::channel(8);
        (room.session(ConnectionId::new(format!("127.0.0.1:{port}")), sink), rx)
    }

    #[test]
    fn non_command_is_invalid_without_side_effects() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("hello"), Reply::Invalid);
        assert!(room.registry().is_empty());
        assert_eq!(room.store().snapshot(), RoomState::new(400, 200, "roomcast"));
    }

    #[test]
    fn subscribe_is_idempotent() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("/subscribe"), Reply::Subscribed);
        assert_eq!(session.dispatch("/SUBSCRIBE"), Reply::Subscribed);
        assert_eq!(room.registry().len(), 1);
        assert!(session.is_subscribed());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("/unsubscribe"), Reply::Unsubscribed);
        session.dispatch("/subscribe");
        assert_eq!(session.dispatch("/unsubscribe"), Reply::Unsubscribed);
        assert_eq!(session.dispatch("/unsubscribe"), Reply::Unsubscribed);
        assert!(room.registry().is_empty());
    }

    #[test]
    fn rename_then_getwindow_reflects_title() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("/rename Lobby"), Reply::Renamed("Lobby".into()));
        assert_eq!(
            session.dispatch("/getwindow"),
            Reply::Window(RoomState::new(400, 200, "Lobby"))
        );
    }

    #[test]
    fn blank_rename_is_rejected() {
        let room = room();
        let (session, _rx) = session(&room, 1);
        session.dispatch("/rename Lobby");

        assert_eq!(session.dispatch("/rename"), Reply::BlankName);
        assert_eq!(session.dispatch("/rename    "), Reply::BlankName);
        assert_eq!(room.store().snapshot().title, "Lobby");
    }

    #[test]
    fn resize_validates_arguments() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("/resize 800 600"), Reply::Resized { width: 800, height: 600 });
        assert_eq!(session.dispatch("/resize 800"), Reply::ResizeUsage);
        assert_eq!(session.dispatch("/resize -5 600"), Reply::ResizeUsage);

        let state = room.store().snapshot();
        assert_eq!((state.width, state.height), (800, 600));
    }

    #[test]
    fn getswap_delegates_to_source() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(
            session.dispatch("/getswap"),
            Reply::Swap("SwapTotal: 1.00 GB, SwapFree: 1.00 GB".into())
        );
    }

    #[test]
    fn getswap_failure_is_a_reply() {
        let room = Room::new(RoomState::default(), || {
            Err::<String, _>(MetricsError::Unavailable("unsupported platform".into()))
        });
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("/getswap"), Reply::SwapUnavailable);
    }

    #[test]
    fn unknown_verb_is_named() {
        let room = room();
        let (session, _rx) = session(&room, 1);

        assert_eq!(session.dispatch("/frobnicate"), Reply::Unknown("/frobnicate".into()));
        assert_eq!(session.dispatch("/exit now"), Reply::Unknown("/exit".into()));
    }

    #[test]
    fn sessions_share_the_room() {
        let room = room();
        let (alice, _a) = session(&room, 1);
        let (bob, _b) = session(&room, 2);

        alice.dispatch("/rename Lobby");
        bob.dispatch("/subscribe");

        assert_eq!(bob.dispatch("/getwindow"), Reply::Window(RoomState::new(400, 200, "Lobby")));
        assert!(!alice.is_subscribed());
        assert!(bob.leave());
        assert!(!bob.leave());
    }
}
