//! Roomcast core logic.
//!
//! Runtime-agnostic building blocks of the roomcast line server: the shared
//! room state, the subscriber registry, the debounced change notifier, the
//! admission controller, and command dispatch. Nothing here owns a socket;
//! `roomcast-server` wires these pieces to TCP.
//!
//! # Components
//!
//! - [`RoomStore`]: atomic read/update of the shared [`RoomState`]
//! - [`SubscriberRegistry`]: connection ID → outbound sink, best-effort publish
//! - [`ChangeNotifier`]: coalesces state changes into one broadcast per quiet
//!   period
//! - [`AdmissionController`]: non-blocking bounded gate over connection slots
//! - [`Session`]: per-connection access to the [`Room`], maps lines to replies
//! - [`Environment`]: wall clock and sleeping, swappable in tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admission;
pub mod env;
pub mod error;
pub mod metrics;
pub mod notifier;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod state;

pub use admission::{AdmissionController, AdmissionPermit};
pub use env::Environment;
pub use error::{AdmissionRefused, MetricsError, SinkError, StateError};
pub use metrics::{MetricsSource, SwapUsage, format_bytes};
pub use notifier::{ChangeNotifier, DEFAULT_QUIET_PERIOD};
pub use protocol::{Command, MAX_LINE_LENGTH, Notice, Reply, is_exit};
pub use registry::{ConnectionId, LineSink, PublishReport, SubscriberRegistry};
pub use session::{Room, Session};
pub use state::{RoomState, RoomStore};
