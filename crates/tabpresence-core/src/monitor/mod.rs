//! Browser monitoring: snapshot the running browsers, diff against the last
//! published state, and drive the presence publisher.

mod poller;
mod service;
mod snapshot;

pub use poller::{
    detect_change, MonitorEvent, PollLoop, PollState, StopReason, Transition,
    MAX_CONSECUTIVE_ERRORS,
};
pub use service::{Monitor, MonitorError, MonitorHandle, DEFAULT_HANDSHAKE_TIMEOUT};
pub use snapshot::{Snapshot, Snapshotter};
