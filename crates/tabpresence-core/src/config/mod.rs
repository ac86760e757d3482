mod settings;

pub use settings::{
    Command, Config, CustomBrowser, PresenceSettings, PublisherKind, Settings,
    MIN_POLL_INTERVAL_SECS,
};
