use tracing::info;

use super::{Presence, PresenceError, PresencePublisher};
use crate::browsers::BrowserState;

/// Publisher that only writes presence transitions to the log
#[derive(Debug, Default)]
pub struct LogPublisher {
    connected: bool,
    published: Option<Presence>,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last payload published and not yet cleared
    pub fn current(&self) -> Option<&Presence> {
        self.published.as_ref()
    }
}

impl PresencePublisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    fn initialize(&mut self) -> Result<(), PresenceError> {
        self.connected = true;
        info!("Presence log publisher ready");
        Ok(())
    }

    fn publish(&mut self, state: &BrowserState) -> Result<(), PresenceError> {
        if !self.connected {
            return Err(PresenceError::NotConnected);
        }
        let presence = Presence::from_state(state);
        info!(
            details = %presence.details,
            state = %presence.state,
            image = %presence.large_image,
            "Presence updated"
        );
        self.published = Some(presence);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PresenceError> {
        if self.connected && self.published.take().is_some() {
            info!("Cleared presence");
        }
        Ok(())
    }

    fn dispose(&mut self) {
        let _ = self.clear();
        self.connected = false;
    }
}
