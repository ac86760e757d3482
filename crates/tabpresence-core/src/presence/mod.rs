//! Presence publishing.
//!
//! The monitor talks to the remote presence channel only through the
//! [`PresencePublisher`] trait. How the channel frames its messages is up to
//! each implementation; this module ships a log-only publisher and a
//! state-file publisher that an external bridge can forward.

mod logging;
mod state_file;

pub use logging::LogPublisher;
pub use state_file::{default_state_path, FilePublisher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browsers::{BrowserState, NEW_TAB_TITLE};

/// Longest `details` string presence consumers accept
const MAX_DETAILS_CHARS: usize = 128;

/// Error type for presence publisher operations
#[derive(Debug, Error)]
pub enum PresenceError {
    /// The handshake with the presence service failed
    #[error("presence service unavailable: {0}")]
    Unavailable(String),

    /// publish/clear called before a successful handshake
    #[error("presence publisher is not connected")]
    NotConnected,

    #[error("presence I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode presence: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Consumer of browser state that drives the remote presence channel
///
/// `initialize` is the handshake; the monitor bounds it with a timeout and
/// refuses to start when it fails. `publish` and `clear` report transient
/// channel errors as `Err` so the monitor can count them.
pub trait PresencePublisher: Send {
    /// Short name used in log and status messages
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<(), PresenceError>;

    fn publish(&mut self, state: &BrowserState) -> Result<(), PresenceError>;

    fn clear(&mut self) -> Result<(), PresenceError>;

    /// Release the session; must be safe to call more than once
    fn dispose(&mut self);
}

/// Structured status payload shown to remote viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Tab title, shortened for display
    pub details: String,
    /// "Browsing with ..." / "Browsing privately (...)"
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl Presence {
    /// Build the payload for a browser state
    pub fn from_state(state: &BrowserState) -> Self {
        let private = state.window_type.is_private_mode();

        Self {
            details: details_text(&state.tab_title),
            state: status_text(state),
            large_image: state.icon_key.to_lowercase(),
            large_text: state.browser_name.clone(),
            small_image: private.then(|| "incognito".to_string()),
            small_text: private.then(|| "Private Browsing".to_string()),
            started_at: Utc::now(),
        }
    }
}

fn status_text(state: &BrowserState) -> String {
    if state.window_type.is_private_mode() {
        format!("Browsing privately ({})", state.browser_name)
    } else {
        format!("Browsing with {}", state.browser_name)
    }
}

fn details_text(tab_title: &str) -> String {
    if tab_title.is_empty() || tab_title == NEW_TAB_TITLE {
        return NEW_TAB_TITLE.to_string();
    }
    if tab_title.chars().count() > MAX_DETAILS_CHARS {
        let head: String = tab_title.chars().take(MAX_DETAILS_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        tab_title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browsers::WindowType;

    fn state(title: &str, window_type: WindowType) -> BrowserState {
        BrowserState {
            browser_name: "Mozilla Firefox".to_string(),
            tab_title: title.to_string(),
            url: String::new(),
            icon_key: "Firefox".to_string(),
            is_incognito: window_type == WindowType::Incognito,
            is_private: window_type == WindowType::Private,
            window_type,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_normal_presence() {
        let presence = Presence::from_state(&state("MDN Web Docs", WindowType::Normal));
        assert_eq!(presence.details, "MDN Web Docs");
        assert_eq!(presence.state, "Browsing with Mozilla Firefox");
        assert_eq!(presence.large_image, "firefox");
        assert_eq!(presence.large_text, "Mozilla Firefox");
        assert_eq!(presence.small_image, None);
        assert_eq!(presence.small_text, None);
    }

    #[test]
    fn test_private_presence() {
        let presence = Presence::from_state(&state("Search", WindowType::Private));
        assert_eq!(presence.state, "Browsing privately (Mozilla Firefox)");
        assert_eq!(presence.small_image.as_deref(), Some("incognito"));
        assert_eq!(presence.small_text.as_deref(), Some("Private Browsing"));
    }

    #[test]
    fn test_long_details_are_truncated_on_char_boundary() {
        let title = "ü".repeat(200);
        let presence = Presence::from_state(&state(&title, WindowType::Normal));
        assert_eq!(presence.details.chars().count(), 128);
        assert!(presence.details.ends_with("..."));
    }

    #[test]
    fn test_exactly_max_details_is_kept() {
        let title = "a".repeat(128);
        let presence = Presence::from_state(&state(&title, WindowType::Normal));
        assert_eq!(presence.details, title);
    }

    #[test]
    fn test_empty_title_shows_new_tab() {
        let presence = Presence::from_state(&state("", WindowType::Normal));
        assert_eq!(presence.details, "New Tab");
    }
}
