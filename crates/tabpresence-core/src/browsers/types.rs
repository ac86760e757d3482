use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a window title is nothing but browser chrome
pub const NEW_TAB_TITLE: &str = "New Tab";

/// Title-matching rule for one browser brand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserRule {
    /// Canonical display name (e.g. "Google Chrome")
    pub name: String,
    /// Lower-cased substrings matched against live process names
    pub process_names: Vec<String>,
    /// Suffixes the browser appends to normal window titles
    #[serde(default)]
    pub normal_suffixes: Vec<String>,
    /// Markers present in incognito window titles
    #[serde(default)]
    pub incognito_markers: Vec<String>,
    /// Markers present in private window titles
    #[serde(default)]
    pub private_markers: Vec<String>,
    /// Icon key used by presence consumers
    #[serde(default = "default_icon_key")]
    pub icon_key: String,
    /// Chromium-family title conventions (descriptive only)
    #[serde(default)]
    pub chromium: bool,
}

fn default_icon_key() -> String {
    "browser".to_string()
}

impl BrowserRule {
    /// Check whether a process name belongs to this browser
    ///
    /// Matching is a case-insensitive substring test, so "chrome" also
    /// claims "chrome_crashpad" style helper names.
    pub fn matches_process(&self, process_name: &str) -> bool {
        let lower = process_name.to_lowercase();
        self.process_names
            .iter()
            .any(|token| lower.contains(token.as_str()))
    }
}

/// Kind of browsing session a window belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Normal,
    Incognito,
    Private,
}

impl WindowType {
    /// Whether the window does not persist history
    pub fn is_private_mode(&self) -> bool {
        !matches!(self, WindowType::Normal)
    }

    /// Bracketed label used by the diagnostic sweep
    pub fn label(&self) -> &'static str {
        match self {
            WindowType::Normal => "[Normal]",
            WindowType::Incognito => "[Incognito]",
            WindowType::Private => "[Private]",
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowType::Normal => write!(f, "normal"),
            WindowType::Incognito => write!(f, "incognito"),
            WindowType::Private => write!(f, "private"),
        }
    }
}

/// Browsing context extracted from one browser window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserState {
    /// Display name copied from the matching rule
    pub browser_name: String,
    /// Window title with browser suffixes and privacy markers removed
    pub tab_title: String,
    /// URL found in the raw title, empty if none
    pub url: String,
    pub icon_key: String,
    pub is_incognito: bool,
    pub is_private: bool,
    pub window_type: WindowType,
    /// When this window was classified
    pub captured_at: DateTime<Utc>,
}

/// The fields that decide whether presence must be republished
///
/// URL and capture time are left out: two samples of the same
/// tab compare equal even if the heuristic URL or the clock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityKey<'a> {
    pub browser_name: &'a str,
    pub tab_title: &'a str,
    pub is_incognito: bool,
}

impl BrowserState {
    /// Key used for change detection
    pub fn activity_key(&self) -> ActivityKey<'_> {
        ActivityKey {
            browser_name: &self.browser_name,
            tab_title: &self.tab_title,
            is_incognito: self.is_incognito,
        }
    }

    /// Whether `other` shows the same activity (ignores URL and timestamp)
    pub fn same_activity(&self, other: &BrowserState) -> bool {
        self.activity_key() == other.activity_key()
    }

    /// Mode suffix used in status lines: " (Incognito)", " (Private)" or ""
    pub fn mode_suffix(&self) -> &'static str {
        if self.is_incognito {
            " (Incognito)"
        } else if self.is_private {
            " (Private)"
        } else {
            ""
        }
    }

    /// One-line description for status messages
    pub fn status_line(&self) -> String {
        format!(
            "Active: {}{} - {}",
            self.browser_name,
            self.mode_suffix(),
            self.tab_title
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(title: &str, url: &str, incognito: bool) -> BrowserState {
        BrowserState {
            browser_name: "Google Chrome".to_string(),
            tab_title: title.to_string(),
            url: url.to_string(),
            icon_key: "chrome".to_string(),
            is_incognito: incognito,
            is_private: false,
            window_type: if incognito {
                WindowType::Incognito
            } else {
                WindowType::Normal
            },
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_same_activity_ignores_url_and_timestamp() {
        let a = state("GitHub", "https://github.com", false);
        let mut b = state("GitHub", "", false);
        b.captured_at = a.captured_at + Duration::seconds(30);
        assert!(a.same_activity(&b));
    }

    #[test]
    fn test_same_activity_detects_title_and_mode_changes() {
        let a = state("GitHub", "", false);
        assert!(!a.same_activity(&state("GitLab", "", false)));
        assert!(!a.same_activity(&state("GitHub", "", true)));
    }

    #[test]
    fn test_matches_process_case_insensitive_substring() {
        let rule = BrowserRule {
            name: "Google Chrome".to_string(),
            process_names: vec!["chrome".to_string()],
            normal_suffixes: Vec::new(),
            incognito_markers: Vec::new(),
            private_markers: Vec::new(),
            icon_key: "chrome".to_string(),
            chromium: true,
        };
        assert!(rule.matches_process("Chrome"));
        assert!(rule.matches_process("google-chrome-stable"));
        assert!(!rule.matches_process("firefox"));
    }

    #[test]
    fn test_status_line_mode_suffix() {
        assert_eq!(
            state("GitHub", "", true).status_line(),
            "Active: Google Chrome (Incognito) - GitHub"
        );
        assert_eq!(
            state("GitHub", "", false).status_line(),
            "Active: Google Chrome - GitHub"
        );
    }

    #[test]
    fn test_window_type_serialization() {
        let json = serde_json::to_string(&WindowType::Incognito).unwrap();
        assert_eq!(json, "\"incognito\"");
        assert_eq!(WindowType::Private.to_string(), "private");
        assert!(!WindowType::Normal.is_private_mode());
    }
}
