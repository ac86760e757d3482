//! Window-title classification.
//!
//! A [`TitleClassifier`] turns one raw window title plus the [`BrowserRule`]
//! that owns the window into a [`BrowserState`]. All matching is literal
//! substring work driven by the rule's data; adding a browser never needs
//! code here.

mod url;

pub use url::extract_url;

use chrono::Utc;

use crate::browsers::{BrowserRule, BrowserState, WindowType, NEW_TAB_TITLE};

/// Classifies raw browser window titles against a rule
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleClassifier;

impl TitleClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw window title
    ///
    /// Returns `None` only for titles of one character or less, which are
    /// window-manager noise rather than page titles. Anything longer yields
    /// a best-effort state, however odd the title.
    pub fn classify(&self, rule: &BrowserRule, raw_title: &str) -> Option<BrowserState> {
        if raw_title.chars().count() <= 1 {
            return None;
        }

        let window_type = detect_window_type(rule, raw_title);

        Some(BrowserState {
            browser_name: rule.name.clone(),
            tab_title: clean_title(rule, raw_title),
            url: extract_url(raw_title),
            icon_key: rule.icon_key.clone(),
            is_incognito: window_type == WindowType::Incognito,
            is_private: window_type == WindowType::Private,
            window_type,
            captured_at: Utc::now(),
        })
    }
}

/// Decide the session kind from the rule's privacy markers
///
/// Incognito markers are checked before private markers, so a title that
/// somehow carries both is reported as incognito. Matching is case-sensitive.
pub fn detect_window_type(rule: &BrowserRule, raw_title: &str) -> WindowType {
    if contains_any(raw_title, &rule.incognito_markers) {
        WindowType::Incognito
    } else if contains_any(raw_title, &rule.private_markers) {
        WindowType::Private
    } else {
        WindowType::Normal
    }
}

/// Strip browser suffixes and privacy markers from anywhere in the title
///
/// Removal is literal and global, not anchored to the end: markers such as
/// "Incognito" can sit in the middle of a title.
pub fn clean_title(rule: &BrowserRule, raw_title: &str) -> String {
    let stripped = rule
        .normal_suffixes
        .iter()
        .chain(&rule.incognito_markers)
        .chain(&rule.private_markers)
        .filter(|needle| !needle.is_empty())
        .fold(raw_title.to_string(), |title, needle| {
            title.replace(needle.as_str(), "")
        });

    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        NEW_TAB_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| !needle.is_empty() && haystack.contains(needle.as_str()))
}
