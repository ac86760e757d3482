mod wmctrl;

pub use wmctrl::{WindowLine, WmctrlSource};

use anyhow::Result;

/// A live process and the title of its main visible window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Process name as reported by the OS (e.g. "chrome")
    pub name: String,
    /// Main window title, empty if the process has no visible window
    pub window_title: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            window_title: window_title.into(),
        }
    }

    /// Whether the window title is long enough to be worth classifying
    pub fn has_meaningful_title(&self) -> bool {
        self.window_title.chars().count() > 1
    }
}

/// OS primitive that lists live processes with their window titles
///
/// Implementations skip processes they cannot inspect instead of failing
/// the whole listing; an `Err` means enumeration itself could not run.
pub trait ProcessSource: Send + Sync {
    fn processes(&self) -> Result<Vec<ProcessInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meaningful_title() {
        assert!(ProcessInfo::new(1, "chrome", "GitHub").has_meaningful_title());
        assert!(!ProcessInfo::new(1, "chrome", "").has_meaningful_title());
        assert!(!ProcessInfo::new(1, "chrome", "a").has_meaningful_title());
    }
}
