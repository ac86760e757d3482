use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use super::{ProcessInfo, ProcessSource};

/// `wmctrl -lp` line: window id, desktop, pid, client host, title
static WINDOW_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(0x[0-9a-fA-F]+)\s+(-?\d+)\s+(\d+)\s+(\S+)\s?(.*)$")
        .expect("Invalid WINDOW_LINE regex")
});

/// One top-level window reported by wmctrl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLine {
    pub window_id: String,
    pub pid: u32,
    pub title: String,
}

impl WindowLine {
    /// Parse a line of `wmctrl -lp` output
    pub fn parse(line: &str) -> Option<Self> {
        let caps = WINDOW_LINE.captures(line.trim_end())?;
        let pid: u32 = caps.get(3)?.as_str().parse().ok()?;
        Some(Self {
            window_id: caps.get(1)?.as_str().to_string(),
            pid,
            title: caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }
}

/// Process source backed by `wmctrl` and `/proc` (X11 desktops)
pub struct WmctrlSource {
    proc_root: PathBuf,
}

impl WmctrlSource {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// List top-level windows with their owning pid
    pub fn list_windows(&self) -> Result<Vec<WindowLine>> {
        let output = Command::new("wmctrl")
            .arg("-lp")
            .output()
            .context("Failed to execute wmctrl -lp (is wmctrl installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("wmctrl -lp failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(WindowLine::parse).collect())
    }

    /// Read a process name from `/proc/{pid}/comm`
    fn process_name(&self, pid: u32) -> Result<String> {
        let path = self.proc_root.join(pid.to_string()).join("comm");
        let name = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(name.trim().to_string())
    }

    /// Join windows with process names, one main window per pid
    ///
    /// The first listed window of a pid is its main window. Windows whose
    /// process cannot be inspected (already exited, access denied, pid 0)
    /// are skipped.
    fn resolve(&self, windows: Vec<WindowLine>) -> Vec<ProcessInfo> {
        let mut seen = HashSet::new();
        let mut processes = Vec::new();

        for window in windows {
            if window.pid == 0 || !seen.insert(window.pid) {
                continue;
            }
            match self.process_name(window.pid) {
                Ok(name) => processes.push(ProcessInfo::new(window.pid, name, window.title)),
                Err(e) => debug!("Skipping pid {}: {:#}", window.pid, e),
            }
        }

        processes
    }
}

impl Default for WmctrlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for WmctrlSource {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let windows = self.list_windows()?;
        Ok(self.resolve(windows))
    }
}
