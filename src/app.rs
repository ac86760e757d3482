use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::browsers::BrowserCatalog;
use crate::config::{Command, PresenceSettings, PublisherKind, Settings};
use crate::monitor::{Monitor, MonitorEvent, Snapshot, Snapshotter, StopReason};
use crate::presence::{default_state_path, FilePublisher, LogPublisher, PresencePublisher};
use crate::system::{ProcessSource, WmctrlSource};

/// Main application
pub struct App {
    settings: Settings,
    source: Arc<dyn ProcessSource>,
}

impl App {
    /// Create a new application reading windows through wmctrl
    pub fn new(settings: Settings) -> Self {
        Self::with_source(settings, Arc::new(WmctrlSource::new()))
    }

    pub fn with_source(settings: Settings, source: Arc<dyn ProcessSource>) -> Self {
        Self { settings, source }
    }

    /// Run a subcommand to completion
    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Run => self.monitor().await,
            Command::Detect => {
                print!("{}", self.detect()?);
                Ok(())
            }
            Command::Browsers => {
                print!("{}", render_catalog(&self.settings.catalog()?));
                Ok(())
            }
            Command::Config => {
                print!("{}", render_config(&self.settings)?);
                Ok(())
            }
        }
    }

    /// Monitor until Ctrl+C or until the loop gives up
    async fn monitor(&mut self) -> Result<()> {
        let catalog = self.settings.catalog()?;
        let monitor = Monitor::from_settings(&self.settings, catalog, self.source.clone());
        let publisher = build_publisher(&self.settings.presence);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = monitor.start(publisher, tx).await;
        let mut handle = match started {
            Ok(handle) => handle,
            Err(e) => {
                drain_events(&mut rx);
                return Err(e).context("Failed to start monitoring");
            }
        };

        let mut stopped_by_errors = false;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(MonitorEvent::Stopped(reason)) => {
                        stopped_by_errors = reason == StopReason::TooManyErrors;
                        break;
                    }
                    Some(event) => print_event(&event),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                    break;
                }
            }
        }

        if let Some(reason) = handle.stop().await {
            stopped_by_errors |= reason == StopReason::TooManyErrors;
        }
        drain_events(&mut rx);

        if stopped_by_errors {
            anyhow::bail!("monitoring stopped after too many consecutive errors");
        }
        Ok(())
    }

    /// One synchronous sweep rendered for the terminal
    fn detect(&self) -> Result<String> {
        let catalog = self.settings.catalog()?;
        let snapshot = Snapshotter::new(&catalog, self.source.as_ref()).take()?;
        if snapshot.skipped > 0 {
            warn!("{} browser window(s) could not be classified", snapshot.skipped);
        }
        Ok(render_snapshot(&snapshot))
    }
}

/// Build the configured presence publisher
pub fn build_publisher(settings: &PresenceSettings) -> Box<dyn PresencePublisher> {
    match settings.publisher {
        PublisherKind::Log => Box::new(LogPublisher::new()),
        PublisherKind::File => {
            let path = settings
                .state_file
                .clone()
                .unwrap_or_else(default_state_path);
            Box::new(FilePublisher::new(path, settings.application_id.clone()))
        }
    }
}

/// Render a monitor event as a timestamped line; `None` for silent events
pub fn format_event(event: &MonitorEvent, now: DateTime<Local>) -> Option<String> {
    match event {
        MonitorEvent::Status(message) => Some(format!("[{}] {}", now.format("%H:%M:%S"), message)),
        MonitorEvent::BrowserChanged(_) | MonitorEvent::Stopped(_) => None,
    }
}

fn print_event(event: &MonitorEvent) {
    if let Some(line) = format_event(event, Local::now()) {
        println!("{}", line);
    }
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<MonitorEvent>) {
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }
}

/// Render every browser window in a snapshot
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return "No browsers detected. Make sure a browser window is open.\n".to_string();
    }

    let mut out = String::new();
    for state in &snapshot.states {
        let _ = writeln!(out, "{} {}", state.window_type.label(), state.browser_name);
        let _ = writeln!(out, "  Title: {}", state.tab_title);
        let _ = writeln!(out, "  Icon:  {}", state.icon_key);
        if !state.url.is_empty() {
            let _ = writeln!(out, "  URL:   {}", state.url);
        }
    }
    if let Some(active) = snapshot.select_active() {
        let _ = writeln!(out, "\n{}", active.status_line());
    }
    out
}

/// Render the catalog, one browser per block
pub fn render_catalog(catalog: &BrowserCatalog) -> String {
    let mut out = String::new();
    for (key, rule) in catalog.iter() {
        let _ = writeln!(out, "{} ({})", rule.name, key);
        let _ = writeln!(out, "  processes: {}", rule.process_names.join(", "));
        let suffixes: Vec<String> = rule
            .normal_suffixes
            .iter()
            .map(|s| format!("{:?}", s))
            .collect();
        let _ = writeln!(out, "  suffixes:  {}", suffixes.join(", "));
        if !rule.incognito_markers.is_empty() {
            let _ = writeln!(out, "  incognito: {}", rule.incognito_markers.join(", "));
        }
        if !rule.private_markers.is_empty() {
            let _ = writeln!(out, "  private:   {}", rule.private_markers.join(", "));
        }
    }
    out
}

/// Render where the settings came from and their effective values
pub fn render_config(settings: &Settings) -> Result<String> {
    let mut out = String::new();
    match &settings.source_path {
        Some(path) => {
            let _ = writeln!(out, "# Loaded from {}", path.display());
        }
        None => {
            let _ = writeln!(out, "# No config file found, using defaults. Searched:");
            for path in Settings::default_paths() {
                let _ = writeln!(out, "#   {}", path.display());
            }
        }
    }
    out.push('\n');
    out.push_str(&settings.to_toml()?);
    Ok(out)
}
