use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::browsers::{BrowserCatalog, BrowserRule};

/// Shortest allowed delay between two polls
pub const MIN_POLL_INTERVAL_SECS: u64 = 2;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Publish the active browser tab as presence")]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Polling interval in seconds (minimum 2)
    #[arg(short = 'i', long, global = true)]
    pub interval: Option<u64>,

    /// Presence publisher to use
    #[arg(short, long, global = true, value_enum)]
    pub publisher: Option<PublisherKind>,

    /// Subcommand (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Monitor browsers and publish presence until interrupted
    Run,
    /// Run one detection sweep and print every browser window found
    Detect,
    /// List the browsers the catalog knows about
    Browsers,
    /// Show the effective configuration
    Config,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run, `run` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

/// Which presence publisher drives the remote channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PublisherKind {
    /// Log presence transitions only
    #[default]
    Log,
    /// Mirror presence into a JSON state file
    File,
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Delay between polls in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Presence publisher settings
    #[serde(default)]
    pub presence: PresenceSettings,

    /// Extra browsers appended to the built-in catalog
    #[serde(default)]
    pub browsers: Vec<CustomBrowser>,

    /// Path the settings were loaded from (not serialized)
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_poll_interval() -> u64 {
    3
}

/// Presence publisher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceSettings {
    /// Publisher implementation
    #[serde(default)]
    pub publisher: PublisherKind,

    /// Application id of the presence integration
    #[serde(default)]
    pub application_id: String,

    /// Handshake timeout in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// State file for the file publisher (default: data dir)
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

fn default_handshake_timeout() -> u64 {
    5
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            publisher: PublisherKind::default(),
            application_id: String::new(),
            handshake_timeout_secs: default_handshake_timeout(),
            state_file: None,
        }
    }
}

/// Browser rule declared in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomBrowser {
    /// Catalog key; reusing a built-in key replaces that browser
    pub key: String,
    #[serde(flatten)]
    pub rule: BrowserRule,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            presence: PresenceSettings::default(),
            browsers: Vec::new(),
            source_path: None,
        }
    }
}

impl Settings {
    /// Config file locations searched when no path is given
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("tabpresence/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/tabpresence/config.toml")),
            dirs::home_dir().map(|p| p.join(".tabpresence.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::load_file(p);
            }
        }

        for path in Self::default_paths() {
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn load_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        settings.source_path = Some(path.clone());
        Ok(settings)
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(interval) = cli.interval {
            self.poll_interval_secs = interval;
        }
        if let Some(publisher) = cli.publisher {
            self.presence.publisher = publisher;
        }
    }

    /// Validate and normalize settings values
    ///
    /// Clamps the poll interval to at least two seconds and the handshake
    /// timeout to at least one.
    pub fn validate(&mut self) {
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            self.poll_interval_secs = MIN_POLL_INTERVAL_SECS;
        }
        if self.presence.handshake_timeout_secs == 0 {
            self.presence.handshake_timeout_secs = 1;
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.presence.handshake_timeout_secs)
    }

    /// Built-in catalog extended with the configured browsers
    pub fn catalog(&self) -> Result<BrowserCatalog> {
        self.browsers
            .iter()
            .try_fold(BrowserCatalog::builtin(), |catalog, custom| {
                catalog
                    .with_rule(custom.key.clone(), custom.rule.clone())
                    .with_context(|| format!("Invalid browser entry '{}'", custom.key))
            })
    }

    /// Render the effective settings as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }
}
