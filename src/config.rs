//! Configuration management for castui
//!
//! Config is stored at ~/.config/castui/config.toml. Launch flags override
//! individual values; the merged result is [`Settings`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Casting tool executable (name on PATH or full path)
    pub catt_path: String,
    /// Upper bound for one device scan
    pub scan_timeout_secs: u64,
    /// Upper bound for one control command
    pub command_timeout_secs: u64,
    /// Device name or address auto-selected after a scan
    pub default_device: Option<String>,
    /// tracing filter directive, e.g. "debug" or "castui=trace"
    pub log_level: Option<String>,
    /// Seconds skipped by fast-forward/rewind
    pub seek_step_secs: u32,
    /// Volume change per step (percent)
    pub volume_step: u8,
    /// Status resync while something plays; 0 turns it off
    pub status_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catt_path: "catt".to_string(),
            scan_timeout_secs: 10,
            command_timeout_secs: 15,
            default_device: None,
            log_level: None,
            seek_step_secs: 15,
            volume_step: 5,
            status_interval_secs: 15,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/castui/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("castui").join("config.toml"))
    }

    /// Load config from `path`; a missing file gives the defaults
    ///
    /// An unreadable or invalid file is an error so the caller can report
    /// it once logging is up.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Default log file (~/.local/share/castui/castui.log)
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("castui").join("castui.log"))
}

/// Runtime settings: config file merged with launch flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub catt_path: String,
    pub scan_timeout: Duration,
    pub command_timeout: Duration,
    pub default_device: Option<String>,
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
    pub seek_step_secs: u32,
    pub volume_step: u8,
    /// Status resync while something plays
    pub status_interval: Option<Duration>,
    /// Scan for devices as soon as the UI is up
    pub scan_on_start: bool,
}

impl Settings {
    /// Merge `config` with the flags in `cli`; flags win
    ///
    /// `env_filter` is the value of `CASTUI_LOG`, which beats both.
    pub fn resolve(config: Config, cli: &Cli, env_filter: Option<String>) -> Self {
        let log_filter = env_filter
            .filter(|f| !f.trim().is_empty())
            .or(config.log_level)
            .unwrap_or_else(|| "info".to_string());

        let scan_secs = cli.scan_timeout.unwrap_or(config.scan_timeout_secs);
        let command_secs = cli.timeout.unwrap_or(config.command_timeout_secs);

        Self {
            catt_path: cli.catt.clone().unwrap_or(config.catt_path),
            scan_timeout: Duration::from_secs(scan_secs.max(1)),
            command_timeout: Duration::from_secs(command_secs.max(1)),
            default_device: cli.device.clone().or(config.default_device),
            log_filter,
            log_file: cli.log_file.clone().or_else(default_log_path),
            seek_step_secs: config.seek_step_secs.max(1),
            volume_step: config.volume_step.clamp(1, 100),
            status_interval: resync_interval(config.status_interval_secs),
            scan_on_start: !cli.no_scan,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            catt_path: config.catt_path,
            scan_timeout: Duration::from_secs(config.scan_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            default_device: None,
            log_filter: "info".to_string(),
            log_file: None,
            seek_step_secs: config.seek_step_secs,
            volume_step: config.volume_step,
            status_interval: resync_interval(config.status_interval_secs),
            scan_on_start: true,
        }
    }
}

fn resync_interval(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
