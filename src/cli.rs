//! CLI - launch flags for castui
//!
//! castui is interactive only; flags tune the session it starts.
//!
//! # Examples
//!
//! ```bash
//! # Launch with defaults (scans on startup)
//! castui
//!
//! # Use a catt from a virtualenv and preselect a device
//! castui --catt ~/.venvs/catt/bin/catt --device "Living Room TV"
//!
//! # Slow network: give the scan more time
//! castui --scan-timeout 20
//! ```

use clap::Parser;
use std::path::PathBuf;

/// castui - terminal front-end for casting media URLs to Chromecasts
///
/// Discovers devices with `catt scan` and drives playback through catt.
#[derive(Parser, Debug, Default)]
#[command(
    name = "castui",
    version,
    about = "Terminal front-end for casting media URLs to Chromecasts",
    long_about = "Discover Chromecast devices on the local network and cast a \
                  direct media URL to one of them, with play/pause/stop and \
                  other transport controls.\n\n\
                  All device communication goes through the `catt` tool, \
                  which must be installed.",
    after_help = "EXAMPLES:\n\
                  castui                              Launch and scan\n\
                  castui -d \"Living Room TV\"          Preselect a device\n\
                  castui --no-scan                    Start without scanning\n\n\
                  ENVIRONMENT:\n\
                  CASTUI_LOG                          Log filter (e.g. debug)"
)]
pub struct Cli {
    /// Path to the catt executable
    #[arg(long, value_name = "PATH")]
    pub catt: Option<String>,

    /// Seconds to wait for a device scan
    #[arg(long, value_name = "SECS")]
    pub scan_timeout: Option<u64>,

    /// Seconds to wait for a playback command
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Device name or address to select after scanning
    #[arg(long, short = 'd')]
    pub device: Option<String>,

    /// Path to config file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Write logs here instead of the default log file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not scan for devices on startup
    #[arg(long)]
    pub no_scan: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Verify CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args() {
        let cli = Cli::parse_from(["castui"]);
        assert!(cli.catt.is_none());
        assert!(cli.device.is_none());
        assert!(!cli.no_scan);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "castui",
            "--catt",
            "/opt/catt",
            "--scan-timeout",
            "20",
            "-t",
            "30",
            "-d",
            "Living Room TV",
            "-c",
            "/tmp/castui.toml",
            "--log-file",
            "/tmp/castui.log",
            "--no-scan",
        ]);
        assert_eq!(cli.catt.as_deref(), Some("/opt/catt"));
        assert_eq!(cli.scan_timeout, Some(20));
        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.device.as_deref(), Some("Living Room TV"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/castui.toml")));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/castui.log")));
        assert!(cli.no_scan);
    }

    #[test]
    fn test_rejects_non_numeric_timeout() {
        assert!(Cli::try_parse_from(["castui", "--timeout", "soon"]).is_err());
    }
}
