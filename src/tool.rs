//! External tool adapter for catt
//!
//! Every call is a fresh `catt` process: nothing is kept between invocations.
//! Parsing of the tool's text output lives here too so it can be tested with
//! canned output instead of a real Chromecast.

use async_trait::async_trait;
use regex::Regex;
use std::net::IpAddr;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::error::ToolError;
use crate::models::{Device, PlaybackStatus, PlayerState};

/// Captured result of one finished invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stderr verbatim, or a generic message when the tool printed nothing
    pub fn error_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.exit_code {
            Some(code) => format!("catt command failed with exit code {}", code),
            None => "catt command was terminated".to_string(),
        }
    }
}

/// catt process left running to serve a local file to the receiver
///
/// The child must be spawned with `kill_on_drop(true)`; dropping the handle
/// ends the stream.
#[derive(Debug)]
pub struct LocalServer {
    child: Child,
}

impl LocalServer {
    pub fn new(child: Child) -> Self {
        Self { child }
    }

    /// OS process id, `None` once it has been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the serving process without waiting for it
    pub fn kill(mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "local file server already gone");
        }
    }
}

/// How a serving invocation turned out after its grace period
#[derive(Debug)]
pub enum Served {
    /// Still running: the file is being streamed
    Running(LocalServer),
    /// Exited early, which means the cast failed
    Exited(ToolOutput),
}

/// Runs the casting tool with a list of arguments
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Spawn the tool, wait at most `timeout`, kill it if it overruns
    async fn run(&self, args: &[String], timeout: Duration) -> Result<ToolOutput, ToolError>;

    /// Spawn a long-lived invocation (local file cast) and watch it for `grace`
    async fn serve(&self, args: &[String], grace: Duration) -> Result<Served, ToolError>;

    /// Whether the tool can be executed at all
    fn is_available(&self) -> bool;

    /// Program name for messages
    fn program(&self) -> &str;
}

/// Real runner spawning the `catt` binary
#[derive(Debug, Clone)]
pub struct CattRunner {
    program: String,
}

impl CattRunner {
    pub fn new() -> Self {
        Self::with_path("catt")
    }

    /// Create with custom catt path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            program: path.into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> ToolError {
        match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound {
                program: self.program.clone(),
            },
            std::io::ErrorKind::PermissionDenied => ToolError::NotExecutable {
                program: self.program.clone(),
            },
            _ => ToolError::Io(e),
        }
    }
}

/// Regular file with at least one execute bit set
fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

impl Default for CattRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for CattRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<ToolOutput, ToolError> {
        tracing::info!(program = %self.program, args = %args.join(" "), "running catt");

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the wait future drops the child, and kill_on_drop reaps it
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(args = %args.join(" "), ?timeout, "catt timed out, killed");
                return Err(ToolError::Timeout { after: timeout });
            }
        };

        let result = ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(exit_code = ?result.exit_code, stdout = %result.stdout.trim(), "catt finished");
        if !result.is_success() {
            tracing::warn!(exit_code = ?result.exit_code, stderr = %result.stderr.trim(), "catt failed");
        }
        Ok(result)
    }

    async fn serve(&self, args: &[String], grace: Duration) -> Result<Served, ToolError> {
        tracing::info!(program = %self.program, args = %args.join(" "), "starting local file cast");

        // stdout is never read while serving, so it must not be piped
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let waited = tokio::time::timeout(grace, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                tracing::info!(pid = ?child.id(), "catt is serving the file");
                return Ok(Served::Running(LocalServer::new(child)));
            }
        };

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_string(&mut stderr).await?;
        }
        tracing::warn!(exit_code = ?status.code(), stderr = %stderr.trim(), "catt exited while serving");
        Ok(Served::Exited(ToolOutput {
            exit_code: status.code(),
            stdout: String::new(),
            stderr,
        }))
    }

    fn is_available(&self) -> bool {
        let path = Path::new(&self.program);
        if path.components().count() > 1 {
            return is_executable(path);
        }
        std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(&self.program)))
            })
            .unwrap_or(false)
    }

    fn program(&self) -> &str {
        &self.program
    }
}

// =============================================================================
// Argument Builders
// =============================================================================

/// `catt scan`
pub fn scan_args() -> Vec<String> {
    vec!["scan".to_string()]
}

/// `catt -d <device> <subcommand> [extra...]`
pub fn device_args(device: &Device, subcommand: &str, extra: &[&str]) -> Vec<String> {
    let mut args = vec![
        "-d".to_string(),
        device.identifier.clone(),
        subcommand.to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    args
}

// =============================================================================
// Output Parsing
// =============================================================================

fn scan_line_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        // identifier, then " - " or whitespace, then name, then optional " - model"
        Regex::new(r"^(?P<id>\S+)(?:\s+-\s+|\s+)(?P<name>.+?)(?:\s+-\s+(?P<model>.+))?$").ok()
    })
    .as_ref()
}

/// Parse one scan line; `None` for headers and malformed lines
pub fn parse_scan_line(line: &str) -> Option<Device> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Tab-delimited lines keep everything after the tab as the name
    if let Some((id, name)) = line.split_once('\t') {
        let (id, name) = (id.trim(), name.trim());
        if id.parse::<IpAddr>().is_err() || name.is_empty() {
            return None;
        }
        return Some(Device::new(id, name));
    }

    let caps = scan_line_regex()?.captures(line)?;
    let id = caps.name("id")?.as_str();
    id.parse::<IpAddr>().ok()?;
    let name = caps.name("name")?.as_str().trim();
    if name.is_empty() {
        return None;
    }

    Some(Device {
        identifier: id.to_string(),
        name: name.to_string(),
        model: caps.name("model").map(|m| m.as_str().trim().to_string()),
    })
}

/// Parse `catt scan` output, one device per valid line, order preserved
pub fn parse_scan(output: &str) -> Vec<Device> {
    output.lines().filter_map(parse_scan_line).collect()
}

/// Parse `H:MM:SS` (or `MM:SS`) into a duration
pub fn parse_clock(s: &str) -> Option<Duration> {
    let parts: Vec<u64> = s
        .trim()
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let secs = match parts.as_slice() {
        [h, m, s] => h * 3600 + m * 60 + s,
        [m, s] => m * 60 + s,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

fn parse_seconds(s: &str) -> Option<Duration> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Parse `catt status` output
///
/// Accepts both the `Time: 0:01:23 / 1:23:45 (1%)` form and separate
/// `Current time:` / `Duration:` second counts.
pub fn parse_status(output: &str) -> PlaybackStatus {
    let mut status = PlaybackStatus::default();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "state" => status.state = PlayerState::from_catt_state(value),
            "title" => status.title = Some(value.to_string()),
            "volume" => status.volume = value.parse::<u8>().ok().map(|v| v.min(100)),
            "volume muted" => status.muted = value.eq_ignore_ascii_case("true"),
            "time" => {
                let mut halves = value.split(" / ");
                status.position = halves.next().and_then(parse_clock);
                status.duration = halves
                    .next()
                    .and_then(|d| d.split_whitespace().next())
                    .and_then(parse_clock);
            }
            "current time" => status.position = parse_seconds(value),
            "duration" => status.duration = parse_seconds(value),
            _ => {}
        }
    }

    status
}

/// Status errors that just mean the receiver has nothing loaded
pub fn is_idle_status_error(message: &str) -> bool {
    message.contains("inactive") || message.contains("Nothing is currently playing")
}
