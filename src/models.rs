//! Data structures shared across castui
//!
//! - **Devices**: receivers found by a scan
//! - **Session**: the one cast the controller is tracking
//! - **Status**: what the receiver itself reports about playback

use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// Device Models
// =============================================================================

/// Castable receiver discovered on the network
///
/// Created from one scan output line and never mutated; the whole set is
/// replaced on the next scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Address passed to `catt -d`
    pub identifier: String,
    /// Friendly name
    pub name: String,
    /// Model string when the tool reports one
    pub model: Option<String>,
}

impl Device {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            model: None,
        }
    }

    /// True when `key` names this device by identifier or (case-insensitive) name
    pub fn matches(&self, key: &str) -> bool {
        self.identifier == key || self.name.eq_ignore_ascii_case(key)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.identifier)
    }
}

// =============================================================================
// Session Models
// =============================================================================

/// Lifecycle state of the tracked cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl SessionState {
    /// Playing or Paused
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Playing => write!(f, "▶ Playing"),
            SessionState::Paused => write!(f, "⏸ Paused"),
            SessionState::Stopped => write!(f, "⏹ Stopped"),
            SessionState::Error => write!(f, "✗ Error"),
        }
    }
}

/// One active or recently active cast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastSession {
    pub id: Uuid,
    pub device: Device,
    pub media_url: String,
    pub state: SessionState,
    pub last_error: Option<String>,
}

impl CastSession {
    pub fn new(device: Device, media_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            media_url: media_url.into(),
            state: SessionState::Idle,
            last_error: None,
        }
    }

    /// Move to `state`, dropping any previous error
    pub fn transition(&mut self, state: SessionState) {
        self.state = state;
        self.last_error = None;
    }

    /// Move to Error carrying the tool's message verbatim
    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = SessionState::Error;
        self.last_error = Some(message.into());
    }
}

// =============================================================================
// Receiver Status Models
// =============================================================================

/// Player state as the receiver reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Unknown,
    Idle,
    Buffering,
    Playing,
    Paused,
}

impl PlayerState {
    /// Parse the `State:` value from catt status
    pub fn from_catt_state(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PLAYING" => PlayerState::Playing,
            "PAUSED" => PlayerState::Paused,
            "BUFFERING" => PlayerState::Buffering,
            "IDLE" => PlayerState::Idle,
            _ => PlayerState::Unknown,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Unknown => write!(f, "Unknown"),
            PlayerState::Idle => write!(f, "Idle"),
            PlayerState::Buffering => write!(f, "Buffering..."),
            PlayerState::Playing => write!(f, "Playing"),
            PlayerState::Paused => write!(f, "Paused"),
        }
    }
}

/// Snapshot of `catt status`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    pub title: Option<String>,
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
    /// 0-100
    pub volume: Option<u8>,
    pub muted: bool,
}

impl PlaybackStatus {
    /// Idle receiver (backdrop/ambient screen)
    pub fn idle() -> Self {
        Self {
            state: PlayerState::Idle,
            ..Self::default()
        }
    }

    /// No title means nothing is loaded on the receiver
    pub fn has_media(&self) -> bool {
        self.title.is_some()
    }

    /// Live streams report no usable duration
    pub fn is_stream(&self) -> bool {
        self.duration.map(|d| d.is_zero()).unwrap_or(true)
    }

    /// Get progress as fraction (0.0-1.0)
    pub fn progress(&self) -> f64 {
        match (self.position, self.duration) {
            (Some(pos), Some(dur)) if !dur.is_zero() => {
                (pos.as_secs_f64() / dur.as_secs_f64()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn format_position(&self) -> String {
        format_duration(self.position.unwrap_or_default())
    }

    pub fn format_duration(&self) -> String {
        if self.is_stream() {
            "Stream".to_string()
        } else {
            format_duration(self.duration.unwrap_or_default())
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{}: {}", self.state, title),
            None => write!(f, "{}", self.state),
        }
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Format a Duration as HH:MM:SS
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

// =============================================================================
// Unit Tests
// =============================================================================
