//! castui - terminal front-end for casting media URLs to Chromecasts
//!
//! All network and protocol work is done by the external `catt` tool. This
//! crate wraps it: argument construction, output parsing, a session state
//! machine and a single-flight background worker.
//!
//! # Modules
//!
//! - `tool` - catt adapter (`ToolRunner`), scan/status parsing
//! - `registry` - devices found by the last scan
//! - `session` - cast target, session state machine, command plans
//! - `schedule` - when to poll the receiver for status
//! - `paths` - local file detection and completion
//! - `worker` - background dispatcher, one job in flight
//! - `app` - keyboard handling and UI state
//! - `ui` - ratatui rendering

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod registry;
pub mod schedule;
pub mod session;
pub mod tool;
pub mod ui;
pub mod worker;

// Re-export commonly used types
pub use app::{App, InputMode, PromptKind};
pub use config::{Config, Settings};
pub use error::{CastError, ToolError};
pub use models::{CastSession, Device, PlaybackStatus, PlayerState, SessionState};
pub use registry::{DeviceRegistry, ScanReport};
pub use session::{CastController, Execution, Outcome, Plan, Prepared, Request};
pub use tool::{CattRunner, ToolOutput, ToolRunner};
pub use worker::{Dispatcher, JobResult, ScanSubmission};
