//! Error types
//!
//! `ToolError` covers a single subprocess invocation; `CastError` is what the
//! registry and session controller hand back to the UI.

use std::time::Duration;
use thiserror::Error;

/// Failure to run the external casting tool at all
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("'{program}' command not found. Is it installed and in your PATH?")]
    NotFound { program: String },

    #[error("'{program}' is not executable. Check its permissions.")]
    NotExecutable { program: String },

    #[error("command timed out after {}s", after.as_secs())]
    Timeout { after: Duration },

    #[error("failed to run command: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured failure surfaced to the UI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CastError {
    /// Scan process failed or timed out
    #[error("{0}")]
    DiscoveryFailure(String),

    /// A cast/control command exited non-zero, timed out or could not run
    #[error("{message}")]
    CommandFailed { action: String, message: String },

    /// Rejected before any subprocess was spawned
    #[error("{0}")]
    InvalidInput(String),

    /// External tool missing or not executable
    #[error("{0}")]
    ToolNotFound(String),

    /// Another background operation is in flight
    #[error("An operation is already in progress.")]
    Busy,
}

impl CastError {
    /// Short classification label shown next to the raw message
    pub fn label(&self) -> &'static str {
        match self {
            CastError::DiscoveryFailure(_) => "Discovery failed",
            CastError::CommandFailed { .. } => "Command failed",
            CastError::InvalidInput(_) => "Invalid input",
            CastError::ToolNotFound(_) => "Tool not found",
            CastError::Busy => "Busy",
        }
    }

    /// ToolNotFound stays on screen until the tool shows up
    pub fn is_persistent(&self) -> bool {
        matches!(self, CastError::ToolNotFound(_))
    }

    /// Map an adapter failure for a control command
    pub fn from_tool(action: &str, err: ToolError) -> Self {
        match err {
            ToolError::NotFound { .. } | ToolError::NotExecutable { .. } => {
                CastError::ToolNotFound(err.to_string())
            }
            other => CastError::CommandFailed {
                action: action.to_string(),
                message: other.to_string(),
            },
        }
    }
}
