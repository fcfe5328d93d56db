//! Shared test helpers
//!
//! `ScriptedRunner` stands in for the catt binary: it hands out canned
//! replies in order and records every argument list it was called with.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use castui::tool::{LocalServer, Served};
use castui::{Device, ToolError, ToolOutput, ToolRunner};

/// One canned reply
#[derive(Debug, Clone)]
pub enum Reply {
    Output(ToolOutput),
    NotFound,
    Timeout,
}

/// Fake `ToolRunner` driven by a queue of replies
///
/// With an empty queue every call succeeds with empty output.
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Vec<String>>>,
    gate: Option<Arc<Semaphore>>,
    available: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
            available: true,
        }
    }

    /// Every call waits for a permit on the returned semaphore
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let runner = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::new()
        };
        (runner, gate)
    }

    /// Report the tool as missing from PATH
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn reply_ok(&self, stdout: &str) -> &Self {
        self.push(Reply::Output(ToolOutput::success(stdout)))
    }

    pub fn reply_fail(&self, code: i32, stderr: &str) -> &Self {
        self.push(Reply::Output(ToolOutput::failure(code, stderr)))
    }

    /// Every argument list seen so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Record the call, wait for the gate, pop the next reply
    async fn next_reply(&self, args: &[String]) -> Option<Reply> {
        self.calls.lock().unwrap().push(args.to_vec());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.replies.lock().unwrap().pop_front()
    }
}

/// Stand-in for a catt process that keeps serving a file
fn sleeping_server() -> LocalServer {
    let child = tokio::process::Command::new("sleep")
        .arg("30")
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    LocalServer::new(child)
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<ToolOutput, ToolError> {
        match self.next_reply(args).await {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::NotFound) => Err(ToolError::NotFound {
                program: "catt".to_string(),
            }),
            Some(Reply::Timeout) => Err(ToolError::Timeout { after: timeout }),
            None => Ok(ToolOutput::success("")),
        }
    }

    /// A successful reply means the file is being served
    async fn serve(&self, args: &[String], grace: Duration) -> Result<Served, ToolError> {
        match self.next_reply(args).await {
            Some(Reply::Output(output)) if !output.is_success() => Ok(Served::Exited(output)),
            Some(Reply::NotFound) => Err(ToolError::NotFound {
                program: "catt".to_string(),
            }),
            Some(Reply::Timeout) => Err(ToolError::Timeout { after: grace }),
            Some(Reply::Output(_)) | None => Ok(Served::Running(sleeping_server())),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn program(&self) -> &str {
        "catt"
    }
}

pub fn living_room() -> Device {
    Device::new("192.168.1.10", "Living Room")
}

pub fn bedroom() -> Device {
    Device::new("192.168.1.11", "Bedroom")
}

/// `catt scan` output listing both test devices
pub const TWO_DEVICES: &str = "192.168.1.10\tLiving Room\n192.168.1.11\tBedroom\n";

/// Owned argument list from string slices
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
