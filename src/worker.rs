//! Background dispatcher
//!
//! Scans and cast commands block on a subprocess for seconds, so each one runs
//! as a one-shot tokio task and reports back over a channel the UI loop drains.
//! At most one task is in flight:
//!
//! - scan while a scan runs: coalesced into the running one
//! - scan while a command runs: queued (one pending scan at most)
//! - command while anything runs: rejected with [`CastError::Busy`], except
//!   that a background status poll gives way to it
//!
//! Every job carries a generation number; results from a job that was
//! cancelled or preempted are dropped when they arrive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::CastError;
use crate::models::Device;
use crate::registry::discover;
use crate::session::{execute, Execution, Plan};
use crate::tool::ToolRunner;

/// Finished background work handed back to the UI thread
#[derive(Debug)]
pub enum JobResult {
    Scan(Result<Vec<Device>, CastError>),
    Command {
        plan: Plan,
        result: Result<Execution, CastError>,
    },
    /// Status check the app scheduled on its own
    Poll {
        plan: Plan,
        result: Result<Execution, CastError>,
    },
}

/// Kind of the in-flight job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Scan,
    Command,
    Poll,
}

/// What happened to a scan request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSubmission {
    /// A new scan process was spawned
    Started,
    /// Folded into the scan already running
    Coalesced,
    /// Will start once the running command finishes
    Queued,
}

struct InFlight {
    kind: JobKind,
    generation: u64,
    handle: JoinHandle<()>,
}

type Message = (u64, JobResult);

/// Single-flight launcher for scans and cast commands
pub struct Dispatcher {
    runner: Arc<dyn ToolRunner>,
    scan_timeout: Duration,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    in_flight: Option<InFlight>,
    scan_pending: bool,
    generation: u64,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn ToolRunner>, scan_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runner,
            scan_timeout,
            tx,
            rx,
            in_flight: None,
            scan_pending: false,
            generation: 0,
        }
    }

    /// True while a background job runs
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<JobKind> {
        self.in_flight.as_ref().map(|f| f.kind)
    }

    pub fn scan_pending(&self) -> bool {
        self.scan_pending
    }

    /// Request a device scan
    pub fn submit_scan(&mut self) -> ScanSubmission {
        match self.in_flight() {
            Some(JobKind::Scan) => {
                tracing::debug!("scan already running, coalesced");
                ScanSubmission::Coalesced
            }
            Some(JobKind::Command) | Some(JobKind::Poll) => {
                tracing::debug!("scan queued behind running command");
                self.scan_pending = true;
                ScanSubmission::Queued
            }
            None => {
                self.spawn_scan();
                ScanSubmission::Started
            }
        }
    }

    /// Run a prepared command plan, or refuse if anything is in flight
    ///
    /// A running status poll is aborted to make room.
    pub fn submit_command(&mut self, plan: Plan) -> Result<(), CastError> {
        if self.in_flight() == Some(JobKind::Poll) {
            tracing::debug!(action = plan.request.action(), "preempting status poll");
            self.abort_in_flight();
        }
        if self.is_busy() {
            tracing::debug!(action = plan.request.action(), "rejected, busy");
            return Err(CastError::Busy);
        }
        self.spawn_plan(JobKind::Command, plan);
        Ok(())
    }

    /// Run a background status poll; skipped (false) while anything runs
    pub fn submit_poll(&mut self, plan: Plan) -> bool {
        if self.is_busy() {
            return false;
        }
        self.spawn_plan(JobKind::Poll, plan);
        true
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn spawn_plan(&mut self, kind: JobKind, plan: Plan) {
        let generation = self.next_generation();
        let runner = Arc::clone(&self.runner);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let result = execute(runner.as_ref(), &plan).await;
            let job = match kind {
                JobKind::Poll => JobResult::Poll { plan, result },
                _ => JobResult::Command { plan, result },
            };
            let _ = tx.send((generation, job));
        });
        self.in_flight = Some(InFlight {
            kind,
            generation,
            handle,
        });
    }

    fn spawn_scan(&mut self) {
        let generation = self.next_generation();
        let runner = Arc::clone(&self.runner);
        let timeout = self.scan_timeout;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let result = discover(runner.as_ref(), timeout).await;
            let _ = tx.send((generation, JobResult::Scan(result)));
        });
        self.in_flight = Some(InFlight {
            kind: JobKind::Scan,
            generation,
            handle,
        });
    }

    /// True when `generation` is the job currently in flight
    fn is_current(&self, generation: u64) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
    }

    /// Clear the in-flight slot and start a queued scan, if any
    fn finish(&mut self) {
        self.in_flight = None;
        if std::mem::take(&mut self.scan_pending) {
            self.spawn_scan();
        }
    }

    /// Non-blocking: take a finished job if one is ready
    pub fn try_next(&mut self) -> Option<JobResult> {
        loop {
            let (generation, result) = self.rx.try_recv().ok()?;
            if self.is_current(generation) {
                self.finish();
                return Some(result);
            }
            tracing::debug!(generation, "dropping stale job result");
        }
    }

    /// Wait for the in-flight job to finish
    ///
    /// Returns `None` immediately when nothing is running.
    pub async fn next(&mut self) -> Option<JobResult> {
        while self.is_busy() {
            let (generation, result) = self.rx.recv().await?;
            if self.is_current(generation) {
                self.finish();
                return Some(result);
            }
            tracing::debug!(generation, "dropping stale job result");
        }
        None
    }

    fn abort_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::info!(kind = ?in_flight.kind, "cancelling background job");
            in_flight.handle.abort();
        }
    }

    /// Abort the running job; dropping it kills the subprocess
    pub fn cancel(&mut self) {
        self.abort_in_flight();
        self.scan_pending = false;
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
