//! Cast session controller
//!
//! Owns the selected target device and the one tracked `CastSession`.
//! Every user action goes through three steps:
//!
//! 1. [`CastController::prepare`] validates the request against the current
//!    state and turns it into a [`Plan`] of catt invocations (or a no-op);
//! 2. [`execute`] runs the plan, usually on the background worker;
//! 3. [`CastController::complete`] applies the confirmed result.
//!
//! The session state only changes in step 3, after the tool has answered.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CastError;
use crate::models::{format_duration, CastSession, Device, PlaybackStatus, SessionState};
use crate::tool::{
    device_args, is_idle_status_error, parse_status, LocalServer, Served, ToolOutput, ToolRunner,
};

/// Default upper bound for one control command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// A local file cast that exits sooner than this has failed
pub const LOCAL_CAST_GRACE: Duration = Duration::from_secs(3);

// =============================================================================
// Requests & Plans
// =============================================================================

/// A user action aimed at the casting tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Start casting `url` to `device`, replacing any active session
    Cast { device: Device, url: String },
    /// Cast a web page instead of a media file
    CastSite { device: Device, url: String },
    /// Stream a file from this machine; catt keeps serving it in the background
    CastFile { device: Device, path: PathBuf },
    /// Queue `url` after the current media
    Enqueue { url: String },
    Pause,
    Resume,
    Stop,
    /// Stop playback on every listed device
    StopAll { devices: Vec<Device> },
    /// Query the receiver's playback status
    Status,
    VolumeUp(u8),
    VolumeDown(u8),
    /// Absolute volume, 0-100
    SetVolume(u8),
    /// Mute (true) or unmute (false)
    Mute(bool),
    FastForward(u32),
    Rewind(u32),
    /// Jump to an absolute position in seconds
    Seek(u32),
    Skip,
}

impl Request {
    /// Short name used in logs and error records
    pub fn action(&self) -> &'static str {
        match self {
            Request::Cast { .. } => "cast",
            Request::CastSite { .. } => "cast_site",
            Request::CastFile { .. } => "cast_file",
            Request::Enqueue { .. } => "add",
            Request::Pause => "pause",
            Request::Resume => "play",
            Request::Stop => "stop",
            Request::StopAll { .. } => "stop_all",
            Request::Status => "status",
            Request::VolumeUp(_) => "volumeup",
            Request::VolumeDown(_) => "volumedown",
            Request::SetVolume(_) => "volume",
            Request::Mute(_) => "volumemute",
            Request::FastForward(_) => "ffwd",
            Request::Rewind(_) => "rewind",
            Request::Seek(_) => "seek",
            Request::Skip => "skip",
        }
    }

    /// Target device and media label of a cast request
    fn cast_parts(&self) -> Option<(&Device, String)> {
        match self {
            Request::Cast { device, url } | Request::CastSite { device, url } => {
                Some((device, url.trim().to_string()))
            }
            Request::CastFile { device, path } => Some((device, path.display().to_string())),
            _ => None,
        }
    }
}

/// Ordered catt invocations for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub request: Request,
    pub steps: Vec<Vec<String>>,
    pub timeout: Duration,
}

impl Plan {
    /// A cast that first stops the session it replaces
    pub fn stops_previous(&self) -> bool {
        self.request.cast_parts().is_some() && self.steps.len() > 1
    }
}

/// What `prepare` decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Run these commands
    Run(Plan),
    /// Nothing to do; informational message for the user
    Noop(String),
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The session moved to (or stayed in) `state`
    Applied { state: SessionState, message: String },
    /// No-op; not an error
    Info(String),
    /// Fresh receiver status
    Status(PlaybackStatus),
}

impl Outcome {
    pub fn message(&self) -> String {
        match self {
            Outcome::Applied { message, .. } => message.clone(),
            Outcome::Info(message) => message.clone(),
            Outcome::Status(status) => status.to_string(),
        }
    }
}

/// What running a plan produced
#[derive(Debug, Default)]
pub struct Execution {
    /// Output of the last step
    pub output: ToolOutput,
    /// Process left serving a local file
    pub server: Option<LocalServer>,
}

impl From<ToolOutput> for Execution {
    fn from(output: ToolOutput) -> Self {
        Self {
            output,
            server: None,
        }
    }
}

/// catt subcommand of one step, for error records
fn step_action<'a>(args: &'a [String], fallback: &'a str) -> &'a str {
    match args {
        [flag, _, subcommand, ..] if flag == "-d" => subcommand.as_str(),
        _ => fallback,
    }
}

/// Run every step of `plan`, stopping at the first failure
///
/// A non-zero exit becomes `CommandFailed` carrying stderr verbatim and the
/// subcommand of the step that failed. The cast step of a local file plan is
/// left running once it outlives [`LOCAL_CAST_GRACE`].
pub async fn execute(runner: &dyn ToolRunner, plan: &Plan) -> Result<Execution, CastError> {
    let serve_last = matches!(plan.request, Request::CastFile { .. });
    let mut last = Execution::default();

    for (i, args) in plan.steps.iter().enumerate() {
        let action = step_action(args, plan.request.action());

        if serve_last && i + 1 == plan.steps.len() {
            let served = runner
                .serve(args, LOCAL_CAST_GRACE)
                .await
                .map_err(|e| CastError::from_tool(action, e))?;
            match served {
                Served::Running(server) => {
                    last = Execution {
                        output: ToolOutput::success(""),
                        server: Some(server),
                    };
                }
                Served::Exited(output) => {
                    let message = if output.is_success() && output.stderr.trim().is_empty() {
                        "catt exited before the file could be served".to_string()
                    } else {
                        output.error_message()
                    };
                    return Err(CastError::CommandFailed {
                        action: action.to_string(),
                        message,
                    });
                }
            }
            continue;
        }

        let output = runner
            .run(args, plan.timeout)
            .await
            .map_err(|e| CastError::from_tool(action, e))?;
        if !output.is_success() {
            return Err(CastError::CommandFailed {
                action: action.to_string(),
                message: output.error_message(),
            });
        }
        last = output.into();
    }

    Ok(last)
}

// =============================================================================
// Controller
// =============================================================================

/// Tracks the target device and the current cast session
pub struct CastController {
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
    target: Option<Device>,
    session: Option<CastSession>,
    status: Option<PlaybackStatus>,
    server: Option<LocalServer>,
}

impl CastController {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self::with_timeout(runner, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(runner: Arc<dyn ToolRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            target: None,
            session: None,
            status: None,
            server: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn runner(&self) -> Arc<dyn ToolRunner> {
        Arc::clone(&self.runner)
    }

    /// Currently selected device
    pub fn target(&self) -> Option<&Device> {
        self.target.as_ref()
    }

    pub fn session(&self) -> Option<&CastSession> {
        self.session.as_ref()
    }

    /// Idle when there is no session
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.last_error.as_deref())
    }

    /// Last status reported by the receiver
    pub fn status(&self) -> Option<&PlaybackStatus> {
        self.status.as_ref()
    }

    /// True while a local file is being streamed from this machine
    pub fn is_serving(&self) -> bool {
        self.server.is_some()
    }

    // -------------------------------------------------------------------------
    // Target selection
    // -------------------------------------------------------------------------

    /// Select a device for casting
    pub fn select(&mut self, device: Device) {
        if self.target.as_ref() != Some(&device) {
            tracing::debug!(device = %device, "target selected");
            self.status = None;
        }
        self.target = Some(device);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.status = None;
    }

    /// Drop the target if a fresh scan no longer lists it
    ///
    /// Returns true when the target was cleared.
    pub fn retain_target(&mut self, devices: &[Device]) -> bool {
        let gone = self
            .target
            .as_ref()
            .is_some_and(|t| !devices.iter().any(|d| d.identifier == t.identifier));
        if gone {
            tracing::info!("selected device disappeared from scan");
            self.clear_target();
        }
        gone
    }

    /// Kill the local file server, if one is running
    pub fn release_server(&mut self) {
        if let Some(server) = self.server.take() {
            tracing::info!(pid = ?server.id(), "stopping local file server");
            server.kill();
        }
    }

    // -------------------------------------------------------------------------
    // State machine
    // -------------------------------------------------------------------------

    fn plan(&self, request: Request, steps: Vec<Vec<String>>) -> Prepared {
        Prepared::Run(Plan {
            request,
            steps,
            timeout: self.timeout,
        })
    }

    /// Device of the session when it is Playing or Paused
    fn active_device(&self) -> Option<&Device> {
        self.session
            .as_ref()
            .filter(|s| s.state.is_active())
            .map(|s| &s.device)
    }

    /// Device a new cast has to stop first
    ///
    /// A session in Error may still be playing on its receiver, so only
    /// Idle and Stopped sessions are skipped.
    fn replaced_device(&self) -> Option<&Device> {
        self.session
            .as_ref()
            .filter(|s| !matches!(s.state, SessionState::Idle | SessionState::Stopped))
            .map(|s| &s.device)
    }

    /// Steps of a cast: stop the replaced session, then cast
    fn cast_steps(&self, device: &Device, subcommand: &str, media: &str) -> Vec<Vec<String>> {
        let mut steps = Vec::new();
        if let Some(previous) = self.replaced_device() {
            steps.push(device_args(previous, "stop", &[]));
        }
        steps.push(device_args(device, subcommand, &[media]));
        steps
    }

    /// Validate `request` and build its plan without touching any state
    pub fn prepare(&self, request: Request) -> Result<Prepared, CastError> {
        match request.clone() {
            Request::Cast { device, url } | Request::CastSite { device, url } => {
                let url = validate_url(&url)?;
                let steps = self.cast_steps(&device, request.action(), url);
                Ok(self.plan(request, steps))
            }
            Request::CastFile { device, path } => {
                let path = validate_file(&path)?;
                let steps = self.cast_steps(&device, "cast", path);
                Ok(self.plan(request, steps))
            }
            Request::Enqueue { url } => {
                let url = validate_url(&url)?;
                match self.active_device() {
                    Some(device) => {
                        let steps = vec![device_args(device, "add", &[url])];
                        Ok(self.plan(request, steps))
                    }
                    None => Ok(Prepared::Noop("Nothing is casting. Cast something first.".into())),
                }
            }
            Request::Pause => match &self.session {
                Some(s) if s.state == SessionState::Playing => {
                    let steps = vec![device_args(&s.device, "pause", &[])];
                    Ok(self.plan(request, steps))
                }
                _ => Ok(Prepared::Noop("Nothing is playing.".into())),
            },
            Request::Resume => match &self.session {
                Some(s) if s.state == SessionState::Paused => {
                    let steps = vec![device_args(&s.device, "play", &[])];
                    Ok(self.plan(request, steps))
                }
                _ => Ok(Prepared::Noop("Nothing is paused.".into())),
            },
            Request::Stop => match &self.session {
                Some(s) if s.state != SessionState::Idle => {
                    let steps = vec![device_args(&s.device, "stop", &[])];
                    Ok(self.plan(request, steps))
                }
                _ => Ok(Prepared::Noop("Nothing to stop.".into())),
            },
            Request::StopAll { devices } => {
                if devices.is_empty() {
                    return Ok(Prepared::Noop("No devices to stop.".into()));
                }
                let steps = devices
                    .iter()
                    .map(|d| device_args(d, "stop", &[]))
                    .collect();
                Ok(self.plan(request, steps))
            }
            Request::Status => {
                let device = self
                    .session
                    .as_ref()
                    .map(|s| &s.device)
                    .or(self.target.as_ref());
                match device {
                    Some(device) => {
                        let steps = vec![device_args(device, "status", &[])];
                        Ok(self.plan(request, steps))
                    }
                    None => Ok(Prepared::Noop("No device selected.".into())),
                }
            }
            Request::VolumeUp(step) | Request::VolumeDown(step) => {
                let step = step.to_string();
                self.active_plan(request, &[step.as_str()])
            }
            Request::SetVolume(level) => {
                if level > 100 {
                    return Err(CastError::InvalidInput(
                        "Volume must be between 0 and 100.".into(),
                    ));
                }
                let level = level.to_string();
                self.active_plan(request, &[level.as_str()])
            }
            Request::Mute(on) => {
                let flag = if on { "true" } else { "false" };
                self.active_plan(request, &[flag])
            }
            Request::FastForward(secs) | Request::Rewind(secs) | Request::Seek(secs) => {
                let secs = secs.to_string();
                self.active_plan(request, &[secs.as_str()])
            }
            Request::Skip => self.active_plan(request, &[]),
        }
    }

    /// Plan a single command against the active session's device
    fn active_plan(&self, request: Request, extra: &[&str]) -> Result<Prepared, CastError> {
        match self.active_device() {
            Some(device) => {
                let steps = vec![device_args(device, request.action(), extra)];
                Ok(self.plan(request, steps))
            }
            None => Ok(Prepared::Noop("Nothing is casting.".into())),
        }
    }

    /// Apply the confirmed result of running `plan`
    pub fn complete(
        &mut self,
        plan: &Plan,
        result: Result<Execution, CastError>,
    ) -> Result<Outcome, CastError> {
        let Execution { output, server } = match result {
            Ok(execution) => execution,
            Err(err) if plan.request == Request::Status => {
                return Ok(self.complete_status(Err(err)));
            }
            Err(err) => {
                self.record_failure(plan, &err);
                return Err(err);
            }
        };

        let outcome = match &plan.request {
            Request::Cast { device, .. } | Request::CastSite { device, .. } => {
                self.release_server();
                self.start_session(&plan.request);
                Outcome::Applied {
                    state: SessionState::Playing,
                    message: format!("Cast sent to {}.", device.name),
                }
            }
            Request::CastFile { device, path } => {
                self.release_server();
                self.server = server;
                self.start_session(&plan.request);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Outcome::Applied {
                    state: SessionState::Playing,
                    message: format!("Serving {} to {}.", name, device.name),
                }
            }
            Request::Pause => self.apply(SessionState::Paused, "Paused."),
            Request::Resume => self.apply(SessionState::Playing, "Playing."),
            Request::Stop => {
                let name = self
                    .session
                    .as_ref()
                    .map(|s| s.device.name.clone())
                    .unwrap_or_default();
                self.status = None;
                self.release_server();
                self.apply(SessionState::Stopped, &format!("Playback stopped on {}.", name))
            }
            Request::StopAll { devices } => {
                self.status = None;
                self.release_server();
                let message = format!("Stopped playback on {} device(s).", devices.len());
                if self.state() != SessionState::Idle {
                    self.apply(SessionState::Stopped, &message)
                } else {
                    Outcome::Info(message)
                }
            }
            Request::Enqueue { .. } => {
                let reply = output.stdout.trim();
                let message = if reply.is_empty() {
                    "Added to queue.".to_string()
                } else {
                    reply.to_string()
                };
                Outcome::Applied {
                    state: self.state(),
                    message,
                }
            }
            Request::SetVolume(level) => {
                if let Some(status) = self.status.as_mut() {
                    status.volume = Some(*level);
                }
                Outcome::Applied {
                    state: self.state(),
                    message: format!("Volume set to {}%.", level),
                }
            }
            Request::Mute(on) => {
                if let Some(status) = self.status.as_mut() {
                    status.muted = *on;
                }
                let message = if *on { "Muted." } else { "Unmuted." };
                Outcome::Applied {
                    state: self.state(),
                    message: message.to_string(),
                }
            }
            Request::Seek(secs) => Outcome::Applied {
                state: self.state(),
                message: format!(
                    "Seeked to {}.",
                    format_duration(Duration::from_secs(u64::from(*secs)))
                ),
            },
            Request::VolumeUp(_)
            | Request::VolumeDown(_)
            | Request::FastForward(_)
            | Request::Rewind(_)
            | Request::Skip => Outcome::Applied {
                state: self.state(),
                message: format!("{} sent.", plan.request.action()),
            },
            Request::Status => self.complete_status(Ok(output)),
        };

        Ok(outcome)
    }

    /// Replace the session with a Playing one for the cast in `request`
    fn start_session(&mut self, request: &Request) {
        let Some((device, media)) = request.cast_parts() else {
            return;
        };
        let mut session = CastSession::new(device.clone(), media);
        session.transition(SessionState::Playing);
        tracing::info!(session = %session.id, device = %device, media = %session.media_url, "cast started");
        self.target = Some(device.clone());
        self.session = Some(session);
        self.status = None;
    }

    fn apply(&mut self, state: SessionState, message: &str) -> Outcome {
        if let Some(session) = self.session.as_mut() {
            tracing::info!(session = %session.id, from = ?session.state, to = ?state, "session transition");
            session.transition(state);
        }
        Outcome::Applied {
            state,
            message: message.to_string(),
        }
    }

    fn record_failure(&mut self, plan: &Plan, err: &CastError) {
        tracing::warn!(action = plan.request.action(), error = %err, "command failed");

        let Some((device, media)) = plan.request.cast_parts() else {
            if let Some(session) = self.session.as_mut() {
                session.fail(err.to_string());
            }
            return;
        };

        // The replaced session keeps the receiver until its stop succeeds
        if plan.stops_previous() && failed_before_cast(err) {
            if let Some(session) = self.session.as_mut() {
                tracing::info!(session = %session.id, device = %session.device, "stop before cast failed, session kept");
                session.fail(err.to_string());
            }
            return;
        }

        self.release_server();
        let mut session = CastSession::new(device.clone(), media);
        session.fail(err.to_string());
        self.session = Some(session);
        self.target = Some(device.clone());
    }

    fn complete_status(&mut self, result: Result<ToolOutput, CastError>) -> Outcome {
        match result {
            Ok(output) => {
                let status = parse_status(&output.stdout);
                self.status = Some(status.clone());
                Outcome::Status(status)
            }
            Err(CastError::CommandFailed { message, .. }) if is_idle_status_error(&message) => {
                let status = PlaybackStatus::idle();
                self.status = Some(status.clone());
                Outcome::Status(status)
            }
            Err(err) => Outcome::Info(format!("Status unavailable: {}", err)),
        }
    }

    /// Acknowledge a stop: Stopped becomes Idle
    ///
    /// Returns true when a stopped session was released.
    pub fn acknowledge(&mut self) -> bool {
        if self.state() == SessionState::Stopped {
            self.session = None;
            true
        } else {
            false
        }
    }

    // -------------------------------------------------------------------------
    // Direct (awaiting) operations
    // -------------------------------------------------------------------------

    /// Prepare, execute and complete `request` in the calling task
    pub async fn run(&mut self, request: Request) -> Result<Outcome, CastError> {
        let plan = match self.prepare(request)? {
            Prepared::Run(plan) => plan,
            Prepared::Noop(message) => return Ok(Outcome::Info(message)),
        };
        let result = execute(self.runner.as_ref(), &plan).await;
        self.complete(&plan, result)
    }

    pub async fn start_cast(&mut self, device: Device, url: &str) -> Result<Outcome, CastError> {
        self.run(Request::Cast {
            device,
            url: url.to_string(),
        })
        .await
    }

    pub async fn cast_file(&mut self, device: Device, path: &Path) -> Result<Outcome, CastError> {
        self.run(Request::CastFile {
            device,
            path: path.to_path_buf(),
        })
        .await
    }

    pub async fn pause(&mut self) -> Result<Outcome, CastError> {
        self.run(Request::Pause).await
    }

    pub async fn resume(&mut self) -> Result<Outcome, CastError> {
        self.run(Request::Resume).await
    }

    pub async fn stop(&mut self) -> Result<Outcome, CastError> {
        self.run(Request::Stop).await
    }

    pub async fn stop_all(&mut self, devices: &[Device]) -> Result<Outcome, CastError> {
        self.run(Request::StopAll {
            devices: devices.to_vec(),
        })
        .await
    }

    pub async fn refresh_status(&mut self) -> Result<Outcome, CastError> {
        self.run(Request::Status).await
    }
}

/// The failure came from the stop step, before the new cast was sent
fn failed_before_cast(err: &CastError) -> bool {
    match err {
        CastError::ToolNotFound(_) => true,
        CastError::CommandFailed { action, .. } => action == "stop",
        _ => false,
    }
}

/// Reject empty or whitespace-containing URLs before anything is spawned
fn validate_url(url: &str) -> Result<&str, CastError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CastError::InvalidInput("Enter a URL or file path.".into()));
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CastError::InvalidInput(format!("Not a valid URL: {}", url)));
    }
    Ok(url)
}

/// Local files may contain spaces but must exist and be valid UTF-8
fn validate_file(path: &Path) -> Result<&str, CastError> {
    if !path.is_file() {
        return Err(CastError::InvalidInput(format!(
            "No such file: {}",
            path.display()
        )));
    }
    path.to_str().ok_or_else(|| {
        CastError::InvalidInput(format!("Unsupported file name: {}", path.display()))
    })
}
