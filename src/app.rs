//! App state and core application logic
//!
//! The app owns the device registry, the cast controller and the background
//! dispatcher. It holds no truth of its own beyond what the user is typing:
//! the device list, target, session state and banner are all read from those
//! components when rendering.

use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Settings;
use crate::error::CastError;
use crate::models::{Device, SessionState};
use crate::paths::{complete_path, local_file};
use crate::registry::DeviceRegistry;
use crate::schedule::StatusSchedule;
use crate::session::{CastController, Execution, Outcome, Plan, Prepared, Request};
use crate::tool::{parse_clock, ToolRunner};
use crate::worker::{Dispatcher, JobKind, JobResult, ScanSubmission};

// =============================================================================
// Input Mode
// =============================================================================

/// Current input mode for keyboard handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (URL box focused)
    Editing,
    /// Typing a number for an absolute control
    Prompt(PromptKind),
}

/// What the number prompt sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Volume,
    Seek,
}

impl PromptKind {
    /// Status bar badge
    pub fn label(&self) -> &'static str {
        match self {
            PromptKind::Volume => "VOLUME",
            PromptKind::Seek => "SEEK",
        }
    }

    /// Input box title
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::Volume => "VOLUME (0-100)",
            PromptKind::Seek => "SEEK TO (seconds or H:MM:SS)",
        }
    }

    /// Turn the typed text into a request
    pub fn parse(&self, text: &str) -> Result<Request, CastError> {
        let text = text.trim();
        match self {
            PromptKind::Volume => text
                .parse::<u8>()
                .ok()
                .filter(|level| *level <= 100)
                .map(Request::SetVolume)
                .ok_or_else(|| CastError::InvalidInput("Volume must be between 0 and 100.".into())),
            PromptKind::Seek => text
                .parse::<u32>()
                .ok()
                .or_else(|| parse_clock(text).and_then(|d| u32::try_from(d.as_secs()).ok()))
                .map(Request::Seek)
                .ok_or_else(|| {
                    CastError::InvalidInput("Enter a position as seconds or H:MM:SS.".into())
                }),
        }
    }
}

// =============================================================================
// Selection State
// =============================================================================

/// Selection state for the device list
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Move selection up
    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move selection down
    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    /// Jump to first item
    pub fn first(&mut self) {
        self.selected = 0;
    }

    /// Jump to last item
    pub fn last(&mut self) {
        if self.len > 0 {
            self.selected = self.len - 1;
        }
    }

    /// Update length (e.g., when a scan comes back)
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        // Clamp selected to valid range
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

// =============================================================================
// URL Input
// =============================================================================

/// Media URL text box
///
/// `cursor` counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct UrlInput {
    pub text: String,
    pub cursor: usize,
}

impl UrlInput {
    fn byte_index(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Text before and after the cursor
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.text.split_at(self.byte_index(self.cursor))
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Insert character at cursor
    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    /// Insert pasted text at cursor, dropping line breaks
    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars().filter(|c| *c != '\n' && *c != '\r') {
            self.insert(c);
        }
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    /// Delete character at cursor
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Replace the whole text, cursor at the end
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.char_len();
    }
}

// =============================================================================
// Banner
// =============================================================================

/// Error banner: classification label plus the tool's raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub label: &'static str,
    pub message: String,
    /// Survives key presses (tool not found)
    pub persistent: bool,
}

impl From<&CastError> for Banner {
    fn from(err: &CastError) -> Self {
        Self {
            label: err.label(),
            message: err.to_string(),
            persistent: err.is_persistent(),
        }
    }
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
pub struct App {
    /// Whether the app is running
    pub running: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// URL being edited
    pub url: UrlInput,
    /// Number typed into the volume/seek prompt
    pub prompt: UrlInput,
    /// Cursor in the device list
    pub devices: ListState,
    /// Last informational message for the status bar
    pub message: Option<String>,
    /// Error banner
    pub banner: Option<Banner>,

    settings: Settings,
    registry: DeviceRegistry,
    controller: CastController,
    dispatcher: Dispatcher,
    schedule: StatusSchedule,
    /// A stop result is on screen and waits for the user to move on
    stop_unacknowledged: bool,
}

impl App {
    /// Create a new App driving `runner`
    pub fn new(runner: Arc<dyn ToolRunner>, settings: Settings) -> Self {
        let registry = DeviceRegistry::with_timeout(Arc::clone(&runner), settings.scan_timeout);
        let controller = CastController::with_timeout(Arc::clone(&runner), settings.command_timeout);
        let dispatcher = Dispatcher::new(runner, settings.scan_timeout);
        let schedule = StatusSchedule::new(settings.status_interval);

        Self {
            running: true,
            input_mode: InputMode::Normal,
            url: UrlInput::default(),
            prompt: UrlInput::default(),
            devices: ListState::default(),
            message: None,
            banner: None,
            settings,
            registry,
            controller,
            dispatcher,
            schedule,
            stop_unacknowledged: false,
        }
    }

    // -------------------------------------------------------------------------
    // Projections for rendering
    // -------------------------------------------------------------------------

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &CastController {
        &self.controller
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn schedule(&self) -> &StatusSchedule {
        &self.schedule
    }

    /// True while a background operation runs; controls are disabled
    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    pub fn in_flight(&self) -> Option<JobKind> {
        self.dispatcher.in_flight()
    }

    /// Spinner text for the in-flight operation
    pub fn busy_label(&self) -> Option<&'static str> {
        match self.in_flight()? {
            JobKind::Scan => Some("Scanning for devices..."),
            JobKind::Command => Some("Waiting for catt..."),
            JobKind::Poll => Some("Checking device status..."),
        }
    }

    /// Device under the list cursor
    pub fn highlighted_device(&self) -> Option<&Device> {
        self.registry.get(self.devices.selected)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Check the tool and run the initial scan
    pub fn startup(&mut self) {
        let runner = self.registry.runner();
        if !runner.is_available() {
            tracing::warn!(program = runner.program(), "casting tool not available");
            let err = CastError::ToolNotFound(format!(
                "'{}' command not found. Is it installed and in your PATH?",
                runner.program()
            ));
            self.show_error(&err);
            return;
        }
        if self.settings.scan_on_start {
            self.scan();
        }
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Kill whatever is still running, local file server included
    pub fn shutdown(&mut self) {
        self.dispatcher.cancel();
        self.controller.release_server();
    }

    fn show_error(&mut self, err: &CastError) {
        self.banner = Some(Banner::from(err));
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    /// Release a Stopped session once its result has been seen
    fn acknowledge(&mut self) {
        if std::mem::take(&mut self.stop_unacknowledged) && self.controller.acknowledge() {
            tracing::debug!("stopped session acknowledged");
        }
    }

    // -------------------------------------------------------------------------
    // User actions
    // -------------------------------------------------------------------------

    /// Refresh the device list
    pub fn scan(&mut self) {
        match self.dispatcher.submit_scan() {
            ScanSubmission::Started => self.info("Scanning for devices..."),
            ScanSubmission::Coalesced => self.info("Scan already running."),
            ScanSubmission::Queued => self.info("Scan queued."),
        }
    }

    /// Make the highlighted device the cast target and ask what it is doing
    pub fn select_highlighted(&mut self) {
        if let Some(device) = self.highlighted_device().cloned() {
            self.info(format!("Selected {}. Checking device status...", device.name));
            self.controller.select(device);
            self.schedule.check_now(Instant::now());
        }
    }

    /// Send `request` to the background worker
    pub fn submit(&mut self, request: Request) {
        let prepared = match self.controller.prepare(request) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.show_error(&err);
                return;
            }
        };

        match prepared {
            Prepared::Noop(msg) => self.info(msg),
            Prepared::Run(plan) => {
                let action = plan.request.action();
                match self.dispatcher.submit_command(plan) {
                    Ok(()) => tracing::debug!(action, "command dispatched"),
                    Err(err) => self.show_error(&err),
                }
            }
        }
    }

    fn cast_request(&mut self, site: bool) {
        let Some(device) = self.controller.target().cloned() else {
            self.show_error(&CastError::InvalidInput("Select a device first.".into()));
            return;
        };
        let url = self.url.text.clone();
        let request = match local_file(&url) {
            Some(path) if !site => Request::CastFile { device, path },
            _ if site => Request::CastSite { device, url },
            _ => Request::Cast { device, url },
        };
        self.submit(request);
    }

    /// Cast the URL box (a URL or a local file) to the target device
    pub fn cast(&mut self) {
        self.cast_request(false);
    }

    /// Cast the URL box as a web page
    pub fn cast_site(&mut self) {
        self.cast_request(true);
    }

    /// Queue the URL box after the current media
    pub fn enqueue(&mut self) {
        let url = self.url.text.clone();
        self.submit(Request::Enqueue { url });
    }

    /// Pause when playing, resume when paused
    pub fn toggle_pause(&mut self) {
        match self.controller.state() {
            SessionState::Paused => self.submit(Request::Resume),
            _ => self.submit(Request::Pause),
        }
    }

    pub fn stop(&mut self) {
        self.submit(Request::Stop);
    }

    /// Stop every known device
    pub fn stop_all(&mut self) {
        let devices = self.registry.devices().to_vec();
        self.submit(Request::StopAll { devices });
    }

    pub fn refresh_status(&mut self) {
        self.submit(Request::Status);
    }

    /// Flip mute based on the last reported status
    pub fn toggle_mute(&mut self) {
        let muted = self.controller.status().is_some_and(|s| s.muted);
        self.submit(Request::Mute(!muted));
    }

    /// Open the number prompt for an absolute volume or position
    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt.clear();
        self.input_mode = InputMode::Prompt(kind);
    }

    fn submit_prompt(&mut self, kind: PromptKind) {
        self.input_mode = InputMode::Normal;
        match kind.parse(&self.prompt.text) {
            Ok(request) => self.submit(request),
            Err(err) => self.show_error(&err),
        }
    }

    /// Complete a local path in the URL box
    pub fn complete_url_path(&mut self) {
        match complete_path(&self.url.text) {
            Some(text) => self.url.set(text),
            None => self.info("No matching file."),
        }
    }

    /// Pasted text goes to whichever box has focus
    pub fn paste(&mut self, text: &str) {
        match self.input_mode {
            InputMode::Editing => self.url.insert_str(text),
            InputMode::Prompt(_) => self.prompt.insert_str(text),
            InputMode::Normal => {}
        }
    }

    // -------------------------------------------------------------------------
    // Status polling
    // -------------------------------------------------------------------------

    /// Send a scheduled status check when one is due and the worker is idle
    ///
    /// Called from the event loop on every tick. Returns true if a check was
    /// sent.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.is_busy() || !self.schedule.take_due(now) {
            return false;
        }
        match self.controller.prepare(Request::Status) {
            Ok(Prepared::Run(plan)) => self.dispatcher.submit_poll(plan),
            _ => {
                self.schedule.clear();
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Background results
    // -------------------------------------------------------------------------

    /// Apply every finished background job; returns true if any arrived
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(result) = self.dispatcher.try_next() {
            self.on_result(result);
            changed = true;
        }
        changed
    }

    /// Wait for the in-flight job and apply it
    ///
    /// Returns false when nothing was running.
    pub async fn settle(&mut self) -> bool {
        match self.dispatcher.next().await {
            Some(result) => {
                self.on_result(result);
                true
            }
            None => false,
        }
    }

    /// Apply one finished job
    pub fn on_result(&mut self, result: JobResult) {
        match result {
            JobResult::Scan(result) => self.on_scan(result),
            JobResult::Command { plan, result } => self.on_command(&plan, result),
            JobResult::Poll { plan, result } => match self.controller.complete(&plan, result) {
                Ok(Outcome::Status(status)) => self.schedule.on_status(Instant::now(), &status),
                Ok(other) => tracing::debug!(message = %other.message(), "status poll"),
                Err(err) => tracing::debug!(error = %err, "status poll failed"),
            },
        }
    }

    fn on_command(&mut self, plan: &Plan, result: Result<Execution, CastError>) {
        let outcome = match self.controller.complete(plan, result) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.show_error(&err);
                return;
            }
        };

        match &outcome {
            Outcome::Applied {
                state: SessionState::Stopped,
                ..
            } => {
                self.stop_unacknowledged = true;
                self.schedule.clear();
            }
            Outcome::Applied { .. } => self.schedule.after_action(Instant::now()),
            Outcome::Status(status) => self.schedule.on_status(Instant::now(), status),
            Outcome::Info(_) => {}
        }
        if matches!(outcome, Outcome::Applied { .. }) {
            self.clear_resolved_banner();
        }
        self.info(outcome.message());
    }

    fn on_scan(&mut self, result: Result<Vec<Device>, CastError>) {
        let report = self.registry.apply(result);
        self.devices.set_len(report.devices.len());

        if let Some(err) = &report.failure {
            self.controller.retain_target(&report.devices);
            self.show_error(err);
            return;
        }

        self.clear_resolved_banner();
        if self.controller.retain_target(&report.devices) {
            self.info("Selected device is gone.");
        } else {
            self.info(format!("Found {} device(s).", report.devices.len()));
        }

        if self.controller.target().is_none() {
            self.select_default_device();
        }
        if let Some(pos) = self
            .controller
            .target()
            .and_then(|t| self.registry.position(t))
        {
            self.devices.selected = pos;
        }
    }

    fn select_default_device(&mut self) {
        let Some(key) = self.settings.default_device.as_deref() else {
            return;
        };
        if let Some(device) = self.registry.find(key).cloned() {
            tracing::info!(device = %device, "default device selected");
            self.controller.select(device);
        }
    }

    /// The tool evidently works again
    fn clear_resolved_banner(&mut self) {
        if self.banner.as_ref().is_some_and(|b| b.persistent) {
            self.banner = None;
        }
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Clear transient errors on any keypress
        if self.banner.as_ref().is_some_and(|b| !b.persistent) {
            self.banner = None;
        }
        self.acknowledge();

        // Global quit shortcut
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        match self.input_mode {
            InputMode::Editing => self.handle_editing_key(key),
            InputMode::Prompt(kind) => self.handle_prompt_key(kind, key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    /// Handle keys while the number prompt is open
    fn handle_prompt_key(&mut self, kind: PromptKind, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Enter => self.submit_prompt(kind),
            KeyCode::Char(c) if c.is_ascii_digit() || c == ':' => self.prompt.insert(c),
            KeyCode::Backspace => self.prompt.backspace(),
            KeyCode::Left => self.prompt.cursor_left(),
            KeyCode::Right => self.prompt.cursor_right(),
            _ => return false,
        }
        true
    }

    /// Handle keys in editing (text input) mode
    fn handle_editing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                true
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.cast();
                true
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.url.clear();
                true
            }
            KeyCode::Tab => {
                self.complete_url_path();
                true
            }
            KeyCode::Char(c) => {
                self.url.insert(c);
                true
            }
            KeyCode::Backspace => {
                self.url.backspace();
                true
            }
            KeyCode::Delete => {
                self.url.delete();
                true
            }
            KeyCode::Left => {
                self.url.cursor_left();
                true
            }
            KeyCode::Right => {
                self.url.cursor_right();
                true
            }
            KeyCode::Home => {
                self.url.cursor_home();
                true
            }
            KeyCode::End => {
                self.url.cursor_end();
                true
            }
            _ => false,
        }
    }

    /// Handle keys in normal navigation mode
    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        let volume = self.settings.volume_step;
        let seek = self.settings.seek_step_secs;

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('u') | KeyCode::Char('/') => self.input_mode = InputMode::Editing,
            KeyCode::Up | KeyCode::Char('k') => self.devices.up(),
            KeyCode::Down | KeyCode::Char('j') => self.devices.down(),
            KeyCode::Home | KeyCode::Char('g') => self.devices.first(),
            KeyCode::End | KeyCode::Char('G') => self.devices.last(),
            KeyCode::Enter => self.select_highlighted(),
            KeyCode::Char('r') => self.scan(),
            KeyCode::Char('c') => self.cast(),
            KeyCode::Char('w') => self.cast_site(),
            KeyCode::Char('e') => self.enqueue(),
            KeyCode::Char(' ') | KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('s') => self.stop(),
            KeyCode::Char('S') => self.stop_all(),
            KeyCode::Char('i') => self.refresh_status(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.submit(Request::VolumeUp(volume)),
            KeyCode::Char('-') => self.submit(Request::VolumeDown(volume)),
            KeyCode::Char('v') => self.open_prompt(PromptKind::Volume),
            KeyCode::Char('m') => self.toggle_mute(),
            KeyCode::Right => self.submit(Request::FastForward(seek)),
            KeyCode::Left => self.submit(Request::Rewind(seek)),
            KeyCode::Char('t') => self.open_prompt(PromptKind::Seek),
            KeyCode::Char('n') => self.submit(Request::Skip),
            KeyCode::Esc => self.message = None,
            _ => return false,
        }
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
