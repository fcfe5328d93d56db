//! Device registry
//!
//! Holds the devices found by the last scan. A scan result replaces the whole
//! set in one assignment; there is no incremental diffing.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{CastError, ToolError};
use crate::models::Device;
use crate::tool::{parse_scan, scan_args, ToolRunner};

/// Default upper bound for one `catt scan`
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one scan as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Devices now held by the registry (empty on failure)
    pub devices: Vec<Device>,
    /// Set when discovery failed
    pub failure: Option<CastError>,
}

impl ScanReport {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Run `catt scan` once and parse the output
///
/// This is the part that runs on the background worker; it touches no
/// registry state.
pub async fn discover(
    runner: &dyn ToolRunner,
    timeout: Duration,
) -> Result<Vec<Device>, CastError> {
    let output = runner.run(&scan_args(), timeout).await.map_err(|e| match e {
        ToolError::NotFound { .. } | ToolError::NotExecutable { .. } => {
            CastError::ToolNotFound(e.to_string())
        }
        other => CastError::DiscoveryFailure(format!("Device scan failed: {}", other)),
    })?;

    if !output.is_success() {
        return Err(CastError::DiscoveryFailure(output.error_message()));
    }

    let mut devices = parse_scan(&output.stdout);
    if devices.is_empty() {
        // catt sometimes reports on stderr
        devices = parse_scan(&output.stderr);
    }
    Ok(devices)
}

/// Set of currently known castable devices
pub struct DeviceRegistry {
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self::with_timeout(runner, DEFAULT_SCAN_TIMEOUT)
    }

    pub fn with_timeout(runner: Arc<dyn ToolRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            devices: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn runner(&self) -> Arc<dyn ToolRunner> {
        Arc::clone(&self.runner)
    }

    /// Currently known devices, in scan order
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    /// Find a device by identifier or name
    pub fn find(&self, key: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.matches(key))
    }

    pub fn position(&self, device: &Device) -> Option<usize> {
        self.devices
            .iter()
            .position(|d| d.identifier == device.identifier)
    }

    /// Scan in the calling task and apply the result
    pub async fn scan(&mut self) -> ScanReport {
        let result = discover(self.runner.as_ref(), self.timeout).await;
        self.apply(result)
    }

    /// Replace the held set with a finished scan's result
    pub fn apply(&mut self, result: Result<Vec<Device>, CastError>) -> ScanReport {
        match result {
            Ok(devices) => {
                tracing::info!(count = devices.len(), "scan finished");
                self.devices = devices;
                ScanReport {
                    devices: self.devices.clone(),
                    failure: None,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "scan failed");
                self.devices = Vec::new();
                ScanReport {
                    devices: Vec::new(),
                    failure: Some(err),
                }
            }
        }
    }
}
