//! # Port Discovery
//!
//! Enumerates candidate serial devices for the host platform and keeps the
//! ones that can currently be opened.
//!
//! Probing opens and immediately closes every candidate, so other programs
//! holding one of these devices may briefly see contention.

use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{CaptureError, Result};

/// Number of `COMn` names tried on Windows
pub const WINDOWS_COM_PORTS: usize = 256;

/// Device directory scanned on Unix-like hosts
pub const DEV_DIR: &str = "/dev";

/// Host platform families with a known serial naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `COM1` .. `COM256`
    Windows,
    /// `/dev/tty[A-Za-z]*`
    Linux,
    /// `/dev/tty.*`
    MacOs,
}

impl Platform {
    /// Map an OS identifier (as in `std::env::consts::OS`) to a platform
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` for anything outside the known families
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(Platform::Windows),
            "linux" | "cygwin" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            other => Err(CaptureError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Platform of the running host
    pub fn host() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Whether a `/dev` entry name follows this platform's convention
    fn matches_device_name(&self, name: &str) -> bool {
        match self {
            Platform::Windows => false,
            Platform::Linux => name
                .strip_prefix("tty")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_alphabetic()),
            Platform::MacOs => name.starts_with("tty."),
        }
    }

    /// Candidate port names in enumeration order
    ///
    /// # Arguments
    ///
    /// * `dev_dir` - Device directory to scan (ignored on Windows)
    pub fn candidates(&self, dev_dir: &Path) -> Vec<String> {
        if *self == Platform::Windows {
            return (1..=WINDOWS_COM_PORTS).map(|i| format!("COM{}", i)).collect();
        }

        let entries = match fs::read_dir(dev_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", dev_dir.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| self.matches_device_name(name))
            .collect();
        names.sort();

        names
            .into_iter()
            .map(|name| dev_dir.join(name).to_string_lossy().into_owned())
            .collect()
    }
}

/// Checks whether a port can be opened right now
#[cfg_attr(test, mockall::automock)]
pub trait PortProbe {
    fn probe(&self, port: &str) -> Result<()>;
}

/// Probe that opens the device and closes it again
#[derive(Debug, Clone)]
pub struct SerialProbe {
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl PortProbe for SerialProbe {
    fn probe(&self, port: &str) -> Result<()> {
        let handle = tokio_serial::new(port, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|e| CaptureError::Serial(format!("Failed to open {}: {}", port, e)))?;
        drop(handle);
        Ok(())
    }
}

/// Keep the candidates whose probe succeeds, preserving order
pub fn resolve_ports<P: PortProbe + ?Sized>(candidates: Vec<String>, probe: &P) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|port| match probe.probe(port) {
            Ok(()) => true,
            Err(e) => {
                trace!("Skipping {}: {}", port, e);
                false
            }
        })
        .collect()
}

/// Discover openable serial ports on the running host
///
/// # Errors
///
/// Returns `UnsupportedPlatform` when the host OS is not recognised
pub fn discover_ports<P: PortProbe + ?Sized>(probe: &P) -> Result<Vec<String>> {
    let platform = Platform::host()?;
    let candidates = platform.candidates(Path::new(DEV_DIR));
    debug!("Probing {} candidate ports ({:?})", candidates.len(), platform);
    let ports = resolve_ports(candidates, probe);
    debug!("Found {} openable ports", ports.len());
    Ok(ports)
}
