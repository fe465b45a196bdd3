//! # Capture Session Runner
//!
//! Drives one capture run from start to finish: output directory, port
//! resolution, connection, session file, capture loop. Hardware access comes
//! in through closures so every phase can run against mocks.

use chrono::Local;
use std::future::Future;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{CaptureError, Result};
use crate::serial::port_trait::LineSource;
use crate::serial::selection::{choose_port, ChoiceSource, PortSelector};
use crate::telemetry::capture::{CaptureLoop, CaptureSettings, CaptureStats};
use crate::telemetry::report::Reporter;
use crate::telemetry::session::{ensure_output_dir, SessionWriter};

/// Exit status when no serial port was found
pub const EXIT_NO_PORTS: u8 = 2;

/// Exit status when the selected port could not be opened
pub const EXIT_CONNECT_FAILED: u8 = 3;

/// How a capture run ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Shutdown was requested and the session file closed
    Completed(CaptureStats),
    /// Discovery found no openable port
    NoPorts,
    /// The chosen port could not be opened
    ConnectFailed(String),
}

impl Disposition {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Disposition::Completed(_) => 0,
            Disposition::NoPorts => EXIT_NO_PORTS,
            Disposition::ConnectFailed(_) => EXIT_CONNECT_FAILED,
        }
    }
}

/// Run one capture session until `shutdown` resolves
///
/// No session file is created unless a port was chosen and opened.
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `discover` - Port discovery, skipped when `serial.port` is set
/// * `selector` - Consulted when discovery finds several ports
/// * `open` - Opens the chosen port as a line source
/// * `reporter` - Receives setup messages, progress and the summary
/// * `shutdown` - Resolves when the capture should stop
///
/// # Errors
///
/// Returns error on unsupported platforms, failed selection, output
/// directory or session file failures, and capture loop failures
pub async fn run_session<D, S, O, L, R, F>(
    config: &Config,
    discover: D,
    selector: &mut S,
    open: O,
    mut reporter: R,
    shutdown: F,
) -> Result<Disposition>
where
    D: FnOnce() -> Result<Vec<String>>,
    S: PortSelector + ?Sized,
    O: FnOnce(&str) -> Result<L>,
    L: LineSource,
    R: Reporter,
    F: Future<Output = ()>,
{
    let output_dir = ensure_output_dir(&config.capture.output_path())?;

    if config.serial.port.is_none() {
        reporter.status("🔍 Scanning ports...");
    }
    let choice = match choose_port(config.serial.port.as_deref(), discover, selector) {
        Ok(choice) => choice,
        Err(CaptureError::NoPortsFound) => {
            error!("No ports found");
            reporter.status("❌ No ports found.");
            return Ok(Disposition::NoPorts);
        }
        Err(e) => return Err(e),
    };
    if choice.source == ChoiceSource::AutoSelected {
        reporter.status(&format!("✅ Auto-selected: {}", choice.port));
    }

    let mut source = match open(&choice.port) {
        Ok(source) => source,
        Err(e) => {
            error!("Connection to {} failed: {}", choice.port, e);
            reporter.status(&format!("❌ Connection Failed: {}", e));
            return Ok(Disposition::ConnectFailed(e.to_string()));
        }
    };
    reporter.status(&format!(
        "🔌 Connected to {} @ {}",
        choice.port, config.serial.baud_rate
    ));

    let session = SessionWriter::create(&output_dir, &config.capture.file_prefix, &Local::now())?;
    if let Some(path) = session.path() {
        reporter.status(&format!("\n📝 Logging to: {}", path.display()));
    }
    reporter.status("❌ Press Ctrl+C to stop.\n");

    let capture = CaptureLoop::new(session, reporter, CaptureSettings::from(config));
    let stats = capture.run(&mut source, shutdown).await?;
    drop(source);
    info!("Serial port {} closed, {} rows saved", choice.port, stats.rows);

    Ok(Disposition::Completed(stats))
}
