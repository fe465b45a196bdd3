//! # Walk Capture
//!
//! Capture GPS and IMU telemetry from a serial-connected logger board into
//! timestamped CSV files.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use walk_capture::app::run_session;
use walk_capture::config::Config;
use walk_capture::logging;
use walk_capture::serial::discovery::{discover_ports, SerialProbe};
use walk_capture::serial::selection::{FixedSelector, InteractiveSelector, PortSelector};
use walk_capture::serial::TelemetrySerial;
use walk_capture::telemetry::report::ConsoleReporter;

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "WALK_CAPTURE_CONFIG";

/// Configuration file used when present and no override is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Walk Capture
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Create the output directory
///
/// 2. **Connection**
///    - Use the configured port, or discover and select one
///    - Open it at 921600 baud and drop stale input
///
/// 3. **Capture**
///    - Create `walk_data_<timestamp>.csv` and write the header
///    - Append validated rows, syncing every 100
///
/// 4. **Graceful Shutdown**
///    - Ctrl+C closes the session file and the port
///    - Print the number of rows saved
///
/// # Exit Status
///
/// - `0` after Ctrl+C
/// - `2` when no serial port was found
/// - `3` when the port could not be opened
/// - `1` on any other error
///
/// # Examples
///
/// ```bash
/// WALK_CAPTURE_CONFIG=config/default.toml cargo run --release
/// ```
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = load_config()?;
    let _log_guard = logging::init(&config.logging);

    info!("Walk Capture v{} starting...", env!("CARGO_PKG_VERSION"));

    let baud_rate = config.serial.baud_rate;
    let timeout = config.serial.timeout();
    let probe = SerialProbe { baud_rate, timeout };
    let mut selector: Box<dyn PortSelector> = match config.serial.port_index {
        Some(idx) => Box::new(FixedSelector(idx)),
        None => Box::new(InteractiveSelector::stdio()),
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let disposition = run_session(
        &config,
        || discover_ports(&probe),
        selector.as_mut(),
        |port: &str| TelemetrySerial::open(port, baud_rate, timeout).map(TelemetrySerial::into_lines),
        ConsoleReporter,
        shutdown,
    )
    .await?;

    Ok(ExitCode::from(disposition.exit_code()))
}

/// Load configuration from `WALK_CAPTURE_CONFIG`, the default path, or defaults
fn load_config() -> Result<Config> {
    let path = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => PathBuf::from(DEFAULT_CONFIG_PATH),
        None => return Ok(Config::default()),
    };
    Config::load(&path).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
}
