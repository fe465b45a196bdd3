//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock capture setup: auto-detected port at 921600 baud, 1 s read
//! timeout, sessions written under `data/raw`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CaptureError, Result};
use crate::serial::{DEFAULT_READ_TIMEOUT, TELEMETRY_BAUD_RATE};
use crate::telemetry::record::ArityPolicy;

/// Baud rates accepted by `serial.baud_rate`
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600, 1_000_000, 2_000_000,
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Static port override; skips discovery when set
    #[serde(default)]
    pub port: Option<String>,

    /// Pre-supplied selection index used instead of the interactive prompt
    #[serde(default)]
    pub port_index: Option<usize>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sleep between empty polls, 0 = busy poll
    #[serde(default = "default_idle_sleep_us")]
    pub idle_sleep_us: u64,
}

/// Capture session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_flush_every")]
    pub flush_every: u64,

    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default)]
    pub arity: ArityPolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files, stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_baud_rate() -> u32 { TELEMETRY_BAUD_RATE }
fn default_timeout_ms() -> u64 { DEFAULT_READ_TIMEOUT.as_millis() as u64 }
fn default_idle_sleep_us() -> u64 { 200 }

fn default_output_dir() -> String { "data/raw".to_string() }
fn default_file_prefix() -> String { "walk_data".to_string() }
fn default_flush_every() -> u64 { 100 }
fn default_preview_chars() -> usize { 40 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            port_index: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            idle_sleep_us: default_idle_sleep_us(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            flush_every: default_flush_every(),
            preview_chars: default_preview_chars(),
            arity: ArityPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Idle poll sleep as a `Duration`
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_micros(self.idle_sleep_us)
    }
}

impl CaptureConfig {
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use walk_capture::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if let Some(port) = &self.serial.port {
            if port.trim().is_empty() {
                return Err(invalid("serial port cannot be empty when set"));
            }
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        // One sample every 10ms at the logger's 100Hz rate
        if self.serial.idle_sleep_us > 10000 {
            return Err(invalid("idle_sleep_us must be at most 10000"));
        }

        if self.capture.output_dir.is_empty() {
            return Err(invalid("capture output_dir cannot be empty"));
        }

        if self.capture.file_prefix.is_empty() {
            return Err(invalid("capture file_prefix cannot be empty"));
        }

        if self.capture.file_prefix.contains(['/', '\\']) {
            return Err(invalid("capture file_prefix cannot contain path separators"));
        }

        if self.capture.flush_every == 0 {
            return Err(invalid("flush_every must be greater than 0"));
        }

        if self.capture.preview_chars == 0 {
            return Err(invalid("preview_chars must be greater than 0"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if let Some(dir) = &self.logging.log_dir {
            if dir.is_empty() {
                return Err(invalid("logging log_dir cannot be empty when set"));
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> CaptureError {
    CaptureError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.port, None);
        assert_eq!(config.serial.baud_rate, 921_600);
        assert_eq!(config.serial.timeout(), Duration::from_secs(1));
        assert_eq!(config.capture.output_path(), PathBuf::from("data/raw"));
        assert_eq!(config.capture.arity, ArityPolicy::PassThrough);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.capture.flush_every, 100);
        assert_eq!(config.capture.preview_chars, 40);
        assert_eq!(config.capture.file_prefix, "walk_data");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
timeout_ms = 500

[capture]
output_dir = "captures"
arity = "truncate"

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.serial.timeout_ms, 500);
        assert_eq!(config.serial.baud_rate, 921_600);
        assert_eq!(config.capture.output_dir, "captures");
        assert_eq!(config.capture.arity, ArityPolicy::Truncate);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/walk-capture.toml");
        assert!(matches!(result, Err(CaptureError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[serial\nport = ");
        assert!(matches!(result, Err(CaptureError::Config(_))));
    }

    #[test]
    fn test_unknown_arity_policy() {
        let result = Config::from_toml("[capture]\narity = \"squash\"\n");
        assert!(matches!(result, Err(CaptureError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = Config::default();
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_idle_sleep_too_high() {
        let mut config = Config::default();
        config.serial.idle_sleep_us = 10001;
        assert!(config.validate().is_err());

        config.serial.idle_sleep_us = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_output_dir() {
        let mut config = Config::default();
        config.capture.output_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_prefix_with_separator() {
        let mut config = Config::default();
        config.capture.file_prefix = "../walk".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flush_every_zero() {
        let mut config = Config::default();
        config.capture.flush_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preview_chars_zero() {
        let mut config = Config::default();
        config.capture.preview_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = Config::default();
        config.logging.log_dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_baud_rate(), 921_600);
        assert_eq!(default_timeout_ms(), 1000);
        assert_eq!(default_idle_sleep_us(), 200);
        assert_eq!(default_output_dir(), "data/raw");
        assert_eq!(default_file_prefix(), "walk_data");
        assert_eq!(default_flush_every(), 100);
        assert_eq!(default_preview_chars(), 40);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_serial_defaults_match_link_constants() {
        let serial = SerialConfig::default();
        assert_eq!(serial.baud_rate, TELEMETRY_BAUD_RATE);
        assert_eq!(serial.timeout(), DEFAULT_READ_TIMEOUT);
    }
}
