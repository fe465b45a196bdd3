//! # Telemetry Module
//!
//! Handles telemetry capture into CSV session files.
//!
//! This module handles:
//! - Decoding and validating `DATA,` lines from the logger board
//! - Creating one timestamped CSV file per session
//! - Running the capture loop with periodic flushes
//! - Reporting throughput and the final row count

pub mod capture;
pub mod record;
pub mod report;
pub mod session;
