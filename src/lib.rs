//! # Walk Capture Library
//!
//! Capture GPS and IMU telemetry from a serial-connected logger board.
//!
//! This library provides port discovery, connection setup, line validation
//! and CSV session writing for the `walk-capture` binary.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod serial;
pub mod telemetry;
