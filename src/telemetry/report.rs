//! Progress reporting for the capture loop.

use std::io::{self, Write};
use tracing::info;

use super::capture::CaptureStats;

/// Snapshot passed to a [`Reporter`] after each periodic flush
#[derive(Debug, Clone, PartialEq)]
pub struct Progress<'a> {
    pub rows: u64,
    pub rate_hz: f64,
    /// Leading characters of the line that triggered the flush
    pub preview: &'a str,
}

/// Receives capture progress and the final summary
pub trait Reporter {
    /// One human-readable line about session setup
    fn status(&mut self, message: &str);

    fn progress(&mut self, progress: &Progress<'_>);

    fn finished(&mut self, stats: &CaptureStats);
}

/// Setup messages and a single overwriting status line on stdout
///
/// Structured logs go to stderr, so stdout stays readable whatever the
/// log level.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn format_progress(progress: &Progress<'_>) -> String {
        format!(
            "\r💾 Rows: {} | Rate: {:.1} Hz | Last: {}...",
            progress.rows, progress.rate_hz, progress.preview
        )
    }

    pub fn format_summary(stats: &CaptureStats) -> String {
        format!("\n\n✅ Stopped. Saved {} rows.", stats.rows)
    }
}

impl Reporter for ConsoleReporter {
    fn status(&mut self, message: &str) {
        println!("{}", message);
    }

    fn progress(&mut self, progress: &Progress<'_>) {
        let mut out = io::stdout().lock();
        // Status output is best effort
        let _ = out.write_all(Self::format_progress(progress).as_bytes());
        let _ = out.flush();
    }

    fn finished(&mut self, stats: &CaptureStats) {
        println!("{}", Self::format_summary(stats));
        info!(
            rows = stats.rows,
            missing_tag = stats.missing_tag,
            too_few_fields = stats.too_few_fields,
            too_many_fields = stats.too_many_fields,
            repaired = stats.repaired,
            widened = stats.widened,
            "Capture stopped"
        );
    }
}

/// Rows per second since `elapsed_secs` ago, 0 when no time has passed
pub fn rate_hz(rows: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        rows as f64 / elapsed_secs
    } else {
        0.0
    }
}

/// First `max_chars` characters of a line, split on char boundaries
pub fn preview(line: &str, max_chars: usize) -> &str {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_progress() {
        let progress = Progress {
            rows: 200,
            rate_hz: 99.94,
            preview: "DATA,1000,5",
        };
        assert_eq!(
            ConsoleReporter::format_progress(&progress),
            "\r💾 Rows: 200 | Rate: 99.9 Hz | Last: DATA,1000,5..."
        );
    }

    #[test]
    fn test_format_summary() {
        let stats = CaptureStats {
            rows: 250,
            ..CaptureStats::default()
        };
        assert_eq!(ConsoleReporter::format_summary(&stats), "\n\n✅ Stopped. Saved 250 rows.");
    }

    #[test]
    fn test_rate_hz() {
        assert_eq!(rate_hz(100, 1.0), 100.0);
        assert_eq!(rate_hz(250, 2.5), 100.0);
        assert_eq!(rate_hz(100, 0.0), 0.0);
    }

    #[test]
    fn test_preview_truncates_to_char_count() {
        let line = "DATA,1000,5,12.34,56.78,1.2,0.1,0.2,0.3,0.01,0.02,0.03,10,20,30";
        assert_eq!(preview(line, 40), &line[..40]);
        assert_eq!(preview("short", 40), "short");
        // Multi-byte characters are never split
        assert_eq!(preview("äöü", 2), "äö");
    }
}
