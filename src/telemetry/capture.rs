//! # Capture Loop
//!
//! Moves validated telemetry lines from a [`LineSource`] into a
//! [`SessionWriter`] until the shutdown future resolves.
//!
//! The loop alternates between two states:
//!
//! - **Idle**: the source reports no unread bytes. Sleeps for the configured
//!   idle interval (or just yields when it is zero) and polls again.
//! - **Processing**: one line is read, decoded, validated and written.
//!
//! Every `flush_every` accepted rows the session is synced to stable storage
//! and a progress snapshot goes to the [`Reporter`].

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::record::{decode_lenient, parse_line, ArityPolicy, LineOutcome, Rejection, FIELD_COUNT};
use super::report::{preview, rate_hz, Progress, Reporter};
use super::session::{SessionWriter, StableWrite};
use crate::config::Config;
use crate::error::Result;
use crate::serial::port_trait::LineSource;

/// Loop tuning taken from configuration
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub flush_every: u64,
    pub preview_chars: usize,
    pub arity: ArityPolicy,
    pub idle_sleep: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            flush_every: 100,
            preview_chars: 40,
            arity: ArityPolicy::PassThrough,
            idle_sleep: Duration::from_micros(200),
        }
    }
}

impl From<&Config> for CaptureSettings {
    fn from(config: &Config) -> Self {
        Self {
            flush_every: config.capture.flush_every,
            preview_chars: config.capture.preview_chars,
            arity: config.capture.arity,
            idle_sleep: config.serial.idle_sleep(),
        }
    }
}

/// Counters kept over one capture session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Rows written to the session
    pub rows: u64,
    /// Periodic flush-and-report events
    pub flushes: u64,
    /// Lines without the `DATA,` tag
    pub missing_tag: u64,
    /// Tagged lines with fewer than fourteen fields
    pub too_few_fields: u64,
    /// Tagged lines wider than the header, discarded
    pub too_many_fields: u64,
    /// Lines that had invalid UTF-8 removed before validation
    pub repaired: u64,
    /// Blank lines and read timeouts with no data
    pub empty: u64,
    /// Accepted rows wider than the header
    pub widened: u64,
}

impl CaptureStats {
    /// Lines read but not written
    pub fn discarded(&self) -> u64 {
        self.missing_tag + self.too_few_fields + self.too_many_fields + self.empty
    }
}

/// What happened to one raw line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineResult {
    Written,
    Discarded(Rejection),
}

/// Capture loop bound to one session and one reporter
pub struct CaptureLoop<W: StableWrite, R: Reporter> {
    session: SessionWriter<W>,
    reporter: R,
    settings: CaptureSettings,
    stats: CaptureStats,
    started: Instant,
    line_buf: Vec<u8>,
}

impl<W: StableWrite, R: Reporter> CaptureLoop<W, R> {
    pub fn new(session: SessionWriter<W>, reporter: R, settings: CaptureSettings) -> Self {
        Self {
            session,
            reporter,
            settings,
            stats: CaptureStats::default(),
            started: Instant::now(),
            line_buf: Vec::with_capacity(256),
        }
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Validate one raw line and write it when accepted
    ///
    /// # Errors
    ///
    /// Returns error only when the session write or flush fails; rejected
    /// lines are counted and skipped.
    pub fn process_line(&mut self, raw: &[u8]) -> Result<LineResult> {
        let decoded = decode_lenient(raw);
        if decoded.repaired {
            self.stats.repaired += 1;
            debug!("Dropped invalid UTF-8 from line ({} raw bytes)", raw.len());
        }
        let line: &str = &decoded.text;

        let record = match parse_line(line, self.settings.arity) {
            LineOutcome::Accepted(record) => record,
            LineOutcome::Rejected(rejection) => {
                match rejection {
                    Rejection::Empty => self.stats.empty += 1,
                    Rejection::MissingTag => self.stats.missing_tag += 1,
                    Rejection::TooFewFields { .. } => self.stats.too_few_fields += 1,
                    Rejection::TooManyFields { .. } => self.stats.too_many_fields += 1,
                }
                trace!("Discarded line ({:?}): {}", rejection, preview(line, self.settings.preview_chars));
                return Ok(LineResult::Discarded(rejection));
            }
        };

        if record.width() > FIELD_COUNT {
            self.stats.widened += 1;
            debug!("Writing {}-field row, header has {}", record.width(), FIELD_COUNT);
        }

        self.session.write_record(&record)?;
        self.stats.rows += 1;

        if self.settings.flush_every > 0 && self.stats.rows % self.settings.flush_every == 0 {
            self.session.sync()?;
            self.stats.flushes += 1;

            let rate = rate_hz(self.stats.rows, self.started.elapsed().as_secs_f64());
            self.reporter.progress(&Progress {
                rows: self.stats.rows,
                rate_hz: rate,
                preview: preview(line, self.settings.preview_chars),
            });
        }

        Ok(LineResult::Written)
    }

    /// One Idle or Processing step
    async fn step<S: LineSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        if source.bytes_available().await? == 0 {
            if self.settings.idle_sleep.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.settings.idle_sleep).await;
            }
            return Ok(());
        }

        let mut buf = std::mem::take(&mut self.line_buf);
        buf.clear();
        let read = source.read_line(&mut buf).await;
        let result = match read {
            Ok(_) => self.process_line(&buf).map(|_| ()),
            Err(e) => Err(e.into()),
        };
        self.line_buf = buf;
        result
    }

    /// Run until `shutdown` resolves, then close the session
    ///
    /// The session is synced and closed explicitly on shutdown. On an error
    /// the loop returns early and the session is flushed when dropped.
    ///
    /// # Errors
    ///
    /// Returns error on source read failures and session write failures
    pub async fn run<S, F>(mut self, source: &mut S, shutdown: F) -> Result<CaptureStats>
    where
        S: LineSource + ?Sized,
        F: Future<Output = ()>,
    {
        self.started = Instant::now();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                result = self.step(source) => {
                    result?;
                }
            }
        }

        info!("Shutdown requested, closing session after {} rows", self.stats.rows);

        let CaptureLoop {
            session,
            mut reporter,
            stats,
            ..
        } = self;
        session.finish_synced()?;
        reporter.finished(&stats);
        Ok(stats)
    }
}
