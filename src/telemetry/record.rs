//! # Telemetry Records
//!
//! Line format emitted by the logger board and the rules for turning one
//! raw serial line into a CSV row.
//!
//! ```text
//! DATA,<Millis>,<Sats>,<Lat>,<Lon>,<HDOP>,<Ax>,<Ay>,<Az>,<Gx>,<Gy>,<Gz>,<Mx>,<My>,<Mz>
//! ```

use serde::Deserialize;
use std::borrow::Cow;

/// Literal prefix every telemetry line starts with
pub const DATA_TAG: &str = "DATA,";

/// Number of fields following the tag
pub const FIELD_COUNT: usize = 14;

/// CSV header row, one column per telemetry field
pub const HEADER: [&str; FIELD_COUNT] = [
    "Millis", "Sats", "Lat", "Lon", "HDOP", "Ax", "Ay", "Az", "Gx", "Gy", "Gz", "Mx", "My", "Mz",
];

/// How lines with more than [`FIELD_COUNT`] fields after the tag are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArityPolicy {
    /// Write every trailing field, producing rows wider than the header
    #[default]
    PassThrough,
    /// Keep the first fourteen fields, drop the rest
    Truncate,
    /// Discard the line
    Reject,
}

/// Why a line was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Blank after trimming
    Empty,
    /// Does not start with `DATA,`
    MissingTag,
    /// Fewer than fourteen fields after the tag
    TooFewFields { found: usize },
    /// More than fourteen fields under [`ArityPolicy::Reject`]
    TooManyFields { found: usize },
}

/// One validated telemetry sample, borrowed from its source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord<'a> {
    fields: Vec<&'a str>,
}

impl<'a> TelemetryRecord<'a> {
    /// Fields in wire order, tag excluded
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    /// Number of fields in the row
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Field by header column name
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = HEADER.iter().position(|c| *c == column)?;
        self.fields.get(idx).copied()
    }
}

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome<'a> {
    Accepted(TelemetryRecord<'a>),
    Rejected(Rejection),
}

/// A decoded and trimmed line
#[derive(Debug)]
pub struct DecodedLine<'a> {
    pub text: Cow<'a, str>,
    /// Invalid UTF-8 sequences were dropped while decoding
    pub repaired: bool,
}

/// Decode raw bytes as UTF-8, dropping invalid sequences, then trim
///
/// Invalid bytes are removed rather than replaced so a single corrupted
/// byte at startup does not leave a U+FFFD in the CSV.
pub fn decode_lenient(raw: &[u8]) -> DecodedLine<'_> {
    match std::str::from_utf8(raw) {
        Ok(text) => DecodedLine {
            text: Cow::Borrowed(text.trim()),
            repaired: false,
        },
        Err(_) => {
            let mut cleaned = String::with_capacity(raw.len());
            for chunk in raw.utf8_chunks() {
                cleaned.push_str(chunk.valid());
            }
            DecodedLine {
                text: Cow::Owned(cleaned.trim().to_string()),
                repaired: true,
            }
        }
    }
}

/// Validate a decoded line and extract its fields
///
/// # Arguments
///
/// * `line` - Trimmed text line
/// * `policy` - Handling for lines wider than the header
///
/// # Examples
///
/// ```
/// use walk_capture::telemetry::record::{parse_line, ArityPolicy, LineOutcome, Rejection};
///
/// let line = "DATA,1000,5,12.34,56.78,1.2,0.1,0.2,0.3,0.01,0.02,0.03,10,20,30";
/// match parse_line(line, ArityPolicy::PassThrough) {
///     LineOutcome::Accepted(record) => assert_eq!(record.get("Sats"), Some("5")),
///     LineOutcome::Rejected(r) => panic!("rejected: {:?}", r),
/// }
///
/// assert_eq!(
///     parse_line("GPSONLY,junk", ArityPolicy::PassThrough),
///     LineOutcome::Rejected(Rejection::MissingTag)
/// );
/// ```
pub fn parse_line(line: &str, policy: ArityPolicy) -> LineOutcome<'_> {
    if line.is_empty() {
        return LineOutcome::Rejected(Rejection::Empty);
    }
    if !line.starts_with(DATA_TAG) {
        return LineOutcome::Rejected(Rejection::MissingTag);
    }

    let mut fields: Vec<&str> = line.split(',').skip(1).collect();
    let found = fields.len();

    if found < FIELD_COUNT {
        return LineOutcome::Rejected(Rejection::TooFewFields { found });
    }

    if found > FIELD_COUNT {
        match policy {
            ArityPolicy::PassThrough => {}
            ArityPolicy::Truncate => fields.truncate(FIELD_COUNT),
            ArityPolicy::Reject => {
                return LineOutcome::Rejected(Rejection::TooManyFields { found })
            }
        }
    }

    LineOutcome::Accepted(TelemetryRecord { fields })
}
