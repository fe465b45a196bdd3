//! # Capture Session Output
//!
//! One capture run writes exactly one CSV file named after its start time,
//! e.g. `data/raw/walk_data_20260114-093012.csv`.

use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::record::{TelemetryRecord, HEADER};
use crate::error::Result;

/// Timestamp layout used in session file names
pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Writers whose flushed bytes can be forced to stable storage
pub trait StableWrite: Write {
    fn sync_to_disk(&self) -> io::Result<()>;
}

impl StableWrite for File {
    fn sync_to_disk(&self) -> io::Result<()> {
        self.sync_data()
    }
}

impl StableWrite for Vec<u8> {
    fn sync_to_disk(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Create the output directory (and parents) if missing
///
/// Returns the absolute directory path.
pub fn ensure_output_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let abs = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    debug!("Output directory ready: {}", abs.display());
    Ok(abs)
}

/// Build the session file name for a start time
///
/// Second resolution only: two sessions started within the same second
/// share a name and the later one overwrites the earlier.
pub fn session_file_name(prefix: &str, started: &DateTime<Local>) -> String {
    format!("{}_{}.csv", prefix, started.format(SESSION_TIMESTAMP_FORMAT))
}

/// CSV writer for one capture session
pub struct SessionWriter<W: Write> {
    writer: csv::Writer<W>,
    path: Option<PathBuf>,
}

impl<W: Write> std::fmt::Debug for SessionWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWriter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SessionWriter<File> {
    /// Create a new session file and write the header row
    ///
    /// # Arguments
    ///
    /// * `dir` - Existing output directory
    /// * `prefix` - File name prefix (e.g. `walk_data`)
    /// * `started` - Session start time used in the file name
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or the header write fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use walk_capture::telemetry::session::SessionWriter;
    ///
    /// let session = SessionWriter::create(Path::new("data/raw"), "walk_data", &chrono::Local::now())?;
    /// println!("Logging to {}", session.path().unwrap().display());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn create(dir: &Path, prefix: &str, started: &DateTime<Local>) -> Result<Self> {
        let path = dir.join(session_file_name(prefix, started));
        let file = File::create(&path)?;
        let mut session = Self::from_writer(file)?;
        session.path = Some(path);
        info!("Created session file {}", session.path_display());
        Ok(session)
    }
}

impl<W: Write> SessionWriter<W> {
    /// Wrap an arbitrary writer and write the header row
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            // Pass-through rows can be wider than the header
            .flexible(true)
            .from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(Self { writer, path: None })
    }

    /// Path of the session file, `None` for in-memory sessions
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn path_display(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    /// Append one record row
    pub fn write_record(&mut self, record: &TelemetryRecord<'_>) -> Result<()> {
        self.writer.write_record(record.fields())?;
        Ok(())
    }

    /// Push buffered rows to the underlying writer (OS level only)
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and release the session, returning the inner writer
    pub fn finish(self) -> Result<W> {
        let shown = self.path_display();
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| crate::error::CaptureError::Io(e.into_error()))?;
        debug!("Closed session {}", shown);
        Ok(inner)
    }
}

impl<W: StableWrite> SessionWriter<W> {
    /// Flush buffered rows and force them to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_to_disk()?;
        Ok(())
    }

    /// Sync, then release the session, returning the inner writer
    pub fn finish_synced(mut self) -> Result<W> {
        self.sync()?;
        self.finish()
    }
}
