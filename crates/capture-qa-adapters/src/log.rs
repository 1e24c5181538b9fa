//! Append-only report log stored as one JSON array.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use capture_qa_core::{QaError, Report, ReportSink};
use serde_json::Value;
use tracing::debug;

/// [`ReportSink`] that appends each report to a pretty-printed JSON array file.
///
/// Every write is a read-modify-write of the whole file, replaced atomically
/// through a temporary file in the same directory.
pub struct JsonArrayLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonArrayLog {
    /// Opens the log at `path`, creating parent directories and an empty
    /// array if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        if !path.exists() {
            fs::write(&path, "[]").with_context(|| format!("Failed to create {}", path.display()))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every entry currently in the log.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Persistence`] if the file is unreadable or not a JSON array.
    pub fn entries(&self) -> Result<Vec<Value>> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| QaError::Persistence(format!("{}: {e}", self.path.display())))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries: Vec<Value> = serde_json::from_str(&text).map_err(|e| {
            QaError::Persistence(format!("{} is not a JSON array: {e}", self.path.display()))
        })?;
        Ok(entries)
    }

    fn replace(&self, entries: &[Value]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)
            .map_err(|e| QaError::Persistence(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}

impl ReportSink for JsonArrayLog {
    fn write(&self, report: &Report) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| QaError::Persistence("report log lock poisoned".into()))?;

        let mut entries = self.entries()?;
        entries.push(serde_json::to_value(report)?);
        self.replace(&entries)?;

        debug!(entries = entries.len(), "Appended report to {}", self.path.display());
        Ok(())
    }
}
