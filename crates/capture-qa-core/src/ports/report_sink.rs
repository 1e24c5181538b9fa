//! Report sink port for persisting quality reports.

use crate::domain::Report;

/// Port for writing reports.
pub trait ReportSink: Send + Sync {
    /// Writes a single report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, report: &Report) -> anyhow::Result<()>;

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
