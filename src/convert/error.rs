//! Conversion error types.

use std::path::PathBuf;

/// Errors that can occur while converting one spreadsheet.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Input vanished between detection and read.
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    /// Input exists but cannot be opened (locked, permissions).
    #[error("Input unreadable: {path}: {reason}")]
    InputUnreadable { path: PathBuf, reason: String },

    /// Spreadsheet format invalid or unsupported.
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Workbook opened but contains no sheet.
    #[error("Workbook has no sheets: {0}")]
    EmptyWorkbook(PathBuf),

    /// Destination not writable.
    #[error("Failed to write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The conversion task died before producing a result.
    #[error("Conversion aborted for {path}: {reason}")]
    Aborted { path: PathBuf, reason: String },
}

impl ConvertError {
    /// True for failures on the output side, which are tracked across events.
    #[must_use]
    pub fn is_output_error(&self) -> bool {
        matches!(self, Self::OutputWrite { .. })
    }
}
