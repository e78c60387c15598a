//! Spreadsheet to CSV conversion.
//!
//! One call reads the first sheet of the input and replaces the output in a
//! single rename. Failures are reported in the returned
//! [`ConversionResult`], never raised.

mod error;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

pub use error::ConvertError;
pub use reader::{read_first_sheet, render_cell, Rows};
pub use writer::write_csv_atomic;

/// Outcome of one conversion attempt.
#[derive(Debug)]
pub enum ConversionOutcome {
    /// Output fully written.
    Succeeded { rows: usize },
    /// Nothing written; any previous output is unchanged.
    Failed(ConvertError),
}

/// Result of converting `source` into `destination`.
#[derive(Debug)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: ConversionOutcome,
}

impl ConversionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ConversionOutcome::Succeeded { .. })
    }

    /// Rows written, if the conversion succeeded.
    #[must_use]
    pub fn rows(&self) -> Option<usize> {
        match self.outcome {
            ConversionOutcome::Succeeded { rows } => Some(rows),
            ConversionOutcome::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&ConvertError> {
        match &self.outcome {
            ConversionOutcome::Succeeded { .. } => None,
            ConversionOutcome::Failed(e) => Some(e),
        }
    }
}

/// Convert the first sheet of `input` into CSV at `output`.
#[must_use]
pub fn convert(input: &Path, output: &Path) -> ConversionResult {
    let outcome = match read_first_sheet(input)
        .and_then(|rows| write_csv_atomic(&rows, output).map(|()| rows.len()))
    {
        Ok(rows) => ConversionOutcome::Succeeded { rows },
        Err(e) => ConversionOutcome::Failed(e),
    };

    ConversionResult {
        source: input.to_path_buf(),
        destination: output.to_path_buf(),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failed_conversion_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ALINAN.xlsx");
        let output = dir.path().join("orders.csv");
        std::fs::write(&input, b"garbage").unwrap();
        std::fs::write(&output, "id\n1\n").unwrap();

        let result = convert(&input, &output);

        assert!(!result.is_success());
        assert!(result.rows().is_none());
        assert!(matches!(result.error(), Some(ConvertError::Parse { .. })));
        assert_eq!(result.source, input);
        assert_eq!(result.destination, output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "id\n1\n");
    }

    #[test]
    fn test_missing_input_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let result = convert(&dir.path().join("ALINAN.xlsx"), &dir.path().join("orders.csv"));
        assert!(matches!(result.error(), Some(ConvertError::InputNotFound(_))));
        assert!(!dir.path().join("orders.csv").exists());
    }
}
