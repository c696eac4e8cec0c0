//! Error types for the marks analysis pipeline.
//!
//! - [`LoadError`] - Reading spreadsheets and CSV files
//! - [`SchemaError`] - Mapping raw tables onto typed records
//! - [`ExportError`] - Writing tables and charts
//! - [`AnalysisError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while reading input files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or a sheet could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Invalid CSV content.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Requested sheet does not exist in the workbook.
    #[error("Sheet '{sheet}' not found in {file}")]
    MissingSheet { file: String, sheet: String },

    /// Sheet or file without a header row.
    #[error("No header row in {0}")]
    NoHeaders(String),
}

impl From<calamine::Error> for LoadError {
    fn from(e: calamine::Error) -> Self {
        LoadError::Spreadsheet(e.to_string())
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while normalizing raw tables into records.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Required column absent after renaming.
    #[error("Missing column '{column}' in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    /// Cell could not be coerced to the expected type.
    #[error("Row {row}, column '{column}': cannot read '{value}' as {expected}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing summary files and figures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// Chart backend failure.
    #[error("Chart error: {0}")]
    Chart(String),
}

// =============================================================================
// Analysis Errors (top-level)
// =============================================================================

/// Top-level error returned by the pipeline functions.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Options error: {0}")]
    Options(#[from] serde_json::Error),

    /// Nothing left to analyse after filtering.
    #[error("No records to analyse{0}")]
    EmptyInput(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type LoadResult<T> = Result<T, LoadError>;

pub type SchemaResult<T> = Result<T, SchemaError>;

pub type ExportResult<T> = Result<T, ExportError>;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let load_err = LoadError::NoHeaders("marks.csv".into());
        let err: AnalysisError = load_err.into();
        assert!(err.to_string().contains("marks.csv"));

        let schema_err = SchemaError::MissingColumn {
            sheet: "Sheet1".into(),
            column: "Examiner".into(),
        };
        let err: AnalysisError = schema_err.into();
        assert!(err.to_string().contains("Examiner"));
    }

    #[test]
    fn test_invalid_value_format() {
        let err = SchemaError::InvalidValue {
            row: 4,
            column: "Initial Mark".into(),
            value: "abc".into(),
            expected: "a number",
        };
        let msg = err.to_string();
        assert!(msg.contains("Row 4"));
        assert!(msg.contains("Initial Mark"));
        assert!(msg.contains("'abc'"));
    }
}
