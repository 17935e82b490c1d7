//! Error types for the Fuelboard pipeline.
//!
//! - [`ParseError`] - the uploaded file could not be read as a table
//! - [`ExportError`] - the filtered table could not be written
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//! - [`ConfigError`] - invalid environment configuration
//!
//! A missing column is never an error: metrics and charts depending on it are
//! simply omitted. Only an unreadable source halts processing.

use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while reading an uploaded file into a raw table.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the text content.
    #[error("Failed to decode content as {encoding}")]
    Encoding { encoding: String },

    /// Invalid CSV content.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// Invalid or unsupported spreadsheet.
    #[error("Invalid spreadsheet: {0}")]
    Workbook(String),

    /// File type other than CSV/TXT/XLSX/XLSM.
    #[error("Unsupported file type '.{0}' (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    /// Text file containing binary data.
    #[error("File is not text: it contains binary data")]
    Binary,

    /// Empty file.
    #[error("File is empty")]
    EmptyFile,

    /// No header row found.
    #[error("No header row found")]
    NoHeaders,
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        ParseError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the filtered table for download.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Spreadsheet writer failed.
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table too large for a single worksheet.
    #[error("Table too large for a worksheet: {0}")]
    TooLarge(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source file could not be parsed.
    #[error("Could not read file: {0}")]
    Parse(#[from] ParseError),

    /// Export failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown session.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Upload exceeds the configured limit.
    #[error("File too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
