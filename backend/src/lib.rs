//! # Fuelboard - fleet fuel log dashboard backend
//!
//! Fuelboard reads a fuel log (CSV in any common encoding/separator, or an XLSX
//! workbook), derives total cost and per-vehicle mileage, and serves filtered
//! metrics and chart series for a dashboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / XLSX │────▶│   Parser    │────▶│  Normalize  │────▶│   Derive    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (headers)  │     │ (cost, km)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐     ┌──────▼──────┐
//!                     │ XLSX / CSV  │◀────│  Aggregate  │◀────│   Filter    │
//!                     │  download   │     │ (KPIs, etc) │     │  (facets)   │
//!                     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fuelboard::{dashboard, process_file, FacetSelections};
//!
//! let processed = process_file("abastecimentos.csv".as_ref())?;
//! let view = dashboard(&processed.log, &FacetSelections::new(), false);
//! println!("{} fill-ups", view.aggregates.metrics.fill_ups);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Server configuration from the environment
//! - [`models`] - Columns, facets, fill-up records, metrics and charts
//! - [`parser`] - CSV/XLSX parsing with auto-detection
//! - [`transform`] - Normalize, derive, filter, aggregate
//! - [`export`] - XLSX/CSV download of the filtered table
//! - [`session`] - In-memory upload sessions
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod export;

// Sessions
pub mod session;

// HTTP API
pub mod api;

/// Server entry point
pub mod server {
    pub use crate::api::server::start_server;
}

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    ParseError,
    PipelineError,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cell,
    Charts,
    Column,
    Facet,
    FacetSelections,
    FillUp,
    FuelLog,
    GroupedValue,
    Metrics,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    detect_format,
    parse_bytes_auto,
    parse_file_auto,
    ParseResult,
    RawTable,
    SourceFormat,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    aggregate,
    dashboard,
    facet_options,
    filter,
    normalize,
    process_bytes,
    process_file,
    Aggregates,
    Dashboard,
    ProcessedLog,
    SourceInfo,
};

// =============================================================================
// Re-exports - Export & config
// =============================================================================

pub use config::ServerConfig;
pub use export::{export_file, to_csv, to_xlsx, ExportFormat};
pub use session::SessionStore;
