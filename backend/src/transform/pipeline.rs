//! High-level pipeline API.
//!
//! Combines the steps in the order the dashboard needs them:
//!
//! ```text
//! upload ─▶ parse ─▶ normalize ─▶ derive      (once per upload)
//!                                  │
//!                     selections ─▶ filter ─▶ aggregate   (every filter change)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fuelboard::{process_file, dashboard, FacetSelections};
//!
//! let processed = process_file("abastecimentos.csv".as_ref())?;
//! let view = dashboard(&processed.log, &FacetSelections::new(), true);
//! println!("Gasto total: {:?}", view.aggregates.metrics.total_spend);
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::aggregate::{aggregate, Aggregates};
use super::derive::derive;
use super::filter::{facet_options, filter};
use super::normalize::normalize;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::PipelineResult;
use crate::models::{Cell, Column, Facet, FacetSelections, FuelLog};
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult, SourceFormat};

/// Columns the dashboard expects; absent ones only disable features.
const EXPECTED_COLUMNS: [Column; 9] = [
    Column::Data,
    Column::Placa,
    Column::Motorista,
    Column::Posto,
    Column::Combustivel,
    Column::Estado,
    Column::Litros,
    Column::PrecoLitro,
    Column::Quilometragem,
];

/// Source file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub file_name: Option<String>,
    pub format: SourceFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    /// Headers as they appear in the file
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// A normalized and derived fuel log, ready for filtering.
#[derive(Debug, Clone)]
pub struct ProcessedLog {
    pub log: FuelLog,
    pub source: SourceInfo,
}

/// Everything a dashboard view shows for one set of facet selections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(flatten)]
    pub aggregates: Aggregates,
    /// Sidebar options, from the whole table
    pub facets: BTreeMap<Facet, Vec<String>>,
    pub columns: Vec<String>,
    /// Filtered rows, omitted when not requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<Cell>>>,
    pub total_rows: usize,
    pub filtered_rows: usize,
}

/// Read, normalize and derive a fuel log file.
pub fn process_file(path: &Path) -> PipelineResult<ProcessedLog> {
    log_info(format!("📖 Reading {}", path.display()));
    let parse_result = parse_file_auto(path)?;
    let name = path.file_name().and_then(|n| n.to_str()).map(String::from);
    Ok(process_parsed(parse_result, name))
}

/// Read, normalize and derive uploaded bytes.
pub fn process_bytes(file_name: Option<&str>, bytes: &[u8]) -> PipelineResult<ProcessedLog> {
    log_info(format!(
        "📖 Reading {} ({} bytes)",
        file_name.unwrap_or("upload"),
        bytes.len()
    ));
    let parse_result = parse_bytes_auto(file_name, bytes)?;
    Ok(process_parsed(parse_result, file_name.map(String::from)))
}

/// Normalize and derive an already-parsed table.
pub fn process_parsed(parse_result: ParseResult, file_name: Option<String>) -> ProcessedLog {
    match parse_result.format {
        SourceFormat::Csv => {
            log_success(format!(
                "CSV, encoding {}, separator '{}'",
                parse_result.encoding.as_deref().unwrap_or("?"),
                format_delimiter(parse_result.delimiter)
            ));
        }
        SourceFormat::Xlsx => log_success("XLSX workbook, first sheet"),
    }
    log_success(format!("Read {} rows", parse_result.row_count()));

    let source = SourceInfo {
        file_name,
        format: parse_result.format,
        encoding: parse_result.encoding.clone(),
        delimiter: parse_result.delimiter,
        headers: parse_result.table.headers.clone(),
        row_count: parse_result.row_count(),
    };

    let log = normalize(&parse_result.table);
    report_missing_columns(&log);

    log_info("⚙️  Deriving total cost and mileage...");
    let log = derive(log);
    if log.has(Column::KmPorLitro) {
        let vehicles = facet_options(&log)
            .get(&Facet::Placa)
            .map(Vec::len)
            .unwrap_or(0);
        log_success(format!("Mileage derived for {} vehicles", vehicles));
    } else {
        log_warning("Mileage not derived (needs Placa, Data and Quilometragem)");
    }

    ProcessedLog { log, source }
}

/// Expected columns the table lacks, by label.
pub fn missing_columns(log: &FuelLog) -> Vec<&'static str> {
    EXPECTED_COLUMNS
        .iter()
        .filter(|c| !log.has(**c))
        .map(|c| c.label())
        .collect()
}

fn report_missing_columns(log: &FuelLog) {
    let missing = missing_columns(log);
    if !missing.is_empty() {
        log_warning(format!("Missing columns: {}", missing.join(", ")));
    }
}

/// Filter and aggregate for one set of selections.
pub fn dashboard(log: &FuelLog, selections: &FacetSelections, include_rows: bool) -> Dashboard {
    let filtered = filter(log, selections);

    Dashboard {
        aggregates: aggregate(&filtered),
        facets: facet_options(log),
        columns: filtered.columns.clone(),
        rows: include_rows.then(|| filtered.rows()),
        total_rows: log.len(),
        filtered_rows: filtered.len(),
    }
}

/// Format delimiter for display
fn format_delimiter(d: Option<char>) -> &'static str {
    match d {
        Some(';') => ";",
        Some(',') => ",",
        Some('\t') => "TAB",
        Some('|') => "|",
        _ => "?",
    }
}
