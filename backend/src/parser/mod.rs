//! Raw table reading with format, encoding and delimiter auto-detection.
//!
//! Produces a [`RawTable`] of text cells. No fuel-log interpretation here;
//! see [`crate::transform::normalize`] for that.

use calamine::{Data, Reader, Xlsx};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use crate::error::ParseError;

/// Source file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

/// Header row plus data rows, all as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Result of parsing with metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub table: RawTable,
    pub format: SourceFormat,
    /// Detected encoding (`None` for spreadsheets)
    pub encoding: Option<String>,
    /// Detected delimiter (`None` for spreadsheets)
    pub delimiter: Option<char>,
}

impl ParseResult {
    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Pick the format from the file extension, falling back to content
/// sniffing when the name has none.
///
/// Extensions other than csv, txt, xlsx and xlsm are rejected.
pub fn detect_format(file_name: Option<&str>, bytes: &[u8]) -> Result<SourceFormat, ParseError> {
    let extension = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(SourceFormat::Xlsx),
        Some("csv") | Some("txt") => Ok(SourceFormat::Csv),
        Some(other) => Err(ParseError::UnsupportedFormat(other.to_string())),
        None if bytes.starts_with(ZIP_MAGIC) => Ok(SourceFormat::Xlsx),
        None => Ok(SourceFormat::Csv),
    }
}

/// Detect the encoding of raw bytes using chardet.
///
/// A byte-order mark decides first. Valid UTF-8 is taken as is; chardet is
/// unreliable on short samples.
/// Anything chardet does not recognise as a western single-byte charset
/// falls back to windows-1252, the usual encoding of spreadsheet exports.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if let Some((encoding, _)) = encoding_rs::Encoding::for_bom(bytes) {
        return encoding.name().to_lowercase();
    }

    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        _ => "windows-1252".to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A leading byte-order mark is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, ParseError> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        other => {
            let enc = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                ParseError::Encoding {
                    encoding: other.to_string(),
                }
            })?;
            enc.decode(bytes).0.to_string()
        }
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Decoded text must not contain control characters other than tab and
/// line breaks; binary files decode "successfully" as windows-1252.
fn check_text(content: &str) -> Result<(), ParseError> {
    let binary = content
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'));

    if binary {
        return Err(ParseError::Binary);
    }
    Ok(())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Rows shorter than the header are padded with empty cells, longer rows
/// are truncated.
pub fn parse_csv_str(content: &str, delimiter: char) -> Result<RawTable, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let delimiter = u8::try_from(delimiter).map_err(|_| ParseError::Csv {
        line: 1,
        message: format!("unsupported delimiter '{}'", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let row: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Parse the first worksheet of an XLSX workbook.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> Result<RawTable, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ParseError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ParseError::Workbook("no worksheet found".to_string()))?
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(ParseError::NoHeaders)?
        .iter()
        .map(cell_to_string)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::NoHeaders);
    }

    let rows = rows
        .map(|row| {
            (0..headers.len())
                .map(|i| row.get(i).map(cell_to_string).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .filter(|row| row.iter().any(|v| !v.trim().is_empty()))
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()).unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Integral floats print without a fractional part (`2024.0` -> `2024`).
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Convert an Excel serial date (1900 system) to `YYYY-MM-DD HH:MM:SS`.
fn excel_serial_to_string(serial: f64) -> Option<String> {
    let epoch = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let dt = epoch.checked_add_signed(chrono::Duration::milliseconds(millis))?;
    Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Parse bytes with auto-detection of format, encoding and delimiter.
pub fn parse_bytes_auto(file_name: Option<&str>, bytes: &[u8]) -> Result<ParseResult, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    match detect_format(file_name, bytes)? {
        SourceFormat::Xlsx => Ok(ParseResult {
            table: parse_xlsx_bytes(bytes)?,
            format: SourceFormat::Xlsx,
            encoding: None,
            delimiter: None,
        }),
        SourceFormat::Csv => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding)?;
            check_text(&content)?;
            let delimiter = detect_delimiter(&content);
            Ok(ParseResult {
                table: parse_csv_str(&content, delimiter)?,
                format: SourceFormat::Csv,
                encoding: Some(encoding),
                delimiter: Some(delimiter),
            })
        }
    }
}

/// Parse a file with auto-detection of format, encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> Result<ParseResult, ParseError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path.file_name().and_then(|n| n.to_str());
    parse_bytes_auto(name, &bytes)
}
