//! Download of the filtered table.
//!
//! XLSX through rust_xlsxwriter, CSV through the csv crate. Columns keep the
//! order of [`FuelLog::columns`]; missing values are empty cells.

use chrono::{NaiveDateTime, Timelike};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::models::{Cell, FuelLog};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_MIME: &str = "text/csv; charset=utf-8";

pub const SHEET_NAME: &str = "Dados Filtrados";

/// Download format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => XLSX_MIME,
            ExportFormat::Csv => CSV_MIME,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "dados_filtrados.xlsx",
            ExportFormat::Csv => "dados_filtrados.csv",
        }
    }

    /// `.csv` paths export CSV, anything else XLSX.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Xlsx,
        }
    }
}

/// Render the table in the given format.
pub fn export(log: &FuelLog, format: ExportFormat) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => to_xlsx(log),
        ExportFormat::Csv => to_csv(log).map(String::into_bytes),
    }
}

/// Write the table to a file, format chosen by extension.
pub fn export_file(log: &FuelLog, path: &Path) -> ExportResult<()> {
    let bytes = export(log, ExportFormat::from_path(path))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Single-sheet workbook with a bold header row.
pub fn to_xlsx(log: &FuelLog) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");
    let datetime_format = Format::new().set_num_format("dd/mm/yyyy hh:mm");

    for (col, header) in log.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, header, &bold)?;
    }

    for (row, record) in log.records.iter().enumerate() {
        let r = u32::try_from(row + 1)
            .map_err(|_| ExportError::TooLarge(format!("{} rows", log.len())))?;

        for (col, header) in log.columns.iter().enumerate() {
            let c = column_index(col)?;
            match record.cell(header) {
                Cell::Number(n) => {
                    worksheet.write_number(r, c, n)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                Cell::Date(dt) => {
                    let format = if has_time(&dt) { &datetime_format } else { &date_format };
                    worksheet.write_number_with_format(r, c, excel_serial(&dt), format)?;
                }
                Cell::Empty => {}
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

/// Comma-delimited text with a header row.
pub fn to_csv(log: &FuelLog) -> ExportResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&log.columns)?;

    for record in &log.records {
        let row: Vec<String> = log
            .columns
            .iter()
            .map(|header| match record.cell(header) {
                Cell::Number(n) => n.to_string(),
                Cell::Text(s) => s,
                Cell::Date(dt) if has_time(&dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
                Cell::Date(dt) => dt.format("%d/%m/%Y").to_string(),
                Cell::Empty => String::new(),
            })
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn column_index(col: usize) -> ExportResult<u16> {
    u16::try_from(col).map_err(|_| ExportError::TooLarge(format!("{} columns", col + 1)))
}

fn has_time(dt: &NaiveDateTime) -> bool {
    dt.hour() != 0 || dt.minute() != 0 || dt.second() != 0
}

/// Serial of 1970-01-01 in the Excel 1900 date system (epoch 1899-12-30).
const UNIX_EPOCH_SERIAL: f64 = 25_569.0;

fn excel_serial(dt: &NaiveDateTime) -> f64 {
    UNIX_EPOCH_SERIAL + dt.and_utc().timestamp_millis() as f64 / 86_400_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FillUp;
    use crate::parser::parse_xlsx_bytes;
    use chrono::NaiveDate;

    fn sample() -> FuelLog {
        FuelLog {
            columns: vec![
                "Data".into(),
                "Placa".into(),
                "Litros".into(),
                "Valor_Total".into(),
                "Obs".into(),
            ],
            records: vec![
                FillUp {
                    data: NaiveDate::from_ymd_opt(2024, 1, 15).and_then(|d| d.and_hms_opt(0, 0, 0)),
                    placa: Some("AAA1A11".into()),
                    litros: Some(10.0),
                    valor_total: Some(55.5),
                    extra: vec![("Obs".into(), "tanque, cheio".into())],
                    ..Default::default()
                },
                FillUp {
                    placa: Some("BBB2B22".into()),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_csv_export() {
        let csv = to_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Data,Placa,Litros,Valor_Total,Obs");
        assert_eq!(lines[1], "15/01/2024,AAA1A11,10,55.5,\"tanque, cheio\"");
        assert_eq!(lines[2], ",BBB2B22,,,");
    }

    #[test]
    fn test_xlsx_export_reads_back() {
        let bytes = to_xlsx(&sample()).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));

        let table = parse_xlsx_bytes(&bytes).unwrap();
        assert_eq!(table.headers, vec!["Data", "Placa", "Litros", "Valor_Total", "Obs"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "AAA1A11");
        assert_eq!(table.rows[0][2], "10");
        assert_eq!(table.rows[0][3], "55.5");
        assert_eq!(table.rows[1][2], "");
    }

    #[test]
    fn test_empty_table_exports_header_only() {
        let log = sample().with_records(vec![]);
        assert_eq!(to_csv(&log).unwrap().lines().count(), 1);
        assert!(to_xlsx(&log).is_ok());
    }

    #[test]
    fn test_export_file_picks_format() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("saida.csv");
        let xlsx_path = dir.path().join("saida.xlsx");

        export_file(&sample(), &csv_path).unwrap();
        export_file(&sample(), &xlsx_path).unwrap();

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("Data,Placa"));
        let xlsx = std::fs::read(&xlsx_path).unwrap();
        assert!(xlsx.starts_with(b"PK\x03\x04"));
    }

    #[test]
    fn test_excel_serial() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        assert_eq!(excel_serial(&dt), 45292.5);
        assert_eq!(ExportFormat::from_path(Path::new("x.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("x")), ExportFormat::Xlsx);
    }
}
