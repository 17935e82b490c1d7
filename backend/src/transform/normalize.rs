//! Raw table to typed fuel log.
//!
//! Header names are trimmed and spaces become underscores. Known columns are
//! coerced to dates and numbers; values that do not parse become missing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use crate::models::{Column, FillUp, FuelLog};
use crate::parser::RawTable;

/// Day-first date-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%y",
];

/// Where a source column ends up in a [`FillUp`].
#[derive(Debug, Clone)]
enum Slot {
    Known(Column),
    Extra(String),
}

/// `" Preço Litro "` -> `"Preço_Litro"`.
pub fn normalize_header(header: &str) -> String {
    header.trim().replace(' ', "_")
}

/// Normalize headers, renaming repeats as `name.1`, `name.2`, ...
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .map(|h| {
            let name = normalize_header(h);
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Parse a number, accepting `.` or `,` decimals, thousands separators
/// and an `R$` prefix. Unparseable or non-finite input is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if s.is_empty() {
        return None;
    }

    // The right-most separator is the decimal one.
    let s = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };

    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date, day first. Unparseable input is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

fn text(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Build a typed fuel log from a raw table.
pub fn normalize(raw: &RawTable) -> FuelLog {
    let columns = normalize_headers(&raw.headers);

    let slots: Vec<Slot> = columns
        .iter()
        .map(|name| match Column::from_label(name) {
            Some(column) => Slot::Known(column),
            None => Slot::Extra(name.clone()),
        })
        .collect();

    let records = raw
        .rows
        .iter()
        .map(|row| {
            let mut record = FillUp::default();
            for (slot, value) in slots.iter().zip(row.iter()) {
                match slot {
                    Slot::Known(column) => assign(&mut record, *column, value),
                    Slot::Extra(name) => record.extra.push((name.clone(), value.clone())),
                }
            }
            record
        })
        .collect();

    FuelLog { columns, records }
}

fn assign(record: &mut FillUp, column: Column, value: &str) {
    match column {
        Column::Data => record.data = parse_date(value),
        Column::Placa => record.placa = text(value),
        Column::Motorista => record.motorista = text(value),
        Column::Posto => record.posto = text(value),
        Column::Combustivel => record.combustivel = text(value),
        Column::Estado => record.estado = text(value),
        Column::Mes => record.mes = text(value),
        Column::Ano => record.ano = text(value),
        Column::Litros => record.litros = parse_number(value),
        Column::PrecoLitro => record.preco_litro = parse_number(value),
        Column::Quilometragem => record.quilometragem = parse_number(value),
        Column::ValorTotal => record.valor_total = parse_number(value),
        Column::KmAnterior => record.km_anterior = parse_number(value),
        Column::KmRodado => record.km_rodado = parse_number(value),
        Column::KmPorLitro => record.km_por_litro = parse_number(value),
    }
}
