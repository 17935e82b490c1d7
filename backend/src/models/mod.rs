//! Domain models for the Fuelboard pipeline.
//!
//! - [`Column`] - known fuel log columns and their labels
//! - [`Facet`] - categorical columns usable as filters
//! - [`FillUp`] - one typed fueling record
//! - [`FuelLog`] - the whole table (column list + records)
//! - [`Cell`] - a single displayable value
//! - [`Metrics`], [`Charts`], [`GroupedValue`] - aggregate output

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// Columns
// =============================================================================

/// A column the pipeline knows how to interpret.
///
/// Labels are the normalized headers (spaces replaced by underscores).
/// Matching is exact: diacritics are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Data,
    Placa,
    Motorista,
    Posto,
    Combustivel,
    Estado,
    Mes,
    Ano,
    Litros,
    PrecoLitro,
    Quilometragem,
    ValorTotal,
    KmAnterior,
    KmRodado,
    KmPorLitro,
}

impl Column {
    /// Every known column.
    pub const ALL: [Column; 15] = [
        Column::Data,
        Column::Placa,
        Column::Motorista,
        Column::Posto,
        Column::Combustivel,
        Column::Estado,
        Column::Mes,
        Column::Ano,
        Column::Litros,
        Column::PrecoLitro,
        Column::Quilometragem,
        Column::ValorTotal,
        Column::KmAnterior,
        Column::KmRodado,
        Column::KmPorLitro,
    ];

    /// Columns computed by `derive` rather than read from the source.
    pub const DERIVED_MILEAGE: [Column; 3] =
        [Column::KmAnterior, Column::KmRodado, Column::KmPorLitro];

    pub fn label(self) -> &'static str {
        match self {
            Column::Data => "Data",
            Column::Placa => "Placa",
            Column::Motorista => "Motorista",
            Column::Posto => "Posto",
            Column::Combustivel => "Combustível",
            Column::Estado => "Estado",
            Column::Mes => "Mês",
            Column::Ano => "Ano",
            Column::Litros => "Litros",
            Column::PrecoLitro => "Preço_Litro",
            Column::Quilometragem => "Quilometragem",
            Column::ValorTotal => "Valor_Total",
            Column::KmAnterior => "Km_Anterior",
            Column::KmRodado => "Km_Rodado",
            Column::KmPorLitro => "Km_por_Litro",
        }
    }

    pub fn from_label(label: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Whether values of this column are coerced to numbers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::Litros
                | Column::PrecoLitro
                | Column::Quilometragem
                | Column::ValorTotal
                | Column::KmAnterior
                | Column::KmRodado
                | Column::KmPorLitro
        )
    }
}

// =============================================================================
// Facets
// =============================================================================

/// A categorical column used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facet {
    Placa,
    Motorista,
    Posto,
    #[serde(rename = "Combustível")]
    Combustivel,
    Estado,
    #[serde(rename = "Mês")]
    Mes,
    Ano,
}

impl Facet {
    pub const ALL: [Facet; 7] = [
        Facet::Placa,
        Facet::Motorista,
        Facet::Posto,
        Facet::Combustivel,
        Facet::Estado,
        Facet::Mes,
        Facet::Ano,
    ];

    pub fn column(self) -> Column {
        match self {
            Facet::Placa => Column::Placa,
            Facet::Motorista => Column::Motorista,
            Facet::Posto => Column::Posto,
            Facet::Combustivel => Column::Combustivel,
            Facet::Estado => Column::Estado,
            Facet::Mes => Column::Mes,
            Facet::Ano => Column::Ano,
        }
    }

    pub fn label(self) -> &'static str {
        self.column().label()
    }
}

/// Accepted values per facet. A facet with no entry, or an empty set,
/// is unrestricted.
pub type FacetSelections = BTreeMap<Facet, BTreeSet<String>>;

// =============================================================================
// Records
// =============================================================================

/// One fueling event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillUp {
    pub data: Option<NaiveDateTime>,
    pub placa: Option<String>,
    pub motorista: Option<String>,
    pub posto: Option<String>,
    pub combustivel: Option<String>,
    pub estado: Option<String>,
    pub mes: Option<String>,
    pub ano: Option<String>,
    pub litros: Option<f64>,
    pub preco_litro: Option<f64>,
    pub quilometragem: Option<f64>,
    pub valor_total: Option<f64>,
    pub km_anterior: Option<f64>,
    pub km_rodado: Option<f64>,
    pub km_por_litro: Option<f64>,
    /// Columns the pipeline does not interpret, as (header, value).
    pub extra: Vec<(String, String)>,
}

impl FillUp {
    pub fn text(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::Placa => &self.placa,
            Column::Motorista => &self.motorista,
            Column::Posto => &self.posto,
            Column::Combustivel => &self.combustivel,
            Column::Estado => &self.estado,
            Column::Mes => &self.mes,
            Column::Ano => &self.ano,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn number(&self, column: Column) -> Option<f64> {
        match column {
            Column::Litros => self.litros,
            Column::PrecoLitro => self.preco_litro,
            Column::Quilometragem => self.quilometragem,
            Column::ValorTotal => self.valor_total,
            Column::KmAnterior => self.km_anterior,
            Column::KmRodado => self.km_rodado,
            Column::KmPorLitro => self.km_por_litro,
            _ => None,
        }
    }

    pub fn facet(&self, facet: Facet) -> Option<&str> {
        self.text(facet.column())
    }

    /// Value of a column by its header, known or extra.
    pub fn cell(&self, header: &str) -> Cell {
        match Column::from_label(header) {
            Some(Column::Data) => self.data.map(Cell::Date).unwrap_or(Cell::Empty),
            Some(column) if column.is_numeric() => {
                self.number(column).map(Cell::Number).unwrap_or(Cell::Empty)
            }
            Some(column) => self
                .text(column)
                .map(|s| Cell::Text(s.to_string()))
                .unwrap_or(Cell::Empty),
            None => self
                .extra
                .iter()
                .find(|(h, _)| h == header)
                .filter(|(_, v)| !v.is_empty())
                .map(|(_, v)| Cell::Text(v.clone()))
                .unwrap_or(Cell::Empty),
        }
    }
}

/// A single table value, as shown in the detailed table and the download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[serde(serialize_with = "serialize_date")]
    Date(NaiveDateTime),
    Empty,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_date_label(date))
}

/// `2024-01-15`, or `2024-01-15 08:30` when a time of day is present.
pub fn format_date_label(date: &NaiveDateTime) -> String {
    if date.hour() == 0 && date.minute() == 0 && date.second() == 0 {
        date.format("%Y-%m-%d").to_string()
    } else {
        date.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// The fuel log table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelLog {
    /// Column headers in display order.
    pub columns: Vec<String>,
    pub records: Vec<FillUp>,
}

impl FuelLog {
    pub fn has(&self, column: Column) -> bool {
        self.columns.iter().any(|c| c == column.label())
    }

    /// Append a column header if absent.
    pub fn add_column(&mut self, column: Column) {
        if !self.has(column) {
            self.columns.push(column.label().to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Same columns, different rows.
    pub fn with_records(&self, records: Vec<FillUp>) -> FuelLog {
        FuelLog {
            columns: self.columns.clone(),
            records,
        }
    }

    /// Rows as cells in column order.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.records
            .iter()
            .map(|r| self.columns.iter().map(|c| r.cell(c)).collect())
            .collect()
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Scalar metrics. `None` means "no value": the column is missing or the
/// computation had no inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Gasto total, sum of Valor_Total.
    pub total_spend: Option<f64>,
    /// Litros totais.
    pub total_litres: Option<f64>,
    /// Consumo médio, mean of Km_por_Litro.
    pub mean_efficiency: Option<f64>,
    /// Total de abastecimentos.
    pub fill_ups: usize,
    /// Preço médio, mean of Preço_Litro.
    pub mean_price: Option<f64>,
    /// Sum of Km_Rodado.
    pub total_distance: Option<f64>,
}

/// One bar or point of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedValue {
    pub label: String,
    pub value: Option<f64>,
}

impl GroupedValue {
    pub fn new(label: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Chart series. `None` when a column the chart depends on is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    /// Bar: sum(Valor_Total) by Placa.
    pub spend_by_vehicle: Option<Vec<GroupedValue>>,
    /// Bar: mean(Km_por_Litro) by Motorista.
    pub efficiency_by_driver: Option<Vec<GroupedValue>>,
    /// Line: mean(Preço_Litro) by Data.
    pub price_by_date: Option<Vec<GroupedValue>>,
    /// Bar: sum(Valor_Total) by Combustível.
    pub spend_by_fuel: Option<Vec<GroupedValue>>,
    /// Bar: sum(Valor_Total) by Mês.
    pub spend_by_month: Option<Vec<GroupedValue>>,
    /// Bar: mean(Preço_Litro) by Posto.
    pub price_by_station: Option<Vec<GroupedValue>>,
    /// Bar: sum(Valor_Total) by Motorista.
    pub spend_by_driver: Option<Vec<GroupedValue>>,
}
