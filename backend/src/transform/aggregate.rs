//! Scalar metrics and grouped chart series.
//!
//! Anything depending on a missing column is `None`. Means over no values
//! are `None` as well; sums over no values are `0.0`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{format_date_label, Charts, Column, FuelLog, GroupedValue, Metrics};

/// Metrics and charts for one row set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub metrics: Metrics,
    pub charts: Charts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduce {
    Sum,
    Mean,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn finish(self, reduce: Reduce) -> Option<f64> {
        match reduce {
            Reduce::Sum => Some(self.sum),
            Reduce::Mean if self.count == 0 => None,
            Reduce::Mean => Some(self.sum / self.count as f64),
        }
    }
}

pub fn aggregate(log: &FuelLog) -> Aggregates {
    Aggregates {
        metrics: metrics(log),
        charts: charts(log),
    }
}

pub fn metrics(log: &FuelLog) -> Metrics {
    Metrics {
        total_spend: reduce_column(log, Column::ValorTotal, Reduce::Sum),
        total_litres: reduce_column(log, Column::Litros, Reduce::Sum),
        mean_efficiency: reduce_column(log, Column::KmPorLitro, Reduce::Mean),
        fill_ups: log.len(),
        mean_price: reduce_column(log, Column::PrecoLitro, Reduce::Mean),
        total_distance: reduce_column(log, Column::KmRodado, Reduce::Sum),
    }
}

pub fn charts(log: &FuelLog) -> Charts {
    Charts {
        spend_by_vehicle: by_text(log, Column::Placa, Column::ValorTotal, Reduce::Sum)
            .map(ranked),
        efficiency_by_driver: by_text(log, Column::Motorista, Column::KmPorLitro, Reduce::Mean)
            .map(ranked),
        price_by_date: price_by_date(log),
        spend_by_fuel: by_text(log, Column::Combustivel, Column::ValorTotal, Reduce::Sum)
            .map(ranked),
        spend_by_month: by_text(log, Column::Mes, Column::ValorTotal, Reduce::Sum)
            .map(by_period),
        price_by_station: by_text(log, Column::Posto, Column::PrecoLitro, Reduce::Mean)
            .map(ranked),
        spend_by_driver: by_text(log, Column::Motorista, Column::ValorTotal, Reduce::Sum)
            .map(ranked),
    }
}

fn reduce_column(log: &FuelLog, column: Column, reduce: Reduce) -> Option<f64> {
    if !log.has(column) {
        return None;
    }

    let mut acc = Accumulator::default();
    for record in &log.records {
        acc.push(record.number(column));
    }
    acc.finish(reduce)
}

/// Group by a text column; rows with a missing key are ignored.
fn by_text(log: &FuelLog, key: Column, value: Column, reduce: Reduce) -> Option<Vec<GroupedValue>> {
    if !log.has(key) || !log.has(value) {
        return None;
    }

    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for record in &log.records {
        if let Some(k) = record.text(key) {
            groups.entry(k).or_default().push(record.number(value));
        }
    }

    Some(
        groups
            .into_iter()
            .map(|(k, acc)| GroupedValue::new(k, acc.finish(reduce)))
            .collect(),
    )
}

/// Mean Preço_Litro per date, ascending by date.
fn price_by_date(log: &FuelLog) -> Option<Vec<GroupedValue>> {
    if !log.has(Column::Data) || !log.has(Column::PrecoLitro) {
        return None;
    }

    let mut groups = BTreeMap::new();
    for record in &log.records {
        if let Some(date) = record.data {
            groups
                .entry(date)
                .or_insert_with(Accumulator::default)
                .push(record.preco_litro);
        }
    }

    Some(
        groups
            .into_iter()
            .map(|(date, acc)| GroupedValue::new(format_date_label(&date), acc.finish(Reduce::Mean)))
            .collect(),
    )
}

/// Descending by value, "no value" last, ties by label.
fn ranked(mut series: Vec<GroupedValue>) -> Vec<GroupedValue> {
    series.sort_by(|a, b| match (a.value, b.value) {
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.label.cmp(&b.label),
    });
    series
}

/// Numeric labels (`"2"`, `"10"`) in numeric order, then the rest by label.
fn by_period(mut series: Vec<GroupedValue>) -> Vec<GroupedValue> {
    series.sort_by(|a, b| {
        match (a.label.trim().parse::<u32>(), b.label.trim().parse::<u32>()) {
            (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.label.cmp(&b.label)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.label.cmp(&b.label),
        }
    });
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FillUp;
    use chrono::NaiveDate;

    fn log_of(columns: &[&str], records: Vec<FillUp>) -> FuelLog {
        FuelLog {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    const ALL_COLUMNS: &[&str] = &[
        "Data",
        "Placa",
        "Motorista",
        "Posto",
        "Combustível",
        "Mês",
        "Litros",
        "Preço_Litro",
        "Valor_Total",
        "Km_Rodado",
        "Km_por_Litro",
    ];

    fn row(placa: &str, motorista: &str, combustivel: &str, litros: f64, preco: f64) -> FillUp {
        FillUp {
            placa: Some(placa.into()),
            motorista: Some(motorista.into()),
            combustivel: Some(combustivel.into()),
            litros: Some(litros),
            preco_litro: Some(preco),
            valor_total: Some(litros * preco),
            ..Default::default()
        }
    }

    fn value(series: &Option<Vec<GroupedValue>>, label: &str) -> Option<f64> {
        series
            .as_ref()
            .and_then(|s| s.iter().find(|g| g.label == label))
            .and_then(|g| g.value)
    }

    #[test]
    fn test_empty_table_has_zero_sums_and_no_mean() {
        let agg = aggregate(&log_of(ALL_COLUMNS, vec![]));

        assert_eq!(agg.metrics.total_spend, Some(0.0));
        assert_eq!(agg.metrics.total_litres, Some(0.0));
        assert_eq!(agg.metrics.mean_efficiency, None);
        assert_eq!(agg.metrics.mean_price, None);
        assert_eq!(agg.metrics.fill_ups, 0);
        assert_eq!(agg.charts.spend_by_vehicle, Some(vec![]));
    }

    #[test]
    fn test_scalar_metrics() {
        let mut first = row("A", "Ana", "Gasolina", 10.0, 5.0);
        first.km_por_litro = Some(12.0);
        first.km_rodado = Some(120.0);
        let mut second = row("B", "Bruno", "Diesel", 20.0, 6.0);
        second.km_por_litro = None;
        let mut third = row("A", "Ana", "Gasolina", 30.0, 5.0);
        third.km_por_litro = Some(8.0);
        third.km_rodado = Some(240.0);

        let m = metrics(&log_of(ALL_COLUMNS, vec![first, second, third]));

        assert_eq!(m.total_spend, Some(50.0 + 120.0 + 150.0));
        assert_eq!(m.total_litres, Some(60.0));
        assert_eq!(m.mean_efficiency, Some(10.0));
        assert_eq!(m.fill_ups, 3);
        assert_eq!(m.total_distance, Some(360.0));
        assert!((m.mean_price.unwrap() - 16.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_columns_omit_metrics_and_charts() {
        let record = FillUp {
            placa: Some("A".into()),
            litros: Some(10.0),
            ..Default::default()
        };
        let agg = aggregate(&log_of(&["Placa", "Litros"], vec![record]));

        assert_eq!(agg.metrics.total_spend, None);
        assert_eq!(agg.metrics.total_litres, Some(10.0));
        assert_eq!(agg.metrics.mean_efficiency, None);
        assert_eq!(agg.metrics.fill_ups, 1);
        assert_eq!(agg.charts.spend_by_vehicle, None);
        assert_eq!(agg.charts.efficiency_by_driver, None);
        assert_eq!(agg.charts.price_by_date, None);
        assert_eq!(agg.charts.spend_by_fuel, None);
    }

    #[test]
    fn test_spend_by_vehicle_ranked_descending() {
        let log = log_of(
            ALL_COLUMNS,
            vec![
                row("A", "Ana", "Gasolina", 10.0, 5.0),
                row("B", "Bruno", "Diesel", 40.0, 6.0),
                row("A", "Ana", "Gasolina", 10.0, 5.0),
            ],
        );

        let series = charts(&log).spend_by_vehicle.unwrap();
        assert_eq!(
            series,
            vec![GroupedValue::new("B", Some(240.0)), GroupedValue::new("A", Some(100.0))]
        );
    }

    #[test]
    fn test_grouping_ignores_missing_keys() {
        let mut orphan = row("X", "Ana", "Gasolina", 10.0, 5.0);
        orphan.placa = None;
        orphan.combustivel = None;

        let log = log_of(ALL_COLUMNS, vec![orphan, row("A", "Ana", "Diesel", 1.0, 1.0)]);
        let c = charts(&log);

        assert_eq!(c.spend_by_vehicle.as_ref().map(Vec::len), Some(1));
        assert_eq!(value(&c.spend_by_fuel, "Diesel"), Some(1.0));
        assert_eq!(c.spend_by_fuel.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_driver_efficiency_without_values_is_no_value() {
        let mut ana = row("A", "Ana", "Gasolina", 10.0, 5.0);
        ana.km_por_litro = Some(9.0);
        let mut ana2 = row("A", "Ana", "Gasolina", 10.0, 5.0);
        ana2.km_por_litro = Some(11.0);
        let bruno = row("B", "Bruno", "Diesel", 10.0, 5.0);

        let series = charts(&log_of(ALL_COLUMNS, vec![bruno, ana, ana2]))
            .efficiency_by_driver
            .unwrap();

        assert_eq!(
            series,
            vec![GroupedValue::new("Ana", Some(10.0)), GroupedValue::new("Bruno", None)]
        );
    }

    #[test]
    fn test_price_by_date_ascending() {
        let d = |day: u32| NaiveDate::from_ymd_opt(2024, 1, day).and_then(|d| d.and_hms_opt(0, 0, 0));
        let mut late = row("A", "Ana", "Gasolina", 10.0, 6.0);
        late.data = d(20);
        let mut early = row("A", "Ana", "Gasolina", 10.0, 5.0);
        early.data = d(3);
        let mut early2 = row("B", "Bruno", "Gasolina", 10.0, 5.5);
        early2.data = d(3);
        let undated = row("C", "Caio", "Gasolina", 10.0, 9.0);

        let series = charts(&log_of(ALL_COLUMNS, vec![late, early, early2, undated]))
            .price_by_date
            .unwrap();

        assert_eq!(
            series,
            vec![
                GroupedValue::new("2024-01-03", Some(5.25)),
                GroupedValue::new("2024-01-20", Some(6.0)),
            ]
        );
    }

    #[test]
    fn test_spend_by_month_in_calendar_order() {
        let month = |m: &str, litros: f64| {
            let mut r = row("A", "Ana", "Gasolina", litros, 1.0);
            r.mes = Some(m.into());
            r
        };

        let series = charts(&log_of(
            ALL_COLUMNS,
            vec![month("10", 1.0), month("2", 2.0), month("10", 3.0)],
        ))
        .spend_by_month
        .unwrap();

        assert_eq!(
            series,
            vec![GroupedValue::new("2", Some(2.0)), GroupedValue::new("10", Some(4.0))]
        );
    }

    #[test]
    fn test_ranked_orders_no_value_last() {
        let series = ranked(vec![
            GroupedValue::new("b", None),
            GroupedValue::new("a", Some(1.0)),
            GroupedValue::new("c", Some(3.0)),
            GroupedValue::new("d", Some(1.0)),
        ]);
        let labels: Vec<_> = series.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["c", "a", "d", "b"]);
    }
}
