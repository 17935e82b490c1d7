//! Derived fields: total cost and per-vehicle mileage.
//!
//! Mileage is an explicit grouped iteration: a stable sort by
//! (Placa, Data) followed by one forward pass that carries the previous
//! odometer reading and resets it at every plate boundary.

use std::cmp::Ordering;

use crate::models::{Column, FillUp, FuelLog};

/// Compute Valor_Total (when absent) and Km_Anterior / Km_Rodado /
/// Km_por_Litro (when Placa, Data and Quilometragem are present).
///
/// Rows are reordered by (Placa, Data) whenever Placa and Data exist.
pub fn derive(mut log: FuelLog) -> FuelLog {
    derive_total_cost(&mut log);

    if log.has(Column::Placa) && log.has(Column::Data) {
        log.records.sort_by(vehicle_order);

        if log.has(Column::Quilometragem) {
            derive_mileage(&mut log.records);
            for column in Column::DERIVED_MILEAGE {
                log.add_column(column);
            }
        }
    }

    log
}

/// Litros × Preço_Litro. A supplied Valor_Total is left untouched.
fn derive_total_cost(log: &mut FuelLog) {
    if log.has(Column::ValorTotal) || !log.has(Column::Litros) || !log.has(Column::PrecoLitro) {
        return;
    }

    for record in &mut log.records {
        record.valor_total = record
            .litros
            .zip(record.preco_litro)
            .map(|(litros, preco)| litros * preco);
    }
    log.add_column(Column::ValorTotal);
}

/// Plate ascending, then date ascending; missing values sort last.
fn vehicle_order(a: &FillUp, b: &FillUp) -> Ordering {
    none_last(a.placa.as_deref(), b.placa.as_deref()).then_with(|| none_last(a.data, b.data))
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Expects records sorted by [`vehicle_order`].
fn derive_mileage(records: &mut [FillUp]) {
    // (plate, odometer reading) of the previous row
    let mut previous: Option<(String, Option<f64>)> = None;

    for record in records.iter_mut() {
        let Some(placa) = record.placa.clone() else {
            record.km_anterior = None;
            record.km_rodado = None;
            record.km_por_litro = None;
            previous = None;
            continue;
        };

        let km_anterior = match &previous {
            Some((prev_placa, prev_km)) if *prev_placa == placa => *prev_km,
            _ => None,
        };

        record.km_anterior = km_anterior;
        record.km_rodado = record
            .quilometragem
            .zip(km_anterior)
            .map(|(km, anterior)| km - anterior);
        record.km_por_litro = match (record.km_rodado, record.litros) {
            (Some(rodado), Some(litros)) if litros != 0.0 => Some(rodado / litros),
            _ => None,
        };

        previous = Some((placa, record.quilometragem));
    }
}
