//! Facet filtering and sidebar options.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Facet, FacetSelections, FillUp, FuelLog};

/// Rows whose value is in the selection for every restricted facet.
///
/// Empty selections and facets whose column is absent do not restrict.
/// Row order is preserved.
pub fn filter(log: &FuelLog, selections: &FacetSelections) -> FuelLog {
    let active: Vec<(Facet, &BTreeSet<String>)> = selections
        .iter()
        .filter(|(facet, values)| !values.is_empty() && log.has(facet.column()))
        .map(|(facet, values)| (*facet, values))
        .collect();

    if active.is_empty() {
        return log.clone();
    }

    let records = log
        .records
        .iter()
        .filter(|record| matches_all(record, &active))
        .cloned()
        .collect();

    log.with_records(records)
}

fn matches_all(record: &FillUp, active: &[(Facet, &BTreeSet<String>)]) -> bool {
    active.iter().all(|(facet, accepted)| {
        record
            .facet(*facet)
            .is_some_and(|value| accepted.contains(value))
    })
}

/// Sorted distinct values for each facet present in the table.
pub fn facet_options(log: &FuelLog) -> BTreeMap<Facet, Vec<String>> {
    Facet::ALL
        .into_iter()
        .filter(|facet| log.has(facet.column()))
        .map(|facet| {
            let values: BTreeSet<&str> = log.records.iter().filter_map(|r| r.facet(facet)).collect();
            (facet, values.into_iter().map(String::from).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn fuel(placa: &str, combustivel: &str, motorista: Option<&str>) -> FillUp {
        FillUp {
            placa: Some(placa.to_string()),
            combustivel: Some(combustivel.to_string()),
            motorista: motorista.map(String::from),
            ..Default::default()
        }
    }

    fn sample() -> FuelLog {
        FuelLog {
            columns: vec!["Placa".into(), "Combustível".into(), "Motorista".into()],
            records: vec![
                fuel("A", "Gasolina", Some("Ana")),
                fuel("B", "Diesel", Some("Bruno")),
                fuel("A", "Diesel", None),
                fuel("C", "Gasolina", Some("Ana")),
                fuel("B", "Diesel", Some("Ana")),
            ],
        }
    }

    fn select(pairs: &[(Facet, &[&str])]) -> FacetSelections {
        pairs
            .iter()
            .map(|(facet, values)| {
                (*facet, values.iter().map(|v| v.to_string()).collect::<BTreeSet<String>>())
            })
            .collect()
    }

    #[test]
    fn test_no_selection_returns_table_unchanged() {
        let log = sample();
        assert_eq!(filter(&log, &FacetSelections::new()), log);
        assert_eq!(filter(&log, &select(&[(Facet::Placa, &[])])), log);
    }

    #[test]
    fn test_single_facet() {
        let filtered = filter(&sample(), &select(&[(Facet::Combustivel, &["Gasolina"])]));

        assert_eq!(filtered.len(), 2);
        assert!(filtered
            .records
            .iter()
            .all(|r| r.combustivel.as_deref() == Some("Gasolina")));
        assert_eq!(filtered.columns, sample().columns);
    }

    #[test]
    fn test_facets_are_conjunctive_and_order_is_stable() {
        let filtered = filter(
            &sample(),
            &select(&[
                (Facet::Combustivel, &["Diesel"]),
                (Facet::Placa, &["B", "A"]),
                (Facet::Motorista, &["Ana", "Bruno"]),
            ]),
        );

        let plates: Vec<_> = filtered.records.iter().map(|r| r.placa.as_deref()).collect();
        assert_eq!(plates, vec![Some("B"), Some("B")]);
        assert_eq!(filtered.records[0].motorista.as_deref(), Some("Bruno"));
        assert_eq!(filtered.records[1].motorista.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_result_is_subset_satisfying_selection() {
        let log = sample();
        let selections = select(&[(Facet::Motorista, &["Ana"]), (Facet::Placa, &["A", "C"])]);
        let filtered = filter(&log, &selections);

        for record in &filtered.records {
            assert!(log.records.contains(record));
            assert_eq!(record.motorista.as_deref(), Some("Ana"));
            assert!(matches!(record.placa.as_deref(), Some("A") | Some("C")));
        }
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_missing_value_excluded_when_restricted() {
        let filtered = filter(&sample(), &select(&[(Facet::Motorista, &["Ana", "Bruno"])]));
        assert_eq!(filtered.len(), 4);
    }

    #[test]
    fn test_selection_on_absent_column_is_ignored() {
        let log = sample();
        assert!(!log.has(Column::Estado));
        let filtered = filter(&log, &select(&[(Facet::Estado, &["SP"])]));
        assert_eq!(filtered, log);
    }

    #[test]
    fn test_no_match_yields_empty_table() {
        let filtered = filter(&sample(), &select(&[(Facet::Placa, &["Z"])]));
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns.len(), 3);
    }

    #[test]
    fn test_facet_options_skip_absent_columns() {
        let options = facet_options(&sample());

        assert_eq!(options.len(), 3);
        assert_eq!(options[&Facet::Placa], vec!["A", "B", "C"]);
        assert_eq!(options[&Facet::Combustivel], vec!["Diesel", "Gasolina"]);
        assert_eq!(options[&Facet::Motorista], vec!["Ana", "Bruno"]);
        assert!(!options.contains_key(&Facet::Posto));
        assert!(!options.contains_key(&Facet::Estado));
    }
}
