use crate::rows::{Grain, MergedRow, ReportRow};
use crate::table::Table;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    quantity: f64,
    clean_realized_pl: f64,
    amortized_realized_pl: f64,
    ca_income: f64,
}

/// Group merged rows by reporting grain and sum their measures.
///
/// Absent measures count as zero. Lots are summed away, and the output is
/// ordered by grain.
pub fn aggregate_by_grain(merged: &Table<MergedRow>) -> Table<ReportRow> {
    let mut groups: BTreeMap<Grain, Totals> = BTreeMap::new();

    for row in merged.rows() {
        let totals = groups.entry(row.grain()).or_default();
        totals.quantity += row.quantity.unwrap_or(0.0);
        totals.clean_realized_pl += row.clean_realized_pl.unwrap_or(0.0);
        totals.amortized_realized_pl += row.amortized_realized_pl.unwrap_or(0.0);
        totals.ca_income += row.ca_income.unwrap_or(0.0);
    }

    let rows = groups
        .into_iter()
        .map(|(grain, totals)| ReportRow {
            portfolio: grain.portfolio,
            instrument: grain.instrument,
            contributor_id: grain.contributor_id,
            event: grain.event,
            date: grain.date,
            unit: grain.unit,
            quantity: totals.quantity,
            clean_realized_pl: totals.clean_realized_pl,
            amortized_realized_pl: totals.amortized_realized_pl,
            ca_income: totals.ca_income,
        })
        .collect();

    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::Event;

    fn merged(lot: &str, unit: &str, quantity: Option<f64>, pl: Option<f64>) -> MergedRow {
        MergedRow {
            portfolio: "P".into(),
            instrument: "I".into(),
            lot_id: lot.into(),
            contributor_id: "C1".into(),
            event: Event::Purchase,
            date: "2024-01-01".into(),
            unit: unit.into(),
            quantity,
            realized_pl: pl,
            realized_amortization: None,
            clean_realized_pl: pl,
            amortized_realized_pl: pl,
            ca_income: None,
        }
    }

    #[test]
    fn test_rows_sharing_grain_are_summed_across_lots() {
        let table = Table::from_rows(vec![
            merged("L1", "USD", Some(150.0), Some(333.0)),
            merged("L2", "USD", Some(50.0), None),
        ]);
        let report = aggregate_by_grain(&table);
        assert_eq!(report.len(), 1);

        let row = &report.rows()[0];
        assert_eq!(row.quantity, 200.0);
        assert_eq!(row.clean_realized_pl, 333.0);
        assert_eq!(row.amortized_realized_pl, 333.0);
        assert_eq!(row.ca_income, 0.0);
        assert_eq!(row.portfolio, "P");
        assert_eq!(row.instrument, "I");
        assert_eq!(row.contributor_id, "C1");
        assert_eq!(row.event, Event::Purchase);
        assert_eq!(row.date, "2024-01-01");
    }

    #[test]
    fn test_distinct_grains_stay_separate_and_sorted() {
        let table = Table::from_rows(vec![
            merged("L1", "USD", Some(1.0), None),
            merged("L1", "EUR", None, Some(2.0)),
        ]);
        let report = aggregate_by_grain(&table);
        assert_eq!(report.len(), 2);
        // BTreeMap ordering: EUR before USD
        assert_eq!(report.rows()[0].unit, "EUR");
        assert_eq!(report.rows()[0].quantity, 0.0);
        assert_eq!(report.rows()[0].clean_realized_pl, 2.0);
        assert_eq!(report.rows()[1].unit, "USD");
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_by_grain(&Table::default()).is_empty());
    }
}
