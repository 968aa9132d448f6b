use crate::rows::ReportRow;
use crate::table::Table;
use log::debug;

/// Whether a report row has a realized economic effect.
///
/// Only clean realized P&L and corporate action income count; quantity and
/// amortized P&L are reported but never keep a row alive. Comparison is exact.
pub fn has_economic_effect(row: &ReportRow) -> bool {
    row.clean_realized_pl != 0.0 || row.ca_income != 0.0
}

/// Drops report rows without economic effect, keeping order.
pub fn retain_economic_rows(report: Table<ReportRow>) -> Table<ReportRow> {
    let before = report.len();
    let rows: Vec<ReportRow> = report
        .into_rows()
        .into_iter()
        .filter(has_economic_effect)
        .collect();

    debug!(
        "Reconciliation kept {} of {} report rows",
        rows.len(),
        before
    );

    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::Event;

    fn report_row(quantity: f64, clean: f64, amortized: f64, income: f64) -> ReportRow {
        ReportRow {
            portfolio: "P".into(),
            instrument: "I".into(),
            contributor_id: "C1".into(),
            event: Event::Purchase,
            date: "2024-01-01".into(),
            unit: "USD".into(),
            quantity,
            clean_realized_pl: clean,
            amortized_realized_pl: amortized,
            ca_income: income,
        }
    }

    #[test]
    fn test_quantity_alone_does_not_keep_row() {
        assert!(!has_economic_effect(&report_row(150.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_amortized_pl_alone_does_not_keep_row() {
        assert!(!has_economic_effect(&report_row(0.0, 0.0, -5.0, 0.0)));
    }

    #[test]
    fn test_either_measure_keeps_row() {
        assert!(has_economic_effect(&report_row(0.0, 333.0, 333.0, 0.0)));
        assert!(has_economic_effect(&report_row(0.0, 0.0, 0.0, -1.5)));
    }

    #[test]
    fn test_tiny_values_are_not_rounded_away() {
        assert!(has_economic_effect(&report_row(0.0, 0.00000001, 0.0, 0.0)));
    }

    #[test]
    fn test_retain_keeps_order() {
        let table = Table::from_rows(vec![
            report_row(1.0, 1.0, 0.0, 0.0),
            report_row(1.0, 0.0, 0.0, 0.0),
            report_row(1.0, 0.0, 0.0, 2.0),
        ]);
        let kept = retain_economic_rows(table);
        let income: Vec<f64> = kept.rows().iter().map(|r| r.ca_income).collect();
        assert_eq!(income, vec![0.0, 2.0]);
    }
}
