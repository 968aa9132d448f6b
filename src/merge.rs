use crate::rows::{
    BeneficialOwnerRow, CaIncomeRow, MergedRow, RealizedAmortizationRow, RealizedPlDetail,
    RealizedPlRow, Tabular,
};
use crate::table::Table;
use log::debug;
use std::collections::BTreeSet;

/// One output pairing of a full outer join.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Joined<'a, L, R> {
    Both(&'a L, &'a R),
    LeftOnly(&'a L),
    RightOnly(&'a R),
}

/// Left join on a composite key.
///
/// Each left row pairs with every right row sharing its key, in right table
/// order, or once with `None` when nothing matches. Left order is preserved.
pub fn left_join<L, R, K, T>(
    left: &Table<L>,
    right: &Table<R>,
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
    mut combine: impl FnMut(&L, Option<&R>) -> T,
) -> Vec<T>
where
    L: Tabular,
    R: Tabular,
    K: Ord,
{
    let index = right.index_by(right_key);
    let mut joined = Vec::with_capacity(left.len());

    for row in left.rows() {
        match index.get(&left_key(row)) {
            Some(matches) => joined.extend(matches.iter().map(|m| combine(row, Some(*m)))),
            None => joined.push(combine(row, None)),
        }
    }

    joined
}

/// Full outer join on a composite key.
///
/// Produces the left join first, then every right row whose key matched no
/// left row, in right table order.
pub fn full_outer_join<L, R, K, T>(
    left: &Table<L>,
    right: &Table<R>,
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
    mut combine: impl FnMut(Joined<'_, L, R>) -> T,
) -> Vec<T>
where
    L: Tabular,
    R: Tabular,
    K: Ord,
{
    let index = right.index_by(&right_key);
    let mut matched: BTreeSet<&K> = BTreeSet::new();
    let mut joined = Vec::with_capacity(left.len() + right.len());

    for row in left.rows() {
        match index.get_key_value(&left_key(row)) {
            Some((key, matches)) => {
                matched.insert(key);
                joined.extend(matches.iter().map(|m| combine(Joined::Both(row, *m))));
            }
            None => joined.push(combine(Joined::LeftOnly(row))),
        }
    }

    for row in right.rows() {
        if !matched.contains(&right_key(row)) {
            joined.push(combine(Joined::RightOnly(row)));
        }
    }

    joined
}

/// Realized P&L with its amortization attached.
///
/// Every P&L row survives. A missing amortization stays `None` on the row but
/// counts as zero when deriving the amortized P&L.
pub fn realized_with_amortization(
    realized_pl: &Table<RealizedPlRow>,
    amortization: &Table<RealizedAmortizationRow>,
) -> Table<RealizedPlDetail> {
    let rows = left_join(
        realized_pl,
        amortization,
        RealizedPlRow::position_key,
        RealizedAmortizationRow::position_key,
        |pl, amortization| {
            let realized_amortization = amortization.map(|a| a.realized_amortization);
            RealizedPlDetail {
                key: pl.position_key(),
                realized_pl: pl.realized_pl,
                realized_amortization,
                clean_realized_pl: pl.realized_pl,
                amortized_realized_pl: pl.realized_pl - realized_amortization.unwrap_or(0.0),
            }
        },
    );
    Table::from_rows(rows)
}

/// Ownership rows with realized P&L attached.
///
/// P&L facts without an ownership row are dropped here: they have no event or
/// unit to complete the reporting grain.
pub fn attach_realized(
    ownership: &Table<BeneficialOwnerRow>,
    realized: &Table<RealizedPlDetail>,
) -> Table<MergedRow> {
    let rows = left_join(
        ownership,
        realized,
        BeneficialOwnerRow::position_key,
        |detail: &RealizedPlDetail| detail.key.clone(),
        |position, detail| MergedRow {
            portfolio: position.portfolio.clone(),
            instrument: position.instrument.clone(),
            lot_id: position.lot_id.clone(),
            contributor_id: position.contributor_id.clone(),
            event: position.event.clone(),
            date: position.date.clone(),
            unit: position.unit.clone(),
            quantity: Some(position.quantity),
            realized_pl: detail.map(|d| d.realized_pl),
            realized_amortization: detail.and_then(|d| d.realized_amortization),
            clean_realized_pl: detail.map(|d| d.clean_realized_pl),
            amortized_realized_pl: detail.map(|d| d.amortized_realized_pl),
            ca_income: None,
        },
    );
    Table::from_rows(rows)
}

/// Positions joined with corporate action income.
///
/// Outer on both sides: income can occur without a position movement on the
/// same day and must still reach the report.
pub fn attach_income(positions: &Table<MergedRow>, income: &Table<CaIncomeRow>) -> Table<MergedRow> {
    let rows = full_outer_join(
        positions,
        income,
        MergedRow::event_key,
        CaIncomeRow::event_key,
        |joined| match joined {
            Joined::Both(position, income) => MergedRow {
                ca_income: Some(income.ca_income),
                ..position.clone()
            },
            Joined::LeftOnly(position) => position.clone(),
            Joined::RightOnly(income) => MergedRow {
                portfolio: income.portfolio.clone(),
                instrument: income.instrument.clone(),
                lot_id: income.lot_id.clone(),
                contributor_id: income.contributor_id.clone(),
                event: income.event.clone(),
                date: income.date.clone(),
                unit: income.unit.clone(),
                quantity: None,
                realized_pl: None,
                realized_amortization: None,
                clean_realized_pl: None,
                amortized_realized_pl: None,
                ca_income: Some(income.ca_income),
            },
        },
    );
    Table::from_rows(rows)
}

/// Correlates all four balance classes into one merged table.
pub fn correlate(
    ownership: &Table<BeneficialOwnerRow>,
    realized_pl: &Table<RealizedPlRow>,
    amortization: &Table<RealizedAmortizationRow>,
    income: &Table<CaIncomeRow>,
) -> Table<MergedRow> {
    let realized = realized_with_amortization(realized_pl, amortization);
    let positions = attach_realized(ownership, &realized);
    let merged = attach_income(&positions, income);

    debug!(
        "Correlated {} ownership, {} realized and {} income rows into {} merged rows",
        ownership.len(),
        realized.len(),
        income.len(),
        merged.len()
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::Event;

    fn ownership(lot: &str, date: &str, quantity: f64) -> BeneficialOwnerRow {
        BeneficialOwnerRow {
            portfolio: "P".into(),
            instrument: "I".into(),
            lot_id: lot.into(),
            contributor_id: "C1".into(),
            event: Event::Purchase,
            date: date.into(),
            quantity,
            unit: "USD".into(),
        }
    }

    fn pl(lot: &str, date: &str, value: f64) -> RealizedPlRow {
        RealizedPlRow {
            portfolio: "P".into(),
            instrument: "I".into(),
            lot_id: lot.into(),
            contributor_id: "C1".into(),
            date: date.into(),
            realized_pl: value,
        }
    }

    fn amortization(lot: &str, date: &str, value: f64) -> RealizedAmortizationRow {
        RealizedAmortizationRow {
            portfolio: "P".into(),
            instrument: "I".into(),
            lot_id: lot.into(),
            contributor_id: "C1".into(),
            date: date.into(),
            realized_amortization: value,
        }
    }

    fn income(lot: &str, event: Event, date: &str, value: f64) -> CaIncomeRow {
        CaIncomeRow {
            portfolio: "P".into(),
            instrument: "I".into(),
            lot_id: lot.into(),
            contributor_id: "C1".into(),
            event,
            date: date.into(),
            ca_income: value,
            unit: "USD".into(),
        }
    }

    #[test]
    fn test_amortization_absent_is_none_but_not_subtracted() {
        let realized = realized_with_amortization(
            &Table::from_rows(vec![pl("L1", "2024-01-01", 333.0), pl("L2", "2024-01-01", 10.0)]),
            &Table::from_rows(vec![amortization("L2", "2024-01-01", 4.0)]),
        );
        let rows = realized.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].realized_amortization, None);
        assert_eq!(rows[0].amortized_realized_pl, 333.0);
        assert_eq!(rows[0].clean_realized_pl, 333.0);
        assert_eq!(rows[1].realized_amortization, Some(4.0));
        assert_eq!(rows[1].amortized_realized_pl, 6.0);
    }

    #[test]
    fn test_left_join_with_empty_right_keeps_all_left() {
        let merged = attach_realized(
            &Table::from_rows(vec![ownership("L1", "2024-01-01", 1.0), ownership("L2", "2024-01-02", 2.0)]),
            &Table::default(),
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.rows().iter().all(|r| r.realized_pl.is_none()));
    }

    #[test]
    fn test_non_matching_keys_never_pair() {
        let realized = realized_with_amortization(
            &Table::from_rows(vec![pl("L1", "2024-01-02", 50.0)]),
            &Table::default(),
        );
        let merged = attach_realized(
            &Table::from_rows(vec![ownership("L1", "2024-01-01", 1.0)]),
            &realized,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows()[0].clean_realized_pl, None);
    }

    #[test]
    fn test_pl_without_ownership_is_dropped() {
        let realized = realized_with_amortization(
            &Table::from_rows(vec![pl("L9", "2024-01-01", 50.0)]),
            &Table::default(),
        );
        let merged = attach_realized(&Table::default(), &realized);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_duplicate_keys_pair_every_match() {
        let realized = realized_with_amortization(
            &Table::from_rows(vec![pl("L1", "2024-01-01", 1.0), pl("L1", "2024-01-01", 2.0)]),
            &Table::default(),
        );
        let merged = attach_realized(
            &Table::from_rows(vec![ownership("L1", "2024-01-01", 5.0)]),
            &realized,
        );
        let values: Vec<Option<f64>> = merged.rows().iter().map(|r| r.realized_pl).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_income_outer_join_surfaces_unmatched_income() {
        let positions = attach_realized(
            &Table::from_rows(vec![ownership("L1", "2024-01-01", 5.0)]),
            &Table::default(),
        );
        let merged = attach_income(
            &positions,
            &Table::from_rows(vec![
                income("L1", Event::Purchase, "2024-01-01", 7.0),
                income("L1", Event::from_label("Coupon"), "2024-01-01", 3.0),
            ]),
        );

        let rows = merged.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].quantity, Some(5.0));
        assert_eq!(rows[0].ca_income, Some(7.0));
        assert_eq!(rows[1].event.label(), "Coupon");
        assert_eq!(rows[1].quantity, None);
        assert_eq!(rows[1].ca_income, Some(3.0));
    }

    #[test]
    fn test_full_outer_join_with_empty_sides() {
        let left: Table<RealizedPlRow> = Table::from_rows(vec![pl("L1", "2024-01-01", 1.0)]);
        let right: Table<RealizedPlRow> = Table::default();

        let kinds: Vec<&str> = full_outer_join(
            &left,
            &right,
            RealizedPlRow::position_key,
            RealizedPlRow::position_key,
            |joined| match joined {
                Joined::Both(..) => "both",
                Joined::LeftOnly(_) => "left",
                Joined::RightOnly(_) => "right",
            },
        );
        assert_eq!(kinds, vec!["left"]);

        let kinds: Vec<&str> = full_outer_join(
            &right,
            &left,
            RealizedPlRow::position_key,
            RealizedPlRow::position_key,
            |joined| match joined {
                Joined::Both(..) => "both",
                Joined::LeftOnly(_) => "left",
                Joined::RightOnly(_) => "right",
            },
        );
        assert_eq!(kinds, vec!["right"]);
    }
}
