//! Chart gates
//!
//! Threshold filtering of noisy low-volume rows, and the stability-gated
//! pivot of a two-group comparison into aligned series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use trend_core::{
    month_key, Finding, FindingKind, Result, Table, Threshold, TrendError, MONTH_COLUMN,
};

use crate::checks::check_required_columns;

/// Filtered copy of a table plus how many rows the gate removed
#[derive(Debug, Clone)]
pub struct Filtered {
    pub table: Table,
    pub dropped: usize,
}

impl Filtered {
    /// Soft finding describing the drop, if anything was dropped
    pub fn finding(&self, threshold: &Threshold, label: &str) -> Option<Finding> {
        (self.dropped > 0).then(|| dropped_rows_finding(label, threshold, self.dropped))
    }
}

pub fn dropped_rows_finding(label: &str, threshold: &Threshold, dropped: usize) -> Finding {
    Finding::warning(
        FindingKind::DroppedRows,
        label,
        format!(
            "chart {} dropped {} rows failing {}",
            threshold.chart,
            dropped,
            threshold.rule()
        ),
        dropped,
    )
}

/// Keep rows whose metric satisfies the threshold.
///
/// Rows with a null or non-numeric metric fail the predicate. The source
/// table is untouched.
pub fn apply_threshold(table: &Table, threshold: &Threshold, label: &str) -> Result<Filtered> {
    check_required_columns(table, &[threshold.metric.as_str()], label)?;
    let column = table
        .column(&threshold.metric)
        .ok_or_else(|| TrendError::TableError(format!("column '{}' vanished", threshold.metric)))?;

    let keep: Vec<usize> = column
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.as_f64().map(|x| threshold.admits(x)).unwrap_or(false))
        .map(|(i, _)| i)
        .collect();

    Ok(Filtered {
        dropped: table.row_count() - keep.len(),
        table: table.select_rows(&keep)?,
    })
}

/// Two numeric series aligned on a month index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairSeries {
    pub index: Vec<NaiveDate>,
    pub group_a: Vec<f64>,
    pub group_b: Vec<f64>,
}

impl PairSeries {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Per-index `a - b`
    pub fn deltas(&self) -> Vec<f64> {
        self.group_a
            .iter()
            .zip(&self.group_b)
            .map(|(a, b)| a - b)
            .collect()
    }

    /// Pair two numeric columns of the same rows; rows with a missing month
    /// or value are skipped.
    pub fn from_columns(table: &Table, a: &str, b: &str, label: &str) -> Result<Self> {
        check_required_columns(table, &[MONTH_COLUMN, a, b], label)?;
        let mut pairs = PairSeries::default();
        for row in 0..table.row_count() {
            let month = table.value(MONTH_COLUMN, row).and_then(month_key);
            let va = table.value(a, row).and_then(|v| v.as_f64());
            let vb = table.value(b, row).and_then(|v| v.as_f64());
            if let (Some(m), Some(x), Some(y)) = (month, va, vb) {
                pairs.index.push(m);
                pairs.group_a.push(x);
                pairs.group_b.push(y);
            }
        }
        Ok(pairs)
    }
}

/// Declares how to split rows into two groups by a flag column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSpec {
    /// Flag column; `false` rows form group A, `true` rows group B
    pub flag_column: String,
    pub value_column: String,
    /// Per-group sample-size gate (metric = the count column)
    pub gate: Threshold,
}

impl PairSpec {
    pub fn required_columns(&self) -> Vec<&str> {
        vec![
            MONTH_COLUMN,
            self.flag_column.as_str(),
            self.value_column.as_str(),
            self.gate.metric.as_str(),
        ]
    }
}

/// Result of [`pivot_pair`]
#[derive(Debug, Clone)]
pub struct Pivot {
    pub pairs: PairSeries,
    /// Input rows not represented in `pairs`
    pub dropped_rows: usize,
    pub dropped_months: usize,
}

impl Pivot {
    pub fn finding(&self, spec: &PairSpec, label: &str) -> Option<Finding> {
        (self.dropped_rows > 0).then(|| {
            Finding::warning(
                FindingKind::DroppedRows,
                label,
                format!(
                    "chart {} dropped {} rows ({} months) failing {}",
                    spec.gate.chart,
                    self.dropped_rows,
                    self.dropped_months,
                    spec.gate.rule()
                ),
                self.dropped_rows,
            )
        })
    }
}

#[derive(Default)]
struct MonthSlots {
    a: Option<(f64, f64)>,
    b: Option<(f64, f64)>,
}

/// Grouped join of flag-split rows on the month index.
///
/// A month is kept only when both groups are present and both meet the
/// sample-size gate. Rows that cannot be placed (missing month, flag, value
/// or count, or a repeated month/flag pair) count as dropped.
pub fn pivot_pair(table: &Table, spec: &PairSpec, label: &str) -> Result<Pivot> {
    check_required_columns(table, &spec.required_columns(), label)?;

    let mut months: BTreeMap<NaiveDate, MonthSlots> = BTreeMap::new();
    for row in 0..table.row_count() {
        let month = table.value(MONTH_COLUMN, row).and_then(month_key);
        let flag = table.value(&spec.flag_column, row).and_then(|v| v.as_flag());
        let value = table.value(&spec.value_column, row).and_then(|v| v.as_f64());
        let count = table.value(&spec.gate.metric, row).and_then(|v| v.as_f64());

        let (Some(month), Some(flag), Some(value), Some(count)) = (month, flag, value, count) else {
            continue;
        };

        let slots = months.entry(month).or_default();
        let slot = if flag { &mut slots.b } else { &mut slots.a };
        if slot.is_none() {
            *slot = Some((count, value));
        }
    }

    let mut pairs = PairSeries::default();
    let mut dropped_months = 0;
    for (month, slots) in months {
        match (slots.a, slots.b) {
            (Some((count_a, a)), Some((count_b, b)))
                if spec.gate.admits(count_a) && spec.gate.admits(count_b) =>
            {
                pairs.index.push(month);
                pairs.group_a.push(a);
                pairs.group_b.push(b);
            }
            _ => dropped_months += 1,
        }
    }

    Ok(Pivot {
        dropped_rows: table.row_count() - 2 * pairs.len(),
        dropped_months,
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trend_core::{normalize_months, Scalar};

    fn orders(rows: &[(&str, i64)]) -> Table {
        let rows = rows
            .iter()
            .map(|(m, n)| vec![Scalar::from(*m), Scalar::Int(*n)])
            .collect();
        Table::from_rows(["purchase_month", "total_orders"], rows).unwrap()
    }

    fn reviews(rows: &[(&str, i64, i64, f64)]) -> Table {
        let rows = rows
            .iter()
            .map(|(m, late, n, score)| {
                vec![Scalar::from(*m), Scalar::Int(*late), Scalar::Int(*n), Scalar::Float(*score)]
            })
            .collect();
        let table = Table::from_rows(
            ["purchase_month", "is_late", "review_count", "avg_review_score"],
            rows,
        )
        .unwrap();
        normalize_months(&table, "purchase_month", "reviews").unwrap().table
    }

    fn review_spec() -> PairSpec {
        PairSpec {
            flag_column: "is_late".to_string(),
            value_column: "avg_review_score".to_string(),
            gate: Threshold::at_least("03_review_score_by_delivery", "review_count", 30.0)
                .per_group(),
        }
    }

    #[test]
    fn test_threshold_drops_low_volume() {
        let threshold = Threshold::at_least("01_orders_per_month", "total_orders", 100.0);
        let table = orders(&[("2021-01", 120), ("2021-02", 50), ("2021-04", 130)]);
        let filtered = apply_threshold(&table, &threshold, "orders/month").unwrap();
        assert_eq!(filtered.dropped, 1);
        assert_eq!(filtered.table.row_count(), 2);
        let finding = filtered.finding(&threshold, "orders/month").unwrap();
        assert_eq!(
            finding.message,
            "chart 01_orders_per_month dropped 1 rows failing total_orders >= 100"
        );
    }

    #[test]
    fn test_threshold_missing_metric_fails_hard() {
        let threshold = Threshold::at_least("c", "revenue", 1.0);
        let err =
            apply_threshold(&orders(&[("2021-01", 1)]), &threshold, "orders/month").unwrap_err();
        assert!(err.finding().is_some());
    }

    #[test]
    fn test_null_metric_fails_predicate() {
        let table =
            Table::from_rows(["total_orders"], vec![vec![Scalar::Null], vec![Scalar::Int(500)]])
                .unwrap();
        let threshold = Threshold::at_least("c", "total_orders", 100.0);
        let filtered = apply_threshold(&table, &threshold, "t").unwrap();
        assert_eq!(filtered.dropped, 1);
    }

    #[test]
    fn test_pivot_requires_both_groups_stable() {
        let table = reviews(&[
            ("2021-01", 0, 200, 4.3),
            ("2021-01", 1, 40, 3.1),
            ("2021-02", 0, 210, 4.2),
            ("2021-02", 1, 12, 2.0),
            ("2021-03", 0, 220, 4.4),
        ]);
        let pivot = pivot_pair(&table, &review_spec(), "reviews").unwrap();
        assert_eq!(pivot.pairs.len(), 1);
        assert_eq!(pivot.pairs.group_a, vec![4.3]);
        assert_eq!(pivot.pairs.group_b, vec![3.1]);
        assert_eq!(pivot.dropped_rows, 3);
        assert_eq!(pivot.dropped_months, 2);
        let finding = pivot.finding(&review_spec(), "reviews").unwrap();
        assert!(finding.message.contains("dropped 3 rows (2 months)"));
    }

    #[test]
    fn test_pivot_is_ordered_by_month() {
        let table = reviews(&[
            ("2021-02", 1, 40, 3.0),
            ("2021-01", 0, 40, 4.0),
            ("2021-02", 0, 40, 4.5),
            ("2021-01", 1, 40, 3.5),
        ]);
        let pivot = pivot_pair(&table, &review_spec(), "reviews").unwrap();
        assert_eq!(pivot.pairs.deltas(), vec![0.5, 1.5]);
        assert_eq!(pivot.dropped_rows, 0);
        assert!(pivot.finding(&review_spec(), "reviews").is_none());
    }

    #[test]
    fn test_pivot_without_month_column_fails_hard() {
        let raw = Table::from_rows(["is_late"], vec![vec![Scalar::Int(0)]]).unwrap();
        assert!(pivot_pair(&raw, &review_spec(), "reviews").is_err());
    }

    proptest! {
        #[test]
        fn prop_dropped_equals_length_difference(
            volumes in proptest::collection::vec(proptest::option::of(0i64..300), 0..40)
        ) {
            let table = Table::from_rows(
                ["total_orders"],
                volumes.iter().map(|v| vec![Scalar::from(*v)]).collect(),
            ).unwrap();
            let threshold = Threshold::at_least("c", "total_orders", 100.0);
            let filtered = apply_threshold(&table, &threshold, "t").unwrap();

            prop_assert_eq!(filtered.dropped, table.row_count() - filtered.table.row_count());
            for v in &filtered.table.column("total_orders").unwrap().values {
                prop_assert!(threshold.admits(v.as_f64().unwrap()));
            }
        }
    }
}
