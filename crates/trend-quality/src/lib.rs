//! Trend Quality: QA validation and chart gates
//!
//! This crate holds the data-quality checks applied to every extracted
//! dataset, the profile that tunes them, and the gates that filter noisy
//! rows out of charts.
//!
//! # Example
//!
//! ```ignore
//! use trend_quality::{DatasetChecks, QaProfile};
//!
//! let checks = DatasetChecks::new("revenue/month", "purchase_month")
//!     .require(["purchase_month", "revenue"])
//!     .not_null(["purchase_month", "revenue"])
//!     .non_negative("revenue");
//!
//! let findings = checks.run(&table, &QaProfile::default())?;
//! ```

pub mod checks;
pub mod gate;
pub mod profile;

pub use checks::{
    check_month_continuity, check_non_negative, check_nulls, check_required_columns,
    check_unique_grain, count_duplicate_keys,
};
pub use gate::{
    apply_threshold, dropped_rows_finding, pivot_pair, Filtered, PairSeries, PairSpec, Pivot,
};
pub use profile::QaProfile;

use serde::{Deserialize, Serialize};
use trend_core::{Finding, Result, Table};

/// The QA declarations for one dataset, run in a fixed order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetChecks {
    pub label: String,
    pub month_column: String,
    pub required: Vec<String>,
    pub not_null: Vec<String>,
    /// Keys beyond the month that define the grain
    pub grain: Vec<String>,
    pub non_negative: Option<String>,
}

impl DatasetChecks {
    pub fn new(label: impl Into<String>, month_column: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            month_column: month_column.into(),
            ..Self::default()
        }
    }

    pub fn require<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.required = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn not_null<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.not_null = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn grain<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.grain = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn non_negative(mut self, column: impl Into<String>) -> Self {
        self.non_negative = Some(column.into());
        self
    }

    /// Run every declared check: required columns first (hard failure),
    /// then nulls, grain, continuity and sign (soft findings, in that order).
    pub fn run(&self, table: &Table, profile: &QaProfile) -> Result<Vec<Finding>> {
        check_required_columns(table, &self.required, &self.label)?;

        let mut findings = check_nulls(table, &self.not_null, &self.label);
        findings.extend(check_unique_grain(table, &self.month_column, &self.grain, &self.label));
        findings.extend(check_month_continuity(
            table,
            &self.month_column,
            &self.label,
            profile.month_gap_days,
        ));
        if let Some(column) = &self.non_negative {
            findings.extend(check_non_negative(table, column, &self.label));
        }

        tracing::debug!(label = %self.label, findings = findings.len(), "dataset checks complete");
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trend_core::{FindingKind, Scalar};

    fn revenue() -> DatasetChecks {
        DatasetChecks::new("revenue/month", "purchase_month")
            .require(["purchase_month", "revenue"])
            .not_null(["purchase_month", "revenue"])
            .non_negative("revenue")
    }

    #[test]
    fn test_run_collects_in_order() {
        let table = Table::from_rows(
            ["purchase_month", "revenue"],
            vec![
                vec!["2021-01".into(), Scalar::Float(-5.0)],
                vec!["2021-01".into(), Scalar::Null],
                vec!["2021-04".into(), Scalar::Float(10.0)],
            ],
        )
        .unwrap();

        let kinds: Vec<FindingKind> = revenue()
            .run(&table, &QaProfile::default())
            .unwrap()
            .iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                FindingKind::NullValues,
                FindingKind::DuplicateKeys,
                FindingKind::MonthGap,
                FindingKind::NegativeValues,
            ]
        );
    }

    #[test]
    fn test_run_aborts_on_schema_violation() {
        let table = Table::from_rows(["purchase_month"], vec![vec!["2021-01".into()]]).unwrap();
        assert!(revenue().run(&table, &QaProfile::default()).is_err());
    }

    #[test]
    fn test_clean_dataset_has_no_findings() {
        let table = Table::from_rows(
            ["purchase_month", "revenue"],
            vec![
                vec!["2021-01".into(), Scalar::Float(5.0)],
                vec!["2021-02".into(), Scalar::Float(6.0)],
            ],
        )
        .unwrap();
        assert!(revenue().run(&table, &QaProfile::default()).unwrap().is_empty());
    }
}
