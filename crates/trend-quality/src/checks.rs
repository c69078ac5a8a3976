//! Data quality checks
//!
//! Five independent checks over one table. Each is a pure function of the
//! table and its parameters; none mutate the input. Only the required-columns
//! check fails hard, everything else yields soft findings.

use std::collections::HashSet;

use trend_core::{month_key, Finding, FindingKind, Result, ScalarKey, Table, TrendError};

/// Fail hard if any declared column is absent.
pub fn check_required_columns<S: AsRef<str>>(
    table: &Table,
    required: &[S],
    label: &str,
) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| !table.has_column(c))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(TrendError::SchemaError(Finding::failure(
        FindingKind::MissingColumns,
        label,
        format!("missing required columns: [{}]", missing.join(", ")),
        missing.len(),
    )))
}

/// One finding per declared column holding nulls.
pub fn check_nulls<S: AsRef<str>>(table: &Table, columns: &[S], label: &str) -> Vec<Finding> {
    columns
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let nulls = table.column(name)?.null_count();
            (nulls > 0).then(|| {
                Finding::warning(
                    FindingKind::NullValues,
                    label,
                    format!("column '{}' has {} NULLs", name, nulls),
                    nulls,
                )
            })
        })
        .collect()
}

/// Rows whose full key tuple matches an earlier row's tuple.
pub fn count_duplicate_keys<S: AsRef<str>>(table: &Table, keys: &[S]) -> usize {
    let columns: Vec<_> = keys.iter().filter_map(|k| table.column(k.as_ref())).collect();
    if columns.len() != keys.len() {
        return 0;
    }

    let mut seen: HashSet<Vec<ScalarKey>> = HashSet::with_capacity(table.row_count());
    (0..table.row_count())
        .filter(|&row| {
            let tuple = columns.iter().map(|c| c.values[row].key()).collect();
            !seen.insert(tuple)
        })
        .count()
}

/// Warn if rows are duplicated at the declared grain (`month_col` + `extra_keys`).
pub fn check_unique_grain<S: AsRef<str>>(
    table: &Table,
    month_col: &str,
    extra_keys: &[S],
    label: &str,
) -> Vec<Finding> {
    let keys: Vec<&str> = std::iter::once(month_col)
        .chain(extra_keys.iter().map(AsRef::as_ref))
        .collect();

    let duplicates = count_duplicate_keys(table, &keys);
    if duplicates == 0 {
        return Vec::new();
    }

    vec![Finding::warning(
        FindingKind::DuplicateKeys,
        label,
        format!("found {} duplicate rows by keys=[{}]", duplicates, keys.join(", ")),
        duplicates,
    )]
}

/// One finding per gap wider than `gap_days` between consecutive distinct months.
pub fn check_month_continuity(
    table: &Table,
    month_col: &str,
    label: &str,
    gap_days: i64,
) -> Vec<Finding> {
    let Some(column) = table.column(month_col) else {
        return Vec::new();
    };

    let mut months: Vec<_> = column.values.iter().filter_map(month_key).collect();
    months.sort();
    months.dedup();

    months
        .windows(2)
        .filter_map(|pair| {
            let days = (pair[1] - pair[0]).num_days();
            (days > gap_days).then(|| {
                Finding::warning(
                    FindingKind::MonthGap,
                    label,
                    format!(
                        "possible missing months: gap before {} = {} days",
                        pair[1].format("%Y-%m-%d"),
                        days
                    ),
                    days as usize,
                )
            })
        })
        .collect()
}

/// Warn if a numeric column holds negative values; no-op when absent.
pub fn check_non_negative(table: &Table, column: &str, label: &str) -> Vec<Finding> {
    let Some(values) = table.column(column) else {
        return Vec::new();
    };

    let negatives = values
        .values
        .iter()
        .filter_map(|v| v.as_f64())
        .filter(|v| *v < 0.0)
        .count();

    if negatives == 0 {
        return Vec::new();
    }

    vec![Finding::warning(
        FindingKind::NegativeValues,
        label,
        format!("'{}' has {} negative values", column, negatives),
        negatives,
    )]
}
