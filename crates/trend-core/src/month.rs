//! Month normalization
//!
//! Parses `YYYY-MM` keys into first-of-month dates, adds them as a `month`
//! column and stably sorts rows by it. Unparseable keys become `Null` and sort
//! last; they are counted, never dropped.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;

use crate::data_model::{Column, Scalar, Table};
use crate::error::{Result, TrendError};
use crate::findings::{Finding, FindingKind};

/// Name of the parsed temporal key column
pub const MONTH_COLUMN: &str = "month";

lazy_static! {
    static ref YEAR_MONTH: Regex = Regex::new(r"^(\d{4})-(\d{2})$").unwrap();
}

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_year_month(text: &str) -> Option<NaiveDate> {
    let caps = YEAR_MONTH.captures(text.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Temporal key of a cell: text is parsed, already-normalized months pass through.
pub fn month_key(value: &Scalar) -> Option<NaiveDate> {
    match value {
        Scalar::Month(d) => Some(*d),
        Scalar::Text(s) => parse_year_month(s),
        _ => None,
    }
}

pub fn format_year_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Result of [`normalize_months`]
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub table: Table,
    pub unparsed: usize,
    /// Soft finding when `unparsed > 0`
    pub finding: Option<Finding>,
    /// First and last parsed month
    pub coverage: Option<(NaiveDate, NaiveDate)>,
}

/// Add a sortable `month` column derived from `month_col` and sort by it.
///
/// The sort is stable: rows with equal keys keep their relative order.
pub fn normalize_months(table: &Table, month_col: &str, label: &str) -> Result<NormalizedTable> {
    let source = table.column(month_col).ok_or_else(|| {
        TrendError::SchemaError(Finding::failure(
            FindingKind::MissingColumns,
            label,
            format!("missing required columns: [{}]", month_col),
            1,
        ))
    })?;

    let keys: Vec<Option<NaiveDate>> = source.values.iter().map(month_key).collect();
    let unparsed = keys.iter().filter(|k| k.is_none()).count();

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| match (keys[a], keys[b]) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let month_values = keys.iter().map(|k| Scalar::from(*k)).collect();
    let table = table
        .with_column(Column::new(MONTH_COLUMN, month_values))?
        .select_rows(&order)?;

    let parsed = keys.iter().flatten();
    let coverage = parsed.clone().min().copied().zip(parsed.max().copied());

    let finding = (unparsed > 0).then(|| {
        Finding::warning(
            FindingKind::UnparsedMonths,
            label,
            format!("'{}' produced {} unparsed month values", month_col, unparsed),
            unparsed,
        )
    });

    Ok(NormalizedTable {
        table,
        unparsed,
        finding,
        coverage,
    })
}
