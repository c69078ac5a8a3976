//! Data Model: Table, Column, Scalar
//!
//! A `Table` is the rectangular result every stage passes along. Columns are
//! named and ordered; all of them have the same length.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, TrendError};

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// First day of a calendar month
    Month(NaiveDate),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view; text and flags are not coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Boolean view of a flag column (`1`/`0`, `true`/`false`).
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(1) => Some(true),
            Self::Int(0) => Some(false),
            Self::Float(f) if *f == 1.0 => Some(true),
            Self::Float(f) if *f == 0.0 => Some(false),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Hashable identity used for key-tuple comparisons.
    /// Nulls compare equal to each other.
    pub fn key(&self) -> ScalarKey {
        match self {
            Self::Null => ScalarKey::Null,
            Self::Int(i) => ScalarKey::Int(*i),
            Self::Float(f) => ScalarKey::Float(f.to_bits()),
            Self::Text(s) => ScalarKey::Text(s.clone()),
            Self::Bool(b) => ScalarKey::Bool(*b),
            Self::Month(d) => ScalarKey::Month(*d),
        }
    }

    /// Field text for delimited exports; null is the empty string.
    pub fn to_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Self::Month(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            other => f.write_str(&other.to_field()),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Self::Month(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKey {
    Null,
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
    Month(NaiveDate),
}

/// A named, homogeneous sequence of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// In-memory rectangular dataset with named, equal-length columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, rejecting ragged or duplicated columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TrendError::TableError(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TrendError::TableError(format!(
                    "column '{}' has {} values, expected {}",
                    bad.name,
                    bad.len(),
                    expected
                )));
            }
        }

        Ok(Self { columns })
    }

    /// Build a table from row-major data.
    pub fn from_rows<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Scalar>>,
    ) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut columns: Vec<Vec<Scalar>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();

        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(TrendError::TableError(format!(
                    "row {} has {} values, expected {}",
                    idx,
                    row.len(),
                    names.len()
                )));
            }
            for (slot, value) in columns.iter_mut().zip(row) {
                slot.push(value);
            }
        }

        Self::new(
            names
                .into_iter()
                .zip(columns)
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn value(&self, column: &str, row: usize) -> Option<&Scalar> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Copy of the given rows, in the given order. Any index past the last
    /// row is a [`TrendError::TableError`].
    pub fn select_rows(&self, indices: &[usize]) -> Result<Table> {
        let rows = self.row_count();
        if let Some(bad) = indices.iter().find(|&&i| i >= rows) {
            return Err(TrendError::TableError(format!(
                "row {} out of range, table has {} rows",
                bad, rows
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    indices.iter().map(|&i| c.values[i].clone()).collect(),
                )
            })
            .collect();
        Ok(Table { columns })
    }

    /// Copy with `column` appended, or replacing a column of the same name.
    pub fn with_column(&self, column: Column) -> Result<Table> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(TrendError::TableError(format!(
                "column '{}' has {} values, table has {} rows",
                column.name,
                column.len(),
                self.row_count()
            )));
        }

        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => columns.push(column),
        }
        Ok(Table { columns })
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.values.iter().take(n).cloned().collect()))
            .collect();
        Table { columns }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column_names().join(" | "))?;
        for row in 0..self.row_count() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.values[row].to_string())
                .collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        Ok(())
    }
}
