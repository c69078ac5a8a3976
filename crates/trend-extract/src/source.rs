//! Data sources
//!
//! A [`DataSource`] turns a [`MetricQuery`] into a [`Table`]. Failures are
//! fatal `SourceError`s; nothing is retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSql, ValueRef};
use rusqlite::{Connection, OpenFlags};
use trend_core::{Column, Result, Scalar, Table, TrendError};

use crate::queries::MetricQuery;

/// Provider of tabular query results.
///
/// Implementations must be shareable across threads: the runner issues
/// independent extractions concurrently.
pub trait DataSource: Send + Sync {
    fn fetch(&self, query: &MetricQuery) -> Result<Table>;

    /// One line identifying the source for the reproducibility notes
    fn describe(&self) -> String;
}

/// SQLite database file, opened read-only per query
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            TrendError::SourceError(format!("cannot open {}: {}", self.path.display(), e))
        })
    }
}

fn scalar_from(value: ValueRef<'_>) -> Result<Scalar> {
    Ok(match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Integer(i) => Scalar::Int(i),
        ValueRef::Real(f) => Scalar::Float(f),
        ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => {
            return Err(TrendError::SourceError("BLOB values are not supported".into()))
        }
    })
}

impl DataSource for SqliteSource {
    fn fetch(&self, query: &MetricQuery) -> Result<Table> {
        let reject = |e: rusqlite::Error| TrendError::SourceError(format!("{}: {}", query.id, e));

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&query.sql).map_err(reject)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let params: Vec<(&str, &dyn ToSql)> = query
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut columns: Vec<Vec<Scalar>> = vec![Vec::new(); names.len()];
        let mut rows = stmt.query(params.as_slice()).map_err(reject)?;
        while let Some(row) = rows.next().map_err(reject)? {
            for (idx, slot) in columns.iter_mut().enumerate() {
                slot.push(scalar_from(row.get_ref(idx).map_err(reject)?)?);
            }
        }

        let table = Table::new(
            names
                .into_iter()
                .zip(columns)
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )?;
        tracing::info!(query = %query.id, rows = table.row_count(), "extracted");
        Ok(table)
    }

    fn describe(&self) -> String {
        format!("sqlite database {} (read-only)", self.path.display())
    }
}

/// Fixed tables keyed by query id
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, query_id: impl Into<String>, table: Table) -> Self {
        self.tables.insert(query_id.into(), table);
        self
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, query: &MetricQuery) -> Result<Table> {
        self.tables
            .get(&query.id)
            .cloned()
            .ok_or_else(|| TrendError::SourceError(format!("{}: no table registered", query.id)))
    }

    fn describe(&self) -> String {
        format!("in-memory source ({} tables)", self.tables.len())
    }
}
