//! Trend Extract: metric queries, data sources and CSV export
//!
//! The extractor runs declared queries against a [`DataSource`] and hands
//! back plain tables. It does no transformation beyond the query itself.
//!
//! # Example
//!
//! ```ignore
//! use trend_extract::{monthly_trend_pack, DataSource, SqliteSource};
//!
//! let source = SqliteSource::new("data/olist.sqlite3");
//! for query in monthly_trend_pack() {
//!     let table = source.fetch(&query)?;
//!     let export = trend_extract::table_to_csv(&table)?;
//! }
//! ```

pub mod export;
pub mod queries;
pub mod source;

pub use export::{table_to_csv, CsvExport};
pub use queries::{monthly_trend_pack, BindValue, MetricQuery};
pub use source::{DataSource, MemorySource, SqliteSource};
