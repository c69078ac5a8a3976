//! Trend Core: Table, Findings, Run Context
//!
//! Shared vocabulary of the monthly trend pack: the tabular result passed
//! between stages, the structured findings/insights they emit, and the
//! context object that accumulates them for one run.

pub mod context;
pub mod data_model;
pub mod error;
pub mod findings;
pub mod month;

pub use context::{Artifact, ArtifactKind, RunContext};
pub use data_model::{Column, Scalar, ScalarKey, Table};
pub use error::{Result, TrendError};
pub use findings::{
    Comparison, DeltaStats, Finding, FindingKind, FindingLevel, Insight, Threshold, Topic,
};
pub use month::{
    format_year_month, month_key, normalize_months, parse_year_month, NormalizedTable,
    MONTH_COLUMN,
};

/// Trend pack engine version
pub const TRENDPACK_VERSION: &str = "1.0.0";

/// `blake3:<hex>` fingerprint used for artifacts and query texts
pub fn digest(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes))
}
