//! Findings, thresholds and insights: the records that accumulate over a run
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a finding aborts the stage that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Warning,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingColumns,
    NullValues,
    DuplicateKeys,
    MonthGap,
    NegativeValues,
    UnparsedMonths,
    DroppedRows,
    EmptyComparison,
}

/// A structured QA message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub level: FindingLevel,
    pub kind: FindingKind,
    /// Dataset or stage label (e.g. "orders/month")
    pub label: String,
    pub message: String,
    /// Rows or values affected; elapsed days for a month gap
    pub count: usize,
}

impl Finding {
    pub fn warning(
        kind: FindingKind,
        label: impl Into<String>,
        message: impl Into<String>,
        count: usize,
    ) -> Self {
        Self {
            level: FindingLevel::Warning,
            kind,
            label: label.into(),
            message: message.into(),
            count,
        }
    }

    pub fn failure(
        kind: FindingKind,
        label: impl Into<String>,
        message: impl Into<String>,
        count: usize,
    ) -> Self {
        Self {
            level: FindingLevel::Failure,
            kind,
            label: label.into(),
            message: message.into(),
            count,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.level == FindingLevel::Failure
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            FindingLevel::Warning => "QA WARNING",
            FindingLevel::Failure => "QA FAILURE",
        };
        write!(f, "[{}] {}: {}", tag, self.label, self.message)
    }
}

/// Comparison operator of a threshold rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "<")]
    Below,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::Above => ">",
            Self::AtMost => "<=",
            Self::Below => "<",
        }
    }

    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::AtLeast => lhs >= rhs,
            Self::Above => lhs > rhs,
            Self::AtMost => lhs <= rhs,
            Self::Below => lhs < rhs,
        }
    }
}

/// A declared `(metric, operator, value)` row filter, scoped to one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub chart: String,
    pub metric: String,
    pub op: Comparison,
    pub value: f64,
    /// Applied per group of a two-group comparison rather than per row
    #[serde(default)]
    pub per_group: bool,
}

impl Threshold {
    pub fn new(
        chart: impl Into<String>,
        metric: impl Into<String>,
        op: Comparison,
        value: f64,
    ) -> Self {
        Self {
            chart: chart.into(),
            metric: metric.into(),
            op,
            value,
            per_group: false,
        }
    }

    pub fn at_least(chart: impl Into<String>, metric: impl Into<String>, value: f64) -> Self {
        Self::new(chart, metric, Comparison::AtLeast, value)
    }

    pub fn per_group(mut self) -> Self {
        self.per_group = true;
        self
    }

    pub fn admits(&self, observed: f64) -> bool {
        self.op.holds(observed, self.value)
    }

    /// Rule text without the chart, e.g. `total_orders >= 100`
    pub fn rule(&self) -> String {
        let mut rule = format!("{} {} {}", self.metric, self.op.symbol(), self.value);
        if self.per_group {
            rule.push_str(" (each group)");
        }
        rule
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.chart, self.rule())
    }
}

/// Report topic an insight belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Orders,
    Revenue,
    Reviews,
    LateDelivery,
}

impl Topic {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Revenue => "revenue",
            Self::Reviews => "reviews",
            Self::LateDelivery => "late_delivery",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Summary statistics of a per-index delta series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaStats {
    pub n: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// A narrative statement derived from a numeric comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub topic: Topic,
    pub text: String,
    pub stats: DeltaStats,
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.topic, self.text)
    }
}
