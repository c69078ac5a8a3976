//! Insight generation from paired series
//!
//! Turns an aligned pair of series into one narrative statement about their
//! per-month difference.

use trend_core::{format_year_month, DeltaStats, Finding, FindingKind, Insight, Topic};
use trend_quality::PairSeries;

/// Outcome of a delta comparison
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOutcome {
    Insight(Insight),
    /// Nothing survived the gates; reported instead of an empty summary
    Empty(Finding),
}

/// Mean, minimum and maximum of a delta series; `None` when empty.
pub fn delta_stats(deltas: &[f64]) -> Option<DeltaStats> {
    if deltas.is_empty() {
        return None;
    }

    let sum: f64 = deltas.iter().sum();
    let min = deltas.iter().copied().fold(f64::INFINITY, f64::min);
    let max = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(DeltaStats {
        n: deltas.len(),
        mean: sum / deltas.len() as f64,
        min,
        max,
    })
}

/// Describe `group_a - group_b` over the aligned months.
///
/// `subject` names the difference, e.g. "On-time minus late average review
/// score".
pub fn delta_insight(
    topic: Topic,
    pairs: &PairSeries,
    subject: &str,
    label: &str,
    precision: usize,
) -> DeltaOutcome {
    let Some(stats) = delta_stats(&pairs.deltas()) else {
        return DeltaOutcome::Empty(Finding::warning(
            FindingKind::EmptyComparison,
            label,
            format!("no months passed the gate; {} not computed", subject.to_lowercase()),
            0,
        ));
    };

    let span = match (pairs.index.first(), pairs.index.last()) {
        (Some(first), Some(last)) => format!(
            " ({} to {})",
            format_year_month(*first),
            format_year_month(*last)
        ),
        _ => String::new(),
    };

    let text = format!(
        "{}: mean {:.p$}, min {:.p$}, max {:.p$} across {} months{}",
        subject,
        stats.mean,
        stats.min,
        stats.max,
        stats.n,
        span,
        p = precision
    );

    DeltaOutcome::Insight(Insight { topic, text, stats })
}
