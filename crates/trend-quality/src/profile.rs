//! QA Profiles
//!
//! The tunable constants of the validator and chart gates. The defaults are
//! the values the monthly trend pack has always used.

use serde::{Deserialize, Serialize};
use trend_core::TrendError;

/// Quality profile defining gap tolerance, volume gates and report caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaProfile {
    /// Profile name (e.g., "monthly-trend@1.0")
    pub name: String,

    // === Temporal continuity ===

    /// Elapsed days between consecutive months above which a gap is reported
    pub month_gap_days: i64,

    // === Chart gates ===

    /// Minimum volume (orders) for a month to be charted
    pub min_chart_volume: f64,

    /// Minimum sample size per group in a two-group comparison
    pub min_group_size: f64,

    // === Report ===

    /// Insights copied into the executive summary
    pub summary_insights: usize,

    /// Decimal places used in insight text
    pub insight_precision: usize,
}

impl QaProfile {
    pub fn monthly_trend() -> Self {
        Self {
            name: "monthly-trend@1.0".to_string(),
            month_gap_days: 35,
            min_chart_volume: 100.0,
            min_group_size: 30.0,
            summary_insights: 2,
            insight_precision: 3,
        }
    }

    /// Load profile from YAML; omitted fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, TrendError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TrendError::ConfigError(format!("invalid QA profile: {}", e)))
    }

    pub fn load(path: &std::path::Path) -> Result<Self, TrendError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrendError::ConfigError(format!("failed to read QA profile {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}

impl Default for QaProfile {
    fn default() -> Self {
        Self::monthly_trend()
    }
}
