//! Trend Out: insights and the narrated report
//!
//! This crate turns gated series into insight statements and renders the
//! accumulated state of a run into the markdown trend report.
//!
//! # Example
//!
//! ```ignore
//! use trend_out::{assemble_report, ReportInput};
//!
//! let input = ReportInput::from_context(&ctx, "Monthly Trend Report", 2, definitions, charts);
//! let markdown = assemble_report(&input)?;
//! ```

pub mod insights;
pub mod renderer;
pub mod report;
pub mod templates;

pub use insights::{delta_insight, delta_stats, DeltaOutcome};
pub use renderer::{TemplateRenderer, NONE_PLACEHOLDER};
pub use report::{ChartSection, MetricDefinition, ReportAssembler, ReportInput, REPORT_TEMPLATE};
pub use templates::{Template, TemplatesFile, DEFAULT_TEMPLATES};

use trend_core::Result;

/// Render a report with the bundled template
pub fn assemble_report(input: &ReportInput) -> Result<String> {
    ReportAssembler::new()?.assemble(input)
}
