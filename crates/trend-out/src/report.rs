//! Report assembly
//!
//! Builds the markdown trend report from one run's accumulated state. The
//! section order lives in the template; this module only shapes the data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use trend_core::{Artifact, Finding, Insight, Result, RunContext, Threshold, Topic, TrendError};

use crate::renderer::TemplateRenderer;

/// Name of the template the assembler renders
pub const REPORT_TEMPLATE: &str = "report";

/// Human definition of one reported metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    pub definition: String,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// Narrative block for one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSection {
    pub title: String,
    /// Artifact path relative to the output root
    pub artifact: String,
    /// Rule applied before plotting, if any
    pub gate: Option<String>,
    /// Insights with this topic are shown under "So what"
    pub topic: Topic,
    pub follow_up: String,
}

/// Everything the report is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub title: String,
    /// How many insights make the executive summary
    pub summary_cap: usize,
    pub definitions: Vec<MetricDefinition>,
    pub artifacts: Vec<Artifact>,
    pub thresholds: Vec<Threshold>,
    pub findings: Vec<Finding>,
    pub insights: Vec<Insight>,
    pub charts: Vec<ChartSection>,
    pub reproducibility: Vec<String>,
}

impl ReportInput {
    /// Snapshot a run context. Context notes become reproducibility notes.
    pub fn from_context(
        ctx: &RunContext,
        title: impl Into<String>,
        summary_cap: usize,
        definitions: Vec<MetricDefinition>,
        charts: Vec<ChartSection>,
    ) -> Self {
        Self {
            title: title.into(),
            summary_cap,
            definitions,
            artifacts: ctx.artifacts().to_vec(),
            thresholds: ctx.thresholds().to_vec(),
            findings: ctx.findings().to_vec(),
            insights: ctx.insights().to_vec(),
            charts,
            reproducibility: ctx.notes().to_vec(),
        }
    }

    /// Template data. Lists are pre-formatted to strings.
    pub fn view(&self) -> Value {
        let summary: Vec<&str> = self
            .insights
            .iter()
            .take(self.summary_cap)
            .map(|i| i.text.as_str())
            .collect();

        let definitions: Vec<String> = self
            .definitions
            .iter()
            .map(|d| format!("{}: {}", d.name, d.definition))
            .collect();

        let charts: Vec<Value> = self
            .charts
            .iter()
            .map(|chart| {
                let so_what: Vec<&str> = self
                    .insights
                    .iter()
                    .filter(|i| i.topic == chart.topic)
                    .map(|i| i.text.as_str())
                    .collect();
                json!({
                    "title": chart.title,
                    "artifact": chart.artifact,
                    "gate": chart.gate,
                    "insights": so_what,
                    "follow_up": chart.follow_up,
                })
            })
            .collect();

        json!({
            "title": self.title,
            "summary": summary,
            "definitions": definitions,
            "artifacts": self.artifacts.iter().map(Artifact::describe).collect::<Vec<_>>(),
            "thresholds": self.thresholds.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "qa_notes": self.findings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "charts": charts,
            "reproducibility": self.reproducibility,
        })
    }
}

/// Renders [`ReportInput`] through the `report` template
pub struct ReportAssembler<'a> {
    renderer: TemplateRenderer<'a>,
}

impl<'a> ReportAssembler<'a> {
    /// Assembler over the bundled template
    pub fn new() -> Result<Self> {
        Self::with_renderer(TemplateRenderer::bundled().map_err(TrendError::RenderError)?)
    }

    /// Assembler over a template file that overrides the bundled one
    pub fn from_file(path: &str) -> Result<Self> {
        Self::with_renderer(TemplateRenderer::load(path).map_err(TrendError::RenderError)?)
    }

    fn with_renderer(renderer: TemplateRenderer<'a>) -> Result<Self> {
        if !renderer.list_templates().contains(&REPORT_TEMPLATE) {
            return Err(TrendError::RenderError(format!(
                "templates file has no '{}' template",
                REPORT_TEMPLATE
            )));
        }
        Ok(Self { renderer })
    }

    pub fn assemble(&self, input: &ReportInput) -> Result<String> {
        let markdown = self
            .renderer
            .render(REPORT_TEMPLATE, &input.view())
            .map_err(TrendError::RenderError)?;
        tracing::debug!(bytes = markdown.len(), charts = input.charts.len(), "report assembled");
        Ok(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trend_core::{DeltaStats, FindingKind};

    fn insight(topic: Topic, text: &str) -> Insight {
        Insight {
            topic,
            text: text.to_string(),
            stats: DeltaStats { n: 1, mean: 0.0, min: 0.0, max: 0.0 },
        }
    }

    fn empty_input() -> ReportInput {
        ReportInput {
            title: "Monthly Trend Report".into(),
            summary_cap: 2,
            definitions: vec![],
            artifacts: vec![],
            thresholds: vec![],
            findings: vec![],
            insights: vec![],
            charts: vec![],
            reproducibility: vec![],
        }
    }

    #[test]
    fn test_summary_is_capped() {
        let mut input = empty_input();
        input.insights = vec![
            insight(Topic::Orders, "first"),
            insight(Topic::Reviews, "second"),
            insight(Topic::Reviews, "third"),
        ];
        let view = input.view();
        assert_eq!(view["summary"], json!(["first", "second"]));
    }

    #[test]
    fn test_so_what_filters_by_topic() {
        let mut input = empty_input();
        input.insights = vec![
            insight(Topic::Orders, "orders gap"),
            insight(Topic::Reviews, "reviews gap"),
        ];
        input.charts = vec![ChartSection {
            title: "Review score".into(),
            artifact: "charts/03_review_score_by_delivery.json".into(),
            gate: None,
            topic: Topic::Reviews,
            follow_up: "Why?".into(),
        }];
        let view = input.view();
        assert_eq!(view["charts"][0]["insights"], json!(["reviews gap"]));
    }

    #[test]
    fn test_findings_render_as_qa_notes() {
        let mut input = empty_input();
        input.findings = vec![Finding::warning(FindingKind::MonthGap, "orders/month", "gap", 59)];
        let view = input.view();
        assert_eq!(view["qa_notes"], json!(["[QA WARNING] orders/month: gap"]));
    }

    #[test]
    fn test_assemble_empty_report() {
        let report = ReportAssembler::new().unwrap().assemble(&empty_input()).unwrap();
        assert!(report.starts_with("# Monthly Trend Report"));
        assert!(report.contains("## QA Notes\n- (none)"));
    }

    #[test]
    fn test_template_without_report_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\ntemplates:\n  other:\n    description: x\n    template: \"x\"\n",
        )
        .unwrap();
        let err = ReportAssembler::from_file(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, TrendError::RenderError(_)));
    }
}
