//! Run Context: append-only logs shared by every stage of one run
use serde::{Deserialize, Serialize};

use crate::findings::{Finding, Insight, Threshold, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Csv,
    Chart,
    Report,
}

/// A file written during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Path relative to the output root
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    /// `blake3:<hex>` of the written bytes
    pub digest: String,
}

impl Artifact {
    pub fn describe(&self) -> String {
        match self.rows {
            Some(rows) => format!("{} ({} rows, {})", self.path, rows, self.digest),
            None => format!("{} ({})", self.path, self.digest),
        }
    }
}

/// Accumulated state of one pipeline run.
///
/// Owned by the runner and handed to stages as `&mut`, so there is exactly
/// one writer at a time and log order follows stage order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,
    findings: Vec<Finding>,
    thresholds: Vec<Threshold>,
    insights: Vec<Insight>,
    artifacts: Vec<Artifact>,
    notes: Vec<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_run_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            findings: Vec::new(),
            thresholds: Vec::new(),
            insights: Vec::new(),
            artifacts: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn record_finding(&mut self, finding: Finding) {
        tracing::warn!(kind = ?finding.kind, "{}", finding);
        self.findings.push(finding);
    }

    pub fn record_findings(&mut self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.record_finding(finding);
        }
    }

    pub fn declare_threshold(&mut self, threshold: Threshold) {
        tracing::debug!("threshold declared: {}", threshold);
        self.thresholds.push(threshold);
    }

    pub fn record_insight(&mut self, insight: Insight) {
        tracing::info!(topic = %insight.topic, "{}", insight.text);
        self.insights.push(insight);
    }

    pub fn record_artifact(&mut self, artifact: Artifact) {
        tracing::info!(path = %artifact.path, "saved {}", artifact.describe());
        self.artifacts.push(artifact);
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub fn insights_for(&self, topic: Topic) -> impl Iterator<Item = &Insight> {
        self.insights.iter().filter(move |i| i.topic == topic)
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
