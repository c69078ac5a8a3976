//! Pipeline Runner: extraction, QA, charts and report for one run
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use trend_core::{
    digest, format_year_month, normalize_months, Artifact, ArtifactKind, Finding, Insight, Result,
    RunContext, Table, Threshold, TrendError, TRENDPACK_VERSION,
};
use trend_extract::queries::PURCHASE_MONTH;
use trend_extract::{monthly_trend_pack, table_to_csv, DataSource, MetricQuery, SqliteSource};
use trend_out::{ChartSection, MetricDefinition, ReportAssembler, ReportInput};
use trend_quality::QaProfile;

use crate::artifacts::{publish, ArtifactStore, FsArtifactStore, CSV_DIR, REPORT_DIR};
use crate::charts::{monthly_trend_charts, ChartBackend, ChartStage, PngChartBackend};
use crate::config::PipelineConfig;

pub const REPORT_TITLE: &str = "Monthly Trend Report";
pub const REPORT_FILE: &str = "monthly_trend_report.md";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Machine-readable record of a run
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: &'a str,
    pub version: &'a str,
    pub findings: &'a [Finding],
    pub thresholds: &'a [Threshold],
    pub insights: &'a [Insight],
    pub artifacts: &'a [Artifact],
}

/// What a successful run leaves behind
#[derive(Debug)]
pub struct RunOutcome {
    pub context: RunContext,
    pub report: String,
}

pub struct PipelineRunner {
    source: Arc<dyn DataSource>,
    store: Box<dyn ArtifactStore>,
    backend: Box<dyn ChartBackend>,
    assembler: ReportAssembler<'static>,
    profile: QaProfile,
    queries: Vec<MetricQuery>,
    charts: Vec<ChartStage>,
}

impl PipelineRunner {
    /// Runner for the monthly trend pack with PNG charts and the bundled
    /// report template.
    pub fn new(
        source: Arc<dyn DataSource>,
        store: Box<dyn ArtifactStore>,
        profile: QaProfile,
    ) -> Result<Self> {
        Ok(Self {
            source,
            store,
            backend: Box::new(PngChartBackend::default()),
            assembler: ReportAssembler::new()?,
            charts: monthly_trend_charts(&profile),
            queries: monthly_trend_pack(),
            profile,
        })
    }

    /// SQLite source at `DB_HOST/DB_NAME`, files under the output root.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let profile = config.profile()?;
        let source = Arc::new(SqliteSource::new(config.database_path()));
        tracing::debug!(
            user = %config.db_user,
            "sqlite source opens the file directly; credentials unused"
        );

        let store = Box::new(FsArtifactStore::new(&config.output_dir));
        let mut runner = Self::new(source, store, profile)?;
        if let Some(path) = &config.report_template {
            runner.assembler = ReportAssembler::from_file(&path.to_string_lossy())?;
        }
        Ok(runner)
    }

    pub fn with_backend(mut self, backend: Box<dyn ChartBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn profile(&self) -> &QaProfile {
        &self.profile
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let mut ctx = RunContext::new();
        let span = tracing::info_span!("trendpack", run_id = %ctx.run_id);
        let report = self.execute(&mut ctx).instrument(span).await?;
        Ok(RunOutcome { context: ctx, report })
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<String> {
        tracing::info!(queries = self.queries.len(), profile = %self.profile.name, "run started");
        self.note_provenance(ctx);

        let tables = self.extract_all().await?;

        for (query, table) in self.queries.iter().zip(&tables) {
            let export = table_to_csv(table)?;
            publish(
                self.store.as_ref(),
                ctx,
                ArtifactKind::Csv,
                format!("{}/{}", CSV_DIR, query.csv_name()),
                &export.bytes,
                Some(export.rows),
            )?;
        }

        for (query, table) in self.queries.iter().zip(&tables) {
            let findings = query.checks.run(table, &self.profile)?;
            ctx.record_findings(findings);
            tracing::debug!(query = %query.id, "peek:\n{}", table.head(3));
        }

        let mut normalized = Vec::with_capacity(tables.len());
        for (query, table) in self.queries.iter().zip(&tables) {
            let result = normalize_months(table, PURCHASE_MONTH, &query.label)?;
            if let Some(finding) = result.finding {
                ctx.record_finding(finding);
            }
            match result.coverage {
                Some((first, last)) => ctx.add_note(format!(
                    "{} covers {} to {} ({} rows)",
                    query.label,
                    format_year_month(first),
                    format_year_month(last),
                    result.table.row_count()
                )),
                None => ctx.add_note(format!("{} has no parseable months", query.label)),
            }
            normalized.push((query.id.as_str(), result.table));
        }

        let mut sections: Vec<ChartSection> = Vec::with_capacity(self.charts.len());
        for stage in &self.charts {
            let table = Self::table_for(&normalized, &stage.stem)?;
            sections.push(stage.run(
                table,
                &self.profile,
                self.backend.as_ref(),
                self.store.as_ref(),
                ctx,
            )?);
        }

        let input = ReportInput::from_context(
            ctx,
            REPORT_TITLE,
            self.profile.summary_insights,
            self.definitions(),
            sections,
        );
        let report = self.assembler.assemble(&input)?;
        publish(
            self.store.as_ref(),
            ctx,
            ArtifactKind::Report,
            format!("{}/{}", REPORT_DIR, REPORT_FILE),
            report.as_bytes(),
            None,
        )?;

        let summary = serde_json::to_vec_pretty(&RunSummary {
            run_id: &ctx.run_id,
            version: TRENDPACK_VERSION,
            findings: ctx.findings(),
            thresholds: ctx.thresholds(),
            insights: ctx.insights(),
            artifacts: ctx.artifacts(),
        })?;
        publish(
            self.store.as_ref(),
            ctx,
            ArtifactKind::Report,
            format!("{}/{}", REPORT_DIR, SUMMARY_FILE),
            &summary,
            None,
        )?;

        tracing::info!(
            findings = ctx.findings().len(),
            insights = ctx.insights().len(),
            artifacts = ctx.artifacts().len(),
            "run complete"
        );
        Ok(report)
    }

    /// Every query on its own blocking task; results come back in
    /// declared order.
    async fn extract_all(&self) -> Result<Vec<Table>> {
        let handles: Vec<_> = self
            .queries
            .iter()
            .cloned()
            .map(|query| {
                let source = Arc::clone(&self.source);
                tokio::task::spawn_blocking(move || source.fetch(&query))
            })
            .collect();

        let mut tables = Vec::with_capacity(handles.len());
        for handle in handles {
            let table = handle
                .await
                .map_err(|e| TrendError::SourceError(format!("extraction task failed: {}", e)))??;
            tables.push(table);
        }
        Ok(tables)
    }

    fn table_for<'t>(normalized: &'t [(&str, Table)], stem: &str) -> Result<&'t Table> {
        normalized
            .iter()
            .find(|(id, _)| *id == stem)
            .map(|(_, table)| table)
            .ok_or_else(|| TrendError::ConfigError(format!("chart {} has no matching query", stem)))
    }

    fn note_provenance(&self, ctx: &mut RunContext) {
        ctx.add_note(format!("trendpack {}", TRENDPACK_VERSION));
        ctx.add_note(format!("source: {}", self.source.describe()));
        ctx.add_note(format!(
            "profile {}: month gap > {} days, chart volume >= {}, group size >= {}",
            self.profile.name,
            self.profile.month_gap_days,
            self.profile.min_chart_volume,
            self.profile.min_group_size
        ));
        for query in &self.queries {
            let params: Vec<String> = query
                .params
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            ctx.add_note(format!(
                "query {} sql {} [{}]",
                query.id,
                digest(query.sql.as_bytes()),
                params.join(", ")
            ));
        }
    }

    fn definitions(&self) -> Vec<MetricDefinition> {
        let mut definitions = vec![MetricDefinition::new(
            PURCHASE_MONTH,
            "calendar month of the order purchase timestamp (YYYY-MM)",
        )];
        for query in &self.queries {
            for (name, definition) in &query.definitions {
                if !definitions.iter().any(|d| &d.name == name) {
                    definitions.push(MetricDefinition::new(name.clone(), definition.clone()));
                }
            }
        }
        definitions
    }
}
