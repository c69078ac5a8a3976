//! Binary entrypoint for the monthly trend pack.
use anyhow::Context;
use tracing_subscriber::EnvFilter;
use trend_pipeline::{PipelineConfig, PipelineRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = PipelineConfig::from_env().context("loading configuration")?;
    tracing::info!(?config, "configuration loaded");

    let runner = PipelineRunner::from_config(&config).context("building pipeline")?;
    let outcome = runner.run().await.context("running monthly trend pack")?;

    tracing::info!(
        output = %config.output_dir.display(),
        qa_notes = outcome.context.findings().len(),
        insights = outcome.context.insights().len(),
        "report written"
    );
    Ok(())
}
