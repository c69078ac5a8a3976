//! Trend Pipeline: configuration, chart stages and the run orchestrator
//!
//! Wires the extractor, QA validator, month normalizer, chart stages and
//! report assembler into one run over a shared [`RunContext`].
//!
//! # Example
//!
//! ```ignore
//! use trend_pipeline::{PipelineConfig, PipelineRunner};
//!
//! let config = PipelineConfig::from_env()?;
//! let outcome = PipelineRunner::from_config(&config)?.run().await?;
//! println!("{}", outcome.report);
//! ```
//!
//! [`RunContext`]: trend_core::RunContext

pub mod artifacts;
pub mod charts;
pub mod config;
pub mod runner;

pub use artifacts::{publish, ArtifactStore, FsArtifactStore};
pub use charts::{
    monthly_trend_charts, ChartBackend, ChartPoint, ChartSeries, ChartSpec, ChartStage,
    JsonChartBackend, PngChartBackend, Plot, Series,
};
pub use config::PipelineConfig;
pub use runner::{PipelineRunner, RunOutcome, RunSummary};
