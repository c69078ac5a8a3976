//! Artifact persistence
use std::path::{Path, PathBuf};

use trend_core::{digest, Artifact, ArtifactKind, Result, RunContext, TrendError};

pub const CSV_DIR: &str = "csv";
pub const CHART_DIR: &str = "charts";
pub const REPORT_DIR: &str = "reports";

/// Somewhere to put named byte blobs.
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` at `relative` (forward-slash separated), replacing any
    /// previous content.
    fn put(&self, relative: &str, bytes: &[u8]) -> Result<()>;
}

/// Files under an output root; parent directories are created on demand
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, relative: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes).map_err(|e| {
            TrendError::ExportError(format!("cannot write {}: {}", path.display(), e))
        })?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }
}

/// Persist an artifact and log it in the run context.
pub fn publish(
    store: &dyn ArtifactStore,
    ctx: &mut RunContext,
    kind: ArtifactKind,
    relative: String,
    bytes: &[u8],
    rows: Option<usize>,
) -> Result<Artifact> {
    store.put(&relative, bytes)?;
    let artifact = Artifact {
        kind,
        path: relative,
        rows,
        digest: digest(bytes),
    };
    ctx.record_artifact(artifact.clone());
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_creates_directories() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.put("csv/01_orders_per_month.csv", b"a,b\n").unwrap();
        let written =
            std::fs::read(dir.path().join("csv").join("01_orders_per_month.csv")).unwrap();
        assert_eq!(written, b"a,b\n");
    }

    #[test]
    fn test_publish_records_artifact() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let mut ctx = RunContext::with_run_id("t");

        let artifact = publish(
            &store,
            &mut ctx,
            ArtifactKind::Csv,
            "csv/x.csv".to_string(),
            b"x\n1\n",
            Some(1),
        )
        .unwrap();

        assert_eq!(ctx.artifacts(), &[artifact.clone()]);
        assert_eq!(artifact.digest, digest(b"x\n1\n"));
        assert_eq!(artifact.rows, Some(1));
    }
}
