//! Pipeline configuration
//!
//! Read from the process environment after loading an optional `.env`
//! file. Database keys are mandatory; everything else has a default.

use std::fmt;
use std::path::{Path, PathBuf};

use trend_core::{Result, TrendError};
use trend_quality::QaProfile;

/// Keys that must be present and non-empty
pub const REQUIRED_KEYS: [&str; 4] = ["DB_HOST", "DB_NAME", "DB_USER", "DB_PASSWORD"];

pub const OUTPUT_DIR_KEY: &str = "TREND_OUTPUT_DIR";
pub const PROFILE_KEY: &str = "TREND_PROFILE";
pub const TEMPLATE_KEY: &str = "TREND_REPORT_TEMPLATE";

pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[derive(Clone)]
pub struct PipelineConfig {
    pub db_host: String,
    pub db_name: String,
    pub db_user: String,
    db_password: String,
    /// Root of `csv/`, `charts/` and `reports/`
    pub output_dir: PathBuf,
    pub profile_path: Option<PathBuf>,
    pub report_template: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Every missing required key is
    /// named in the error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(TrendError::ConfigError(format!(
                "missing database settings: {}",
                missing.join(", ")
            )));
        }

        let required = |key: &str| get(key).unwrap_or_default();
        Ok(Self {
            db_host: required("DB_HOST"),
            db_name: required("DB_NAME"),
            db_user: required("DB_USER"),
            db_password: required("DB_PASSWORD"),
            output_dir: get(OUTPUT_DIR_KEY)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            profile_path: get(PROFILE_KEY).map(PathBuf::from),
            report_template: get(TEMPLATE_KEY).map(PathBuf::from),
        })
    }

    pub fn db_password(&self) -> &str {
        &self.db_password
    }

    /// Database file for the bundled SQLite source: `DB_HOST/DB_NAME`
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.db_host).join(&self.db_name)
    }

    /// QA profile from `TREND_PROFILE`, or the built-in default
    pub fn profile(&self) -> Result<QaProfile> {
        match &self.profile_path {
            Some(path) => QaProfile::load(path),
            None => Ok(QaProfile::default()),
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("db_host", &self.db_host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"***")
            .field("output_dir", &self.output_dir)
            .field("profile_path", &self.profile_path)
            .field("report_template", &self.report_template)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const FULL: [(&str, &str); 4] = [
        ("DB_HOST", "data"),
        ("DB_NAME", "olist.sqlite3"),
        ("DB_USER", "analyst"),
        ("DB_PASSWORD", "s3cret"),
    ];

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&FULL)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.database_path(), PathBuf::from("data/olist.sqlite3"));
        assert!(config.profile_path.is_none());
        assert_eq!(config.profile().unwrap(), QaProfile::default());
    }

    #[test]
    fn test_missing_keys_are_listed() {
        let err = PipelineConfig::from_lookup(lookup(&FULL[..2])).unwrap_err();
        assert!(matches!(err, TrendError::ConfigError(_)));
        assert_eq!(err.to_string(), "CONFIG/missing database settings: DB_USER, DB_PASSWORD");
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = FULL.to_vec();
        pairs[3] = ("DB_PASSWORD", "  ");
        assert!(PipelineConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_password_redacted() {
        let config = PipelineConfig::from_lookup(lookup(&FULL)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("***"));
        assert_eq!(config.db_password(), "s3cret");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = FULL.to_vec();
        pairs.push((OUTPUT_DIR_KEY, "/tmp/trend"));
        pairs.push((TEMPLATE_KEY, "report.yaml"));
        let config = PipelineConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/trend"));
        assert_eq!(config.report_template, Some(PathBuf::from("report.yaml")));
    }
}
