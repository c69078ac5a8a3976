//! Unified Error Model
use thiserror::Error;

use crate::findings::Finding;

/// Fatal errors. Anything recoverable is a soft [`Finding`] instead.
#[derive(Error, Debug)]
pub enum TrendError {
    #[error("CONFIG/{0}")]
    ConfigError(String),

    #[error("SCHEMA/{0}")]
    SchemaError(Finding),

    #[error("TABLE/{0}")]
    TableError(String),

    #[error("SOURCE/{0}")]
    SourceError(String),

    #[error("EXPORT/{0}")]
    ExportError(String),

    #[error("RENDER/{0}")]
    RenderError(String),

    #[error("SERIALIZE/{0}")]
    SerializeError(String),

    #[error("IO/{0}")]
    IoError(#[from] std::io::Error),
}

impl TrendError {
    /// The finding behind a schema failure, if this is one.
    pub fn finding(&self) -> Option<&Finding> {
        match self {
            Self::SchemaError(finding) => Some(finding),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TrendError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializeError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrendError>;
