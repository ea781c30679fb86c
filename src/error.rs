//! Errors of the collaborator layer. The comparison pipeline itself never
//! fails: it degrades to a 0.0 score or an absent result.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("io: {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("json: {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    #[error("no export for run {run_id} at {path}")]
    MissingRun { run_id: u64, path: PathBuf },
}

impl TriageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
