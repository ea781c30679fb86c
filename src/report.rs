//! Plain-text report sink.
//!
//! Every line goes to tracing and, when a path is set, is appended to the
//! report file. Write failures are logged and otherwise ignored: the report
//! mirrors the log, it never decides the outcome.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Report {
    path: Option<PathBuf>,
}

impl Report {
    /// Log-only report.
    pub fn none() -> Self {
        Self { path: None }
    }

    /// Report appended to `path`, keeping any existing content.
    pub fn append(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Report written to `path` from scratch: an existing file is removed.
    pub fn fresh(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Cannot remove old report {}: {}", path.display(), e);
            }
        }
        Self { path: Some(path) }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one informational line.
    pub fn line(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        tracing::info!("{text}");
        let Some(path) = &self.path else {
            return;
        };
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{text}"));
        if let Err(e) = written {
            tracing::warn!("Cannot write report {}: {}", path.display(), e);
        }
    }

    /// Blank separator line (file only).
    pub fn blank(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f));
        if let Err(e) = written {
            tracing::warn!("Cannot write report {}: {}", path.display(), e);
        }
    }
}
