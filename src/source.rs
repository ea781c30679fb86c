//! Test-management collaborator: turns a run's failed test results into
//! `log_<case>.log` files the corpus comparator can read.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, TriageError};

/// Status id of a failed test.
pub const STATUS_FAILED: u32 = 5;

/// Comments shorter than this are placeholders ("see log", "x").
const MIN_COMMENT_LEN: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct TestRecord {
    pub id: u64,
    pub case_id: u64,
    pub status_id: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestResultRecord {
    #[serde(default)]
    pub comment: Option<String>,
}

/// Source of run data.
pub trait RunSource {
    /// Tests of a run with their status.
    fn tests(&self, run_id: u64) -> Result<Vec<TestRecord>>;
    /// Results recorded for one test, oldest first.
    fn results(&self, test_id: u64) -> Result<Vec<TestResultRecord>>;
}

#[derive(Debug, Deserialize)]
struct RunExport {
    tests: Vec<TestRecord>,
    #[serde(default)]
    results: HashMap<String, Vec<TestResultRecord>>,
}

/// Run data exported to `<dir>/run_<id>.json`.
#[derive(Debug, Default)]
pub struct JsonExportSource {
    dir: PathBuf,
    results: std::sync::Mutex<HashMap<u64, Vec<TestResultRecord>>>,
}

impl JsonExportSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            results: Default::default(),
        }
    }

    fn load(&self, run_id: u64) -> Result<RunExport> {
        let path = self.dir.join(format!("run_{run_id}.json"));
        if !path.is_file() {
            return Err(TriageError::MissingRun { run_id, path });
        }
        let text = std::fs::read_to_string(&path).map_err(|e| TriageError::io(&path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| TriageError::json(format!("parsing {}", path.display()), e))
    }
}

impl RunSource for JsonExportSource {
    fn tests(&self, run_id: u64) -> Result<Vec<TestRecord>> {
        let export = self.load(run_id)?;
        let mut cache = self.results.lock().unwrap_or_else(|e| e.into_inner());
        for (test_id, results) in export.results {
            match test_id.parse::<u64>() {
                Ok(id) => {
                    cache.insert(id, results);
                }
                Err(_) => tracing::warn!("Ignoring results for non-numeric test id {test_id:?}"),
            }
        }
        Ok(export.tests)
    }

    fn results(&self, test_id: u64) -> Result<Vec<TestResultRecord>> {
        let cache = self.results.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cache.get(&test_id).cloned().unwrap_or_default())
    }
}

/// Comment to store for a failed test: the first one longer than the
/// placeholder limit, else the last one seen.
fn pick_comment(results: &[TestResultRecord]) -> Option<&str> {
    let mut picked = None;
    for comment in results.iter().filter_map(|r| r.comment.as_deref()) {
        picked = Some(comment);
        if comment.chars().count() > MIN_COMMENT_LEN {
            break;
        }
    }
    picked
}

/// Write `log_<case>.log` for every failed test of `run_id` into
/// `<base_dir>/<run_id>`. Returns the written paths.
pub fn materialize_run(
    source: &dyn RunSource,
    base_dir: &Path,
    run_id: u64,
) -> Result<Vec<PathBuf>> {
    tracing::info!("Creating logs from run {run_id}");
    let run_dir = base_dir.join(run_id.to_string());
    if !run_dir.exists() {
        tracing::debug!("Creating directory {}", run_dir.display());
        std::fs::create_dir_all(&run_dir).map_err(|e| TriageError::io(&run_dir, e))?;
    }

    let failed: Vec<TestRecord> = source
        .tests(run_id)?
        .into_iter()
        .filter(|t| t.status_id == STATUS_FAILED)
        .collect();

    let mut written = Vec::with_capacity(failed.len());
    for test in &failed {
        let path = run_dir.join(format!("log_{}.log", test.case_id));
        tracing::debug!("Writing {}", path.display());
        let results = source.results(test.id)?;
        let body = pick_comment(&results).unwrap_or("");
        std::fs::write(&path, body).map_err(|e| TriageError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
