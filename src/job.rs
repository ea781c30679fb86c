//! Triage job: the whole pipeline for one or two runs, parameterized by an
//! explicit value instead of fields set before start.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::TriageConfig;
use crate::corpus::CorpusComparator;
use crate::diff::{self, DiffReports};
use crate::report::Report;
use crate::source::{self, RunSource};
use crate::types::{RunDiff, RunOrigin, RunResult};

/// What to triage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageJob {
    pub first_run: u64,
    /// Later run to diff against `first_run`.
    pub second_run: Option<u64>,
    pub origin: RunOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobOutcome {
    Corpus(Option<RunResult>),
    Diff(Option<RunDiff>),
}

/// Output locations derived from the configuration for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub first_logs: PathBuf,
    pub second_logs: Option<PathBuf>,
    pub first_report: PathBuf,
    pub second_report: Option<PathBuf>,
    pub diff_report: Option<PathBuf>,
}

impl TriageJob {
    pub fn paths(&self, config: &TriageConfig) -> JobPaths {
        let logs = |run: u64| config.logs_dir.join(run.to_string());
        let reports = &config.reports_dir;
        match self.second_run {
            Some(second) => JobPaths {
                first_logs: logs(self.first_run),
                second_logs: Some(logs(second)),
                first_report: reports.join(format!("auto_analyzer_log_{}.log", self.first_run)),
                second_report: Some(reports.join(format!("auto_analyzer_log_{second}.log"))),
                diff_report: Some(reports.join(format!(
                    "auto_analyzer_log_cmp_{}_{second}.log",
                    self.first_run
                ))),
            },
            None => JobPaths {
                first_logs: logs(self.first_run),
                second_logs: None,
                first_report: reports.join(self.first_run.to_string()),
                second_report: None,
                diff_report: None,
            },
        }
    }
}

/// Run a job to completion on the calling thread.
///
/// `source` is only consulted for [`RunOrigin::Remote`] jobs.
pub fn run(config: &TriageConfig, job: &TriageJob, source: &dyn RunSource) -> Result<JobOutcome> {
    std::fs::create_dir_all(&config.reports_dir)
        .with_context(|| format!("creating report dir: {}", config.reports_dir.display()))?;

    if job.origin == RunOrigin::Remote {
        for run_id in std::iter::once(job.first_run).chain(job.second_run) {
            source::materialize_run(source, &config.logs_dir, run_id)
                .with_context(|| format!("materializing logs of run {run_id}"))?;
        }
    }

    let corpus = CorpusComparator::new(config);
    let paths = job.paths(config);

    let outcome = match (&paths.second_logs, &paths.second_report, &paths.diff_report) {
        (Some(second_logs), Some(second_report), Some(diff_report)) => {
            let reports = DiffReports {
                earlier: Report::fresh(&paths.first_report),
                later: Report::fresh(second_report),
                diff: Report::append(diff_report),
            };
            JobOutcome::Diff(diff::diff_runs(
                &corpus,
                &paths.first_logs,
                second_logs,
                &reports,
            ))
        }
        _ => JobOutcome::Corpus(
            corpus.cluster_dir(&paths.first_logs, &Report::fresh(&paths.first_report)),
        ),
    };
    Ok(outcome)
}

/// Run a job on tokio's blocking pool so the caller's task stays responsive.
pub async fn spawn<S>(config: TriageConfig, job: TriageJob, source: S) -> Result<JobOutcome>
where
    S: RunSource + Send + 'static,
{
    tokio::task::spawn_blocking(move || run(&config, &job, &source))
        .await
        .context("triage job panicked")?
}
