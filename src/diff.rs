//! Cross-run comparison: which failure clusters grew in the later run.

use std::path::Path;

use crate::corpus::CorpusComparator;
use crate::report::Report;
use crate::types::{NewFailures, RunDiff, RunResult};

/// Reports written while diffing two runs.
#[derive(Debug, Clone, Default)]
pub struct DiffReports {
    pub earlier: Report,
    pub later: Report,
    pub diff: Report,
}

/// Case ids new in `later`, per cluster key.
///
/// Keys only present in `earlier` are ignored: only growth is reported. Keys
/// without any new case id are left out. Returns `None` when nothing grew.
pub fn diff_results(earlier: &RunResult, later: &RunResult) -> Option<RunDiff> {
    let mut diff = RunDiff::new();
    for (key, cluster) in later {
        let new_cases: std::collections::BTreeSet<_> = match earlier.get(key) {
            Some(previous) => cluster
                .cases
                .keys()
                .filter(|id| !previous.cases.contains_key(*id))
                .copied()
                .collect(),
            None => cluster.case_ids(),
        };
        if !new_cases.is_empty() {
            diff.insert(
                key.clone(),
                NewFailures {
                    new_failed_cases: new_cases,
                },
            );
        }
    }
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

/// Write a human-readable diff report.
pub fn write_diff_report(diff: &RunDiff, report: &Report) {
    report.line(format!(
        "Run comparison result at {} (differences found: {}):",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        diff.len()
    ));
    report.blank();
    for (key, failures) in diff {
        let ids: Vec<String> = failures
            .new_failed_cases
            .iter()
            .map(|id| id.to_string())
            .collect();
        report.line(format!("{key}:"));
        report.line(format!("  NEW_FAILED_CASES: [{}]", ids.join(", ")));
        report.blank();
    }
}

/// Cluster both run directories and report the clusters that grew.
///
/// Returns `None` if either directory cannot be clustered or nothing grew.
pub fn diff_runs(
    corpus: &CorpusComparator,
    earlier_dir: &Path,
    later_dir: &Path,
    reports: &DiffReports,
) -> Option<RunDiff> {
    let earlier = corpus.cluster_dir(earlier_dir, &reports.earlier);
    let later = corpus.cluster_dir(later_dir, &reports.later);
    let (earlier, later) = (earlier?, later?);
    let diff = diff_results(&earlier, &later)?;
    write_diff_report(&diff, &reports.diff);
    Some(diff)
}
