//! Greedy clustering of one run's logs.
//!
//! Files are visited in name order. Each file not yet absorbed becomes a seed
//! and is compared with every later file not yet absorbed; files scoring above
//! the cluster threshold join the seed's cluster and are never seeds or
//! candidates again. Worst case is quadratic in the number of files.

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::compare::{LogComparator, SeedLog};
use crate::config::TriageConfig;
use crate::logfile::case_id_from_path;
use crate::report::Report;
use crate::types::{Cluster, RunResult, UNRECOGNIZED};

#[derive(Debug, Clone)]
pub struct CorpusComparator {
    comparator: LogComparator,
    cluster_threshold: f64,
    log_extension: String,
    parallel: bool,
}

impl Default for CorpusComparator {
    fn default() -> Self {
        Self::new(&TriageConfig::default())
    }
}

impl CorpusComparator {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            comparator: LogComparator::new(config),
            cluster_threshold: config.cluster_threshold,
            log_extension: config.log_extension.clone(),
            parallel: config.parallel,
        }
    }

    /// Regular files in `dir` with the log extension, sorted by name.
    pub fn list_logs(&self, dir: &Path) -> Vec<PathBuf> {
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            self.log_extension
        );
        match glob::glob(&pattern) {
            Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
            Err(e) => {
                tracing::warn!("Bad log pattern {pattern}: {e}");
                Vec::new()
            }
        }
    }

    /// Cluster every log in `dir`.
    ///
    /// Returns `None` when the directory does not exist, and an empty map when
    /// it holds no logs.
    pub fn cluster_dir(&self, dir: &Path, report: &Report) -> Option<RunResult> {
        report.line(format!(
            "Log comparison started at {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        if !dir.is_dir() {
            report.line(format!("Directory {} not found", dir.display()));
            return None;
        }

        let files = self.list_logs(dir);
        let mut absorbed = vec![false; files.len()];
        let mut result = RunResult::new();

        for (i, seed) in files.iter().enumerate() {
            if absorbed[i] {
                continue;
            }

            let seed_log = SeedLog::load(seed);
            let mut cluster = Cluster::default();
            cluster.insert(case_id_from_path(seed), seed.clone(), 1.0);

            if let Some(seed_log) = &seed_log {
                report.line(format!("Found failure: {}", seed_log.fail.text));

                let candidates: Vec<usize> =
                    ((i + 1)..files.len()).filter(|&j| !absorbed[j]).collect();
                let scores = self.score_candidates(seed_log, &files, &candidates, dir);

                for (j, score) in candidates.into_iter().zip(scores) {
                    if score > self.cluster_threshold {
                        absorbed[j] = true;
                        cluster.insert(case_id_from_path(&files[j]), files[j].clone(), score);
                    }
                }
            }

            report.line(format!("Comparison result: ({}) {}", cluster.len(), cluster));
            report.blank();

            // A later seed with the same key replaces the earlier cluster.
            let key = seed_log.map_or_else(|| UNRECOGNIZED.to_string(), |s| s.fail.text);
            result.insert(key, cluster);
        }

        report.line(format!("Resulting clusters: ({})", result.len()));
        for (key, cluster) in &result {
            report.line(format!("  {key}: {cluster}"));
        }
        report.blank();
        Some(result)
    }

    /// Scores of `seed` against each candidate, in candidate order.
    fn score_candidates(
        &self,
        seed: &SeedLog<'_>,
        files: &[PathBuf],
        candidates: &[usize],
        dir: &Path,
    ) -> Vec<f64> {
        let score = |j: &usize| self.comparator.compare_seed(seed, &files[*j], Some(dir));
        if self.parallel {
            candidates.par_iter().map(score).collect()
        } else {
            candidates.iter().map(score).collect()
        }
    }
}
