//! Pairwise log comparison.
//!
//! Two logs are only comparable when both have a fail line and those fail
//! lines are close enough. The final score blends fail-line similarity,
//! line-by-line similarity of the log bodies (most recent line first), shingle
//! similarity of the whole bodies and, when captures exist, device-log
//! similarity.

use serde::Serialize;
use std::path::Path;

use crate::config::{TriageConfig, Weights};
use crate::types::FailSignature;
use crate::{device, logfile, shingle, similarity};

/// Component scores of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub fail_line: f64,
    pub shingle: f64,
    pub device: f64,
    pub lines: f64,
    pub score: f64,
}

/// The first side of a comparison, read once and reused against many
/// candidates.
#[derive(Debug, Clone)]
pub struct SeedLog<'a> {
    pub path: &'a Path,
    pub fail: FailSignature,
    body: Vec<String>,
}

impl<'a> SeedLog<'a> {
    /// Read `path` and locate its own fail line.
    pub fn load(path: &'a Path) -> Option<Self> {
        let lines = logfile::read_log(path)?;
        let fail = logfile::fail_signature(&lines)?;
        Some(Self::from_lines(path, &lines, fail))
    }

    /// Read `path` taking `fail` as its fail line.
    pub fn with_fail(path: &'a Path, fail: FailSignature) -> Option<Self> {
        let lines = logfile::read_log(path)?;
        Some(Self::from_lines(path, &lines, fail))
    }

    fn from_lines(path: &'a Path, lines: &[String], fail: FailSignature) -> Self {
        let body = logfile::body_before_fail(lines, &fail);
        Self { path, fail, body }
    }
}

/// Scores pairs of log files.
#[derive(Debug, Clone)]
pub struct LogComparator {
    fail_line_threshold: f64,
    weights_plain: Weights,
    weights_with_device: Weights,
}

impl Default for LogComparator {
    fn default() -> Self {
        Self::new(&TriageConfig::default())
    }
}

impl LogComparator {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            fail_line_threshold: config.fail_line_threshold,
            weights_plain: config.weights_plain,
            weights_with_device: config.weights_with_device,
        }
    }

    /// Score two logs in `[0, 1]`. Device captures are looked up next to the
    /// first log.
    pub fn compare(&self, first: &Path, second: &Path) -> f64 {
        let first_fail = logfile::find_fail_line(first);
        self.compare_with_fail(first, first_fail.as_ref(), second, first.parent())
    }

    /// Score two logs reusing an already located fail line for `first`.
    ///
    /// `first_fail` is taken as authoritative: `None` means the first log has
    /// no fail line and the pair scores 0.0.
    pub fn compare_with_fail(
        &self,
        first: &Path,
        first_fail: Option<&FailSignature>,
        second: &Path,
        device_dir: Option<&Path>,
    ) -> f64 {
        let score = self
            .breakdown(first, first_fail, second, device_dir)
            .map_or(0.0, |b| b.score);
        log_score(first, second, score);
        score
    }

    /// Score an already read seed against `second`.
    pub fn compare_seed(&self, seed: &SeedLog<'_>, second: &Path, device_dir: Option<&Path>) -> f64 {
        let score = self
            .breakdown_seed(seed, second, device_dir)
            .map_or(0.0, |b| b.score);
        log_score(seed.path, second, score);
        score
    }

    /// Component scores, or `None` whenever the pair is not comparable.
    pub fn breakdown(
        &self,
        first: &Path,
        first_fail: Option<&FailSignature>,
        second: &Path,
        device_dir: Option<&Path>,
    ) -> Option<ScoreBreakdown> {
        let seed = SeedLog::with_fail(first, first_fail?.clone())?;
        self.breakdown_seed(&seed, second, device_dir)
    }

    /// [`Self::breakdown`] for an already read seed.
    pub fn breakdown_seed(
        &self,
        seed: &SeedLog<'_>,
        second: &Path,
        device_dir: Option<&Path>,
    ) -> Option<ScoreBreakdown> {
        let second_lines = logfile::read_log(second)?;
        let second_fail = logfile::fail_signature(&second_lines)?;

        let fail_line = similarity::line_similarity(&seed.fail.text, &second_fail.text);
        if fail_line < self.fail_line_threshold {
            tracing::debug!(
                "Fail lines too far apart ({fail_line:.3}): {:?} vs {:?}",
                seed.fail.text,
                second_fail.text
            );
            return None;
        }

        let first_body = &seed.body;
        let second_body = logfile::body_before_fail(&second_lines, &second_fail);

        let paired = first_body.len().min(second_body.len());
        if paired == 0 {
            return None;
        }

        let shingle = shingle::text_similarity(&first_body.join(" "), &second_body.join(" "));
        let device = device::compare_device_logs(seed.path, second, device_dir);
        let lines = first_body
            .iter()
            .zip(second_body.iter())
            .map(|(a, b)| similarity::line_similarity(a, b))
            .sum::<f64>()
            / paired as f64;

        let w = if device == 0.0 {
            self.weights_plain
        } else {
            self.weights_with_device
        };
        let score =
            w.device * device + w.shingle * shingle + w.fail_line * fail_line + w.lines * lines;

        Some(ScoreBreakdown {
            fail_line,
            shingle,
            device,
            lines,
            score,
        })
    }
}

fn log_score(first: &Path, second: &Path, score: f64) {
    tracing::info!(
        "Comparison result ({}, {}): {:.6}",
        first.display(),
        second.display(),
        score
    );
}
