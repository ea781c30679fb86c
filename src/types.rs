use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Numeric test-case id embedded in a log's filename.
pub type CaseId = u64;

/// Cluster key used when the seed log has no fail line.
pub const UNRECOGNIZED: &str = "unrecognized";

/// First line of a log containing the failure marker, with its 0-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailSignature {
    pub text: String,
    pub line_index: usize,
}

impl fmt::Display for FailSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.text, self.line_index)
    }
}

/// Logs judged to share one underlying failure.
///
/// `cases` maps each member's case id to its score against the seed (the seed
/// itself maps to 1.0). Members whose filename carries no case id are kept in
/// `unidentified` so they are not silently lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cases: BTreeMap<CaseId, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unidentified: Vec<PathBuf>,
}

impl Cluster {
    pub fn insert(&mut self, case: Option<CaseId>, path: PathBuf, score: f64) {
        match case {
            Some(id) => {
                self.cases.entry(id).or_insert(score);
            }
            None => self.unidentified.push(path),
        }
    }

    pub fn len(&self) -> usize {
        self.cases.len() + self.unidentified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn case_ids(&self) -> BTreeSet<CaseId> {
        self.cases.keys().copied().collect()
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (id, score)) in self.cases.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}: {score:.3}")?;
        }
        if !self.unidentified.is_empty() {
            write!(f, "; {} without case id", self.unidentified.len())?;
        }
        write!(f, "}}")
    }
}

/// Clusters of one run's directory, keyed by fail-line text.
pub type RunResult = BTreeMap<String, Cluster>;

/// Case ids that appear under a cluster key in the later run only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFailures {
    #[serde(rename = "NEW_FAILED_CASES")]
    pub new_failed_cases: BTreeSet<CaseId>,
}

/// Growth between two runs, keyed by cluster key.
pub type RunDiff = BTreeMap<String, NewFailures>;

/// Where a run's logs come from before clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunOrigin {
    /// Logs already present under the logs directory.
    Local,
    /// Logs are materialized from a run export first.
    Remote,
}

impl fmt::Display for RunOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOrigin::Local => write!(f, "local"),
            RunOrigin::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for RunOrigin {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(RunOrigin::Local),
            "remote" => Ok(RunOrigin::Remote),
            _ => Err(format!("unknown run origin: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_insert_keeps_first_score() {
        let mut c = Cluster::default();
        c.insert(Some(7), PathBuf::from("log_7.log"), 1.0);
        c.insert(Some(7), PathBuf::from("log_7.log"), 0.6);
        c.insert(None, PathBuf::from("notes.log"), 0.9);
        assert_eq!(c.cases.get(&7), Some(&1.0));
        assert_eq!(c.unidentified, vec![PathBuf::from("notes.log")]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_new_failures_serialized_key() {
        let mut diff = RunDiff::new();
        diff.insert(
            "FAIL X".to_string(),
            NewFailures {
                new_failed_cases: [3].into_iter().collect(),
            },
        );
        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(json, serde_json::json!({"FAIL X": {"NEW_FAILED_CASES": [3]}}));
    }

    #[test]
    fn test_run_origin_parse() {
        assert_eq!("Remote".parse::<RunOrigin>().unwrap(), RunOrigin::Remote);
        assert!("ftp".parse::<RunOrigin>().is_err());
        assert_eq!(RunOrigin::Local.to_string(), "local");
    }
}
