//! Failing test-log triage.
//!
//! Clusters the logs of one test run by failure similarity and reports which
//! failure clusters grew between two runs. A pair of logs is scored from the
//! similarity of their fail lines, their log bodies line by line, hashed word
//! shingles of the bodies, and optional device captures.

pub mod compare;
pub mod config;
pub mod corpus;
pub mod device;
pub mod diff;
pub mod error;
pub mod job;
pub mod logfile;
pub mod report;
pub mod shingle;
pub mod similarity;
pub mod source;
pub mod types;

pub use compare::LogComparator;
pub use config::TriageConfig;
pub use corpus::CorpusComparator;
pub use error::TriageError;
pub use types::{Cluster, FailSignature, NewFailures, RunDiff, RunResult};
