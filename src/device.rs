//! Auxiliary similarity from device-capture files.
//!
//! A device capture belongs to a test case when its file name contains
//! `parse_` and `case_<id>`, e.g. `case_12204_parse_20170517153355_load_0.txt`.

use std::path::{Path, PathBuf};

use crate::logfile::{case_id_from_path, read_text};
use crate::shingle;
use crate::types::CaseId;

/// Substring every device-capture file name carries.
pub const CAPTURE_MARKER: &str = "parse_";

/// Device-capture files in `dir`, sorted by name.
pub fn list_captures(dir: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/*{}*",
        glob::Pattern::escape(&dir.to_string_lossy()),
        CAPTURE_MARKER
    );
    match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
        Err(e) => {
            tracing::debug!("Bad capture pattern {pattern}: {e}");
            Vec::new()
        }
    }
}

/// First capture whose file name mentions `case_<id>`.
pub fn find_capture(captures: &[PathBuf], case: CaseId) -> Option<&PathBuf> {
    let needle = format!("case_{case}");
    captures.iter().find(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().contains(&needle))
            .unwrap_or(false)
    })
}

/// Shingle similarity of the device captures of two test logs.
///
/// The second log's capture is the first operand of the shingle comparison,
/// which matters when both captures yield the same number of shingles.
///
/// Returns 0.0 when either log has no case id, the directory is missing,
/// either capture is missing, or either capture is empty.
pub fn compare_device_logs(first_log: &Path, second_log: &Path, capture_dir: Option<&Path>) -> f64 {
    let (Some(first_case), Some(second_case), Some(dir)) = (
        case_id_from_path(first_log),
        case_id_from_path(second_log),
        capture_dir,
    ) else {
        return 0.0;
    };
    if !dir.is_dir() {
        tracing::debug!("Device log directory {} not found", dir.display());
        return 0.0;
    }

    let captures = list_captures(dir);
    let (Some(first_path), Some(second_path)) = (
        find_capture(&captures, first_case),
        find_capture(&captures, second_case),
    ) else {
        return 0.0;
    };

    let (Some(first_text), Some(second_text)) = (read_text(first_path), read_text(second_path))
    else {
        return 0.0;
    };
    if first_text.is_empty() || second_text.is_empty() {
        return 0.0;
    }

    let score = shingle::text_similarity(&second_text, &first_text);
    tracing::info!(
        "Device log shingle similarity ({first_case}, {second_case}): {score:.6}"
    );
    score
}
