//! Reading test logs: fail-line lookup, preamble detection, line cleanup and
//! case-id parsing.
//!
//! Every function here fails soft. A missing directory, missing file or
//! absent marker is reported through tracing and yields `None` (or an empty
//! value), never an error.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::types::{CaseId, FailSignature};

/// Substring marking a failed check.
pub const FAIL_MARKER: &str = "FAIL";
/// Substring of the last line of the configuration preamble.
pub const CONFIG_END_MARKER: &str = "Message code:    2";
/// Start of the payload after the per-line timestamp/metadata prefix.
pub const TAG_DELIMITER: &str = "::";

static CASE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"log_").expect("static regex"));

fn strip_terminators(line: &str) -> &str {
    line.trim_matches(|c: char| c == '\n' || c == '\r')
}

/// Split text into lines on `\n`, `\r\n` or a bare `\r`. A trailing
/// terminator does not open an empty last line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(pos) => {
                lines.push(rest[..pos].to_string());
                let width = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + width..];
            }
            None => {
                lines.push(rest.to_string());
                break;
            }
        }
    }
    lines
}

/// Read a file as lines, decoding invalid UTF-8 lossily.
pub fn read_lines(path: &Path) -> Option<Vec<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(split_lines(&String::from_utf8_lossy(&bytes))),
        Err(e) => {
            tracing::info!("Cannot read {}: {}", path.display(), e);
            None
        }
    }
}

/// Read a whole file as text, decoding invalid UTF-8 lossily.
pub fn read_text(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::info!("Cannot read {}: {}", path.display(), e);
            None
        }
    }
}

/// Find the first fail line of `name`, resolved against `dir` when given.
pub fn find_fail_line_in(dir: Option<&Path>, name: &Path) -> Option<FailSignature> {
    let path: PathBuf = match dir {
        Some(dir) => {
            if !dir.is_dir() {
                tracing::info!("Directory {} not found", dir.display());
                return None;
            }
            dir.join(name)
        }
        None => name.to_path_buf(),
    };
    find_fail_line(&path)
}

/// Find the first line containing [`FAIL_MARKER`].
///
/// The signature text starts at the marker, so any prefix before it (time,
/// thread, tags) is not part of the cluster key.
pub fn find_fail_line(path: &Path) -> Option<FailSignature> {
    let lines = read_log(path)?;
    fail_signature(&lines)
}

/// Lines of a log file, or `None` if it is not a readable regular file.
pub fn read_log(path: &Path) -> Option<Vec<String>> {
    if !path.is_file() {
        tracing::info!("File {} not found", path.display());
        return None;
    }
    read_lines(path)
}

/// Fail signature of already-read lines.
pub fn fail_signature(lines: &[String]) -> Option<FailSignature> {
    lines.iter().enumerate().find_map(|(line_index, line)| {
        line.find(FAIL_MARKER).map(|pos| FailSignature {
            text: strip_terminators(&line[pos..]).to_string(),
            line_index,
        })
    })
}

/// 1-based position of the line ending the configuration preamble, or 0.
///
/// Used directly as the start offset of the log body, so the marker line
/// itself is skipped.
pub fn config_end(lines: &[String]) -> usize {
    lines
        .iter()
        .position(|line| line.contains(CONFIG_END_MARKER))
        .map_or(0, |i| i + 1)
}

/// Drop the timestamp/metadata prefix of one line.
pub fn clear_line_tags(line: &str) -> &str {
    match line.find(TAG_DELIMITER) {
        Some(pos) => strip_terminators(&line[pos..]),
        None => strip_terminators(line),
    }
}

/// [`clear_line_tags`] over a slice of lines.
pub fn clear_log_tags<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| clear_line_tags(line.as_ref()).to_string())
        .collect()
}

/// Log body between the preamble and the fail line, most recent line first,
/// with line prefixes removed.
pub fn body_before_fail(lines: &[String], fail: &FailSignature) -> Vec<String> {
    let start = config_end(lines);
    let end = fail.line_index.min(lines.len());
    if start >= end {
        return Vec::new();
    }
    let mut body = clear_log_tags(&lines[start..end]);
    body.reverse();
    body
}

/// Parse the case id out of a log path such as `failed_logs/2863/log_12204.log`.
///
/// The id is the text after a `log_` marker up to the last four characters
/// (dot plus three-letter extension). Each `log_` occurrence is tried in turn
/// until one yields a purely numeric id.
pub fn case_id_from_path(path: &Path) -> Option<CaseId> {
    let name = path.to_string_lossy();
    let ext_start = name.char_indices().rev().nth(3).map(|(i, _)| i)?;
    CASE_MARKER.find_iter(&name).find_map(|m| {
        let candidate = name.get(m.end()..ext_start)?;
        if !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit()) {
            candidate.parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_fail_signature_first_match() {
        let l = lines("boot\n12:00 :: FAIL: no sms\nFAIL again");
        let sig = fail_signature(&l).unwrap();
        assert_eq!(sig.text, "FAIL: no sms");
        assert_eq!(sig.line_index, 1);
    }

    #[test]
    fn test_fail_signature_absent() {
        assert!(fail_signature(&lines("all good\nPASS")).is_none());
    }

    #[test]
    fn test_find_fail_line_missing_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(find_fail_line_in(Some(&missing), Path::new("log_1.log")).is_none());
        assert!(find_fail_line_in(Some(tmp.path()), Path::new("log_1.log")).is_none());
    }

    #[test]
    fn test_find_fail_line_on_disk_crlf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log_5.log");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"start\r\n10:01:02 LOG_INFO :: FAIL timeout\r\nend\r\n")
            .unwrap();
        let sig = find_fail_line_in(Some(tmp.path()), Path::new("log_5.log")).unwrap();
        assert_eq!(sig.text, "FAIL timeout");
        assert_eq!(sig.line_index, 1);
        assert_eq!(find_fail_line(&path), Some(sig));
    }

    #[test]
    fn test_split_lines_terminators() {
        assert_eq!(split_lines("a\nb\r\nc\rd\r"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\r\rb"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_find_fail_line_bare_carriage_returns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log_6.log");
        std::fs::write(&path, "boot\rstep :: one\rFAIL x\r").unwrap();
        let sig = find_fail_line(&path).unwrap();
        assert_eq!(sig.text, "FAIL x");
        assert_eq!(sig.line_index, 2);
    }

    #[test]
    fn test_config_end() {
        let l = lines("cfg a\nMessage code:    2 done\nbody");
        assert_eq!(config_end(&l), 2);
        assert_eq!(config_end(&lines("body only")), 0);
    }

    #[test]
    fn test_clear_line_tags() {
        assert_eq!(clear_line_tags("12:00:01 [3] :: modem ready\r"), ":: modem ready");
        assert_eq!(clear_line_tags("  no tags here\n"), "  no tags here");
    }

    #[test]
    fn test_body_before_fail_reversed_window() {
        let l = lines("cfg\nMessage code:    2\nt :: one\nt :: two\nt :: FAIL x\ntail");
        let fail = fail_signature(&l).unwrap();
        assert_eq!(body_before_fail(&l, &fail), vec![":: two", ":: one"]);
    }

    #[test]
    fn test_body_before_fail_without_preamble_starts_at_zero() {
        let l = lines("a :: one\nFAIL");
        let fail = fail_signature(&l).unwrap();
        assert_eq!(body_before_fail(&l, &fail), vec![":: one"]);
    }

    #[test]
    fn test_body_before_fail_preamble_after_fail() {
        let l = lines("FAIL early\nMessage code:    2");
        let fail = fail_signature(&l).unwrap();
        assert!(body_before_fail(&l, &fail).is_empty());
    }

    #[test]
    fn test_case_id_from_path() {
        assert_eq!(case_id_from_path(Path::new("failed_logs/2863/log_12204.log")), Some(12204));
        assert_eq!(case_id_from_path(Path::new("log_7.log")), Some(7));
        assert_eq!(case_id_from_path(Path::new("my_log_dir/log_42.log")), Some(42));
        assert_eq!(case_id_from_path(Path::new("log_abc.log")), None);
        assert_eq!(case_id_from_path(Path::new("summary.log")), None);
        assert_eq!(case_id_from_path(Path::new("log_.log")), None);
    }
}
