// End-to-end: two run directories on disk, clustered and diffed.
use std::path::Path;

use logtriage::diff::{diff_runs, DiffReports};
use logtriage::report::Report;
use logtriage::types::UNRECOGNIZED;
use logtriage::{CorpusComparator, LogComparator, TriageConfig};

const MODEM_STEPS: &[&str] = &[
    "power on the modem and wait for network registration",
    "send sms to the alarm owner with current status",
    "arm the alarm system from the key fob remote",
    "open the driver door while the alarm is armed",
    "wait ten seconds for the siren relay to switch",
];

const TILT_STEPS: &[&str] = &[
    "calibrate the tilt sensor on a flat surface",
    "lift the rear axle with a hydraulic jack slowly",
    "wait for the tilt notification on the phone",
    "lower the car back onto the ground carefully",
];

fn write_log(dir: &Path, case: u64, steps: &[&str], fail: &str) {
    let mut text = String::from("Port: COM3\nBaud: 115200\nMessage code:    2\n");
    for (i, step) in steps.iter().enumerate() {
        text.push_str(&format!("2017-05-17 15:33:{i:02} LOG_INFO :: {step}\n"));
    }
    text.push_str(&format!("2017-05-17 15:34:00 LOG_INFO :: {fail}\n"));
    text.push_str("2017-05-17 15:34:01 LOG_INFO :: teardown\n");
    std::fs::write(dir.join(format!("log_{case}.log")), text).unwrap();
}

fn config() -> TriageConfig {
    TriageConfig {
        parallel: false,
        ..TriageConfig::default()
    }
}

#[test]
fn clusters_near_duplicates_and_keeps_others_apart() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    let mut variant = MODEM_STEPS.to_vec();
    variant[0] = "power on the modem and wait for network registrations";
    write_log(dir, 101, MODEM_STEPS, "FAIL: siren did not start");
    write_log(dir, 102, &variant, "FAIL: siren did not start!");
    write_log(dir, 103, TILT_STEPS, "FAIL: tilt alarm not received");

    let cmp = LogComparator::new(&config());
    let ab = cmp.compare(&dir.join("log_101.log"), &dir.join("log_102.log"));
    let ac = cmp.compare(&dir.join("log_101.log"), &dir.join("log_103.log"));
    assert!(ab > 0.5, "ab = {ab}");
    assert!(ac <= 0.5, "ac = {ac}");

    let result = CorpusComparator::new(&config())
        .cluster_dir(dir, &Report::none())
        .unwrap();
    assert_eq!(result.len(), 2);

    let siren = &result["FAIL: siren did not start"];
    assert_eq!(siren.cases[&101], 1.0);
    assert!((siren.cases[&102] - ab).abs() < 1e-9);

    let tilt = &result["FAIL: tilt alarm not received"];
    assert_eq!(tilt.cases.len(), 1);
    assert_eq!(tilt.cases[&103], 1.0);
    assert!(!result.contains_key(UNRECOGNIZED));
}

#[test]
fn diff_reports_only_growth() {
    let tmp = tempfile::tempdir().unwrap();
    let earlier = tmp.path().join("2863");
    let later = tmp.path().join("2907");
    std::fs::create_dir(&earlier).unwrap();
    std::fs::create_dir(&later).unwrap();

    write_log(&earlier, 1, MODEM_STEPS, "FAIL X siren relay silent");
    write_log(&earlier, 2, MODEM_STEPS, "FAIL X siren relay silent");
    write_log(&earlier, 9, TILT_STEPS, "FAIL: tilt alarm not received");

    write_log(&later, 1, MODEM_STEPS, "FAIL X siren relay silent");
    write_log(&later, 2, MODEM_STEPS, "FAIL X siren relay silent");
    write_log(&later, 3, MODEM_STEPS, "FAIL X siren relay silent");

    let diff_path = tmp.path().join("cmp.log");
    let reports = DiffReports {
        earlier: Report::fresh(tmp.path().join("first.log")),
        later: Report::fresh(tmp.path().join("second.log")),
        diff: Report::append(&diff_path),
    };
    let diff = diff_runs(&CorpusComparator::new(&config()), &earlier, &later, &reports).unwrap();

    assert_eq!(
        serde_json::to_value(&diff).unwrap(),
        serde_json::json!({"FAIL X siren relay silent": {"NEW_FAILED_CASES": [3]}})
    );
    let text = std::fs::read_to_string(&diff_path).unwrap();
    assert!(text.contains("NEW_FAILED_CASES: [3]"));
    assert!(tmp.path().join("first.log").is_file());
    assert!(tmp.path().join("second.log").is_file());
}

#[test]
fn unchanged_runs_have_no_diff_and_stable_clusters() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    write_log(dir, 1, MODEM_STEPS, "FAIL X siren relay silent");
    write_log(dir, 2, TILT_STEPS, "FAIL: tilt alarm not received");

    let corpus = CorpusComparator::new(&config());
    let first = corpus.cluster_dir(dir, &Report::none()).unwrap();
    let second = corpus.cluster_dir(dir, &Report::none()).unwrap();
    assert_eq!(first, second);
    assert!(diff_runs(&corpus, dir, dir, &DiffReports::default()).is_none());
}
