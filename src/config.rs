use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Score weights for one pairwise comparison. Components sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub device: f64,
    pub shingle: f64,
    pub fail_line: f64,
    pub lines: f64,
}

/// Full triage configuration, merged from file + env + CLI.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    // Thresholds (0.0-1.0)
    pub fail_line_threshold: f64,
    pub cluster_threshold: f64,

    // Weights, chosen by whether a device capture was found
    pub weights_plain: Weights,
    pub weights_with_device: Weights,

    // Corpus
    pub log_extension: String,
    pub parallel: bool,

    // Paths
    pub logs_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            fail_line_threshold: 0.65,
            cluster_threshold: 0.50,
            weights_plain: Weights {
                device: 0.0,
                shingle: 0.2,
                fail_line: 0.3,
                lines: 0.5,
            },
            weights_with_device: Weights {
                device: 0.1,
                shingle: 0.2,
                fail_line: 0.3,
                lines: 0.4,
            },
            log_extension: "log".to_string(),
            parallel: true,
            logs_dir: PathBuf::from("failed_logs"),
            reports_dir: PathBuf::from("auto_analyzer_logs"),
            export_dir: PathBuf::from("run_exports"),
        }
    }
}

// ---------------------------------------------------------------------------
// TOML config structures (deserialized from logtriage.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    thresholds: Option<TomlThresholds>,
    weights: Option<TomlWeights>,
    pipeline: Option<TomlPipeline>,
    paths: Option<TomlPaths>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlThresholds {
    fail_line: Option<f64>,
    cluster: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlWeightSet {
    device: Option<f64>,
    shingle: Option<f64>,
    fail_line: Option<f64>,
    lines: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlWeights {
    plain: Option<TomlWeightSet>,
    with_device: Option<TomlWeightSet>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlPipeline {
    log_extension: Option<String>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlPaths {
    logs_dir: Option<String>,
    reports_dir: Option<String>,
    export_dir: Option<String>,
}

fn merge_weights(set: Option<TomlWeightSet>, defaults: Weights) -> Weights {
    let set = set.unwrap_or_default();
    Weights {
        device: set.device.unwrap_or(defaults.device),
        shingle: set.shingle.unwrap_or(defaults.shingle),
        fail_line: set.fail_line.unwrap_or(defaults.fail_line),
        lines: set.lines.unwrap_or(defaults.lines),
    }
}

// ---------------------------------------------------------------------------
// TOML loader
// ---------------------------------------------------------------------------

/// Parse configuration text in logtriage.toml format.
pub fn parse_toml_config(content: &str) -> Result<TriageConfig> {
    let toml_cfg: TomlConfig = toml::from_str(content).context("parsing triage config")?;
    let defaults = TriageConfig::default();

    let thresholds = toml_cfg.thresholds.unwrap_or_default();
    let weights = toml_cfg.weights.unwrap_or_default();
    let pipeline = toml_cfg.pipeline.unwrap_or_default();
    let paths = toml_cfg.paths.unwrap_or_default();

    Ok(TriageConfig {
        fail_line_threshold: thresholds
            .fail_line
            .unwrap_or(defaults.fail_line_threshold),
        cluster_threshold: thresholds.cluster.unwrap_or(defaults.cluster_threshold),
        weights_plain: merge_weights(weights.plain, defaults.weights_plain),
        weights_with_device: merge_weights(weights.with_device, defaults.weights_with_device),
        log_extension: pipeline
            .log_extension
            .map(|e| e.trim_start_matches('.').to_string())
            .unwrap_or(defaults.log_extension),
        parallel: pipeline.parallel.unwrap_or(defaults.parallel),
        logs_dir: paths
            .logs_dir
            .map(PathBuf::from)
            .unwrap_or(defaults.logs_dir),
        reports_dir: paths
            .reports_dir
            .map(PathBuf::from)
            .unwrap_or(defaults.reports_dir),
        export_dir: paths
            .export_dir
            .map(PathBuf::from)
            .unwrap_or(defaults.export_dir),
    })
}

/// Load configuration from logtriage.toml.
pub fn load_toml_config(path: &Path) -> Result<TriageConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_toml_config(&content).with_context(|| format!("parsing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Env var overlay (applied on top of any config source)
// ---------------------------------------------------------------------------

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment variable overrides to a TriageConfig.
/// Env vars always win over file-based config.
fn apply_env_overrides(cfg: &mut TriageConfig) {
    if let Ok(v) = std::env::var("TRIAGE_FAIL_LINE_THRESHOLD") {
        if let Ok(f) = v.parse::<f64>() {
            cfg.fail_line_threshold = f;
        }
    }
    if let Ok(v) = std::env::var("TRIAGE_CLUSTER_THRESHOLD") {
        if let Ok(f) = v.parse::<f64>() {
            cfg.cluster_threshold = f;
        }
    }
    if let Ok(v) = std::env::var("TRIAGE_PARALLEL") {
        if let Some(b) = parse_bool(&v) {
            cfg.parallel = b;
        }
    }
    if let Ok(v) = std::env::var("TRIAGE_LOGS_DIR") {
        cfg.logs_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("TRIAGE_REPORTS_DIR") {
        cfg.reports_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("TRIAGE_EXPORT_DIR") {
        cfg.export_dir = PathBuf::from(v);
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Command-line overrides, highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub fail_line_threshold: Option<f64>,
    pub cluster_threshold: Option<f64>,
    pub sequential: bool,
}

/// Build a TriageConfig with the following precedence (highest wins):
///   1. CLI flags
///   2. Environment variables
///   3. logtriage.toml (if present)
///   4. Compiled defaults
pub fn build_config(config_path: &Path, cli: &CliOverrides) -> Result<TriageConfig> {
    let mut cfg = if config_path.exists() {
        tracing::info!("Loading config from {}", config_path.display());
        load_toml_config(config_path)?
    } else {
        tracing::debug!("No config file found, using defaults");
        TriageConfig::default()
    };

    apply_env_overrides(&mut cfg);

    if let Some(t) = cli.fail_line_threshold {
        cfg.fail_line_threshold = t;
    }
    if let Some(t) = cli.cluster_threshold {
        cfg.cluster_threshold = t;
    }
    if cli.sequential {
        cfg.parallel = false;
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TriageConfig::default();
        assert_eq!(cfg.fail_line_threshold, 0.65);
        assert_eq!(cfg.cluster_threshold, 0.50);
        let p = cfg.weights_plain;
        assert!((p.shingle + p.fail_line + p.lines - 1.0).abs() < 1e-9);
        let d = cfg.weights_with_device;
        assert!((d.device + d.shingle + d.fail_line + d.lines - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg = parse_toml_config(
            r#"
            [thresholds]
            cluster = 0.7

            [weights.with_device]
            device = 0.2
            lines = 0.3

            [pipeline]
            log_extension = ".txt"
            parallel = false

            [paths]
            logs_dir = "/srv/logs"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cluster_threshold, 0.7);
        assert_eq!(cfg.fail_line_threshold, 0.65);
        assert_eq!(cfg.weights_with_device.device, 0.2);
        assert_eq!(cfg.weights_with_device.lines, 0.3);
        assert_eq!(cfg.weights_with_device.shingle, 0.2);
        assert_eq!(cfg.weights_plain, TriageConfig::default().weights_plain);
        assert_eq!(cfg.log_extension, "txt");
        assert!(!cfg.parallel);
        assert_eq!(cfg.logs_dir, PathBuf::from("/srv/logs"));
        assert_eq!(cfg.reports_dir, PathBuf::from("auto_analyzer_logs"));
    }

    #[test]
    fn test_parse_empty_toml() {
        let cfg = parse_toml_config("").unwrap();
        assert_eq!(cfg.cluster_threshold, 0.50);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(parse_toml_config("[thresholds]\ncluster = \"high\"").is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = CliOverrides {
            fail_line_threshold: Some(0.9),
            cluster_threshold: None,
            sequential: true,
        };
        let cfg = build_config(Path::new("/nonexistent/logtriage.toml"), &cli).unwrap();
        assert_eq!(cfg.fail_line_threshold, 0.9);
        assert!(!cfg.parallel);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
