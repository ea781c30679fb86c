use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use logtriage::config::{self, CliOverrides, TriageConfig};
use logtriage::diff::{self, DiffReports};
use logtriage::job::{self, JobOutcome, TriageJob};
use logtriage::report::Report;
use logtriage::source::{self, JsonExportSource};
use logtriage::types::{RunDiff, RunOrigin, RunResult};
use logtriage::{logfile, CorpusComparator, LogComparator};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "logtriage",
    version,
    about = "Cluster failing test logs and diff failure clusters between runs"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true, default_value = "logtriage.toml")]
    config: PathBuf,

    /// Minimum score for a log to join a cluster
    #[arg(long, global = true)]
    cluster_threshold: Option<f64>,

    /// Minimum fail-line similarity for two logs to be compared at all
    #[arg(long, global = true)]
    fail_line_threshold: Option<f64>,

    /// Compare logs one at a time instead of on the thread pool
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cluster all logs of one run directory
    Cluster {
        /// Directory holding log_<case>.log files
        dir: PathBuf,

        /// Report file (replaced if it exists)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the clusters as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report failure clusters that grew from an earlier run to a later one
    Diff {
        /// Earlier run directory
        earlier: PathBuf,

        /// Later run directory
        later: PathBuf,

        /// Cluster report of the earlier run
        #[arg(long)]
        first_report: Option<PathBuf>,

        /// Cluster report of the later run
        #[arg(long)]
        second_report: Option<PathBuf>,

        /// Diff report (appended)
        #[arg(long)]
        diff_report: Option<PathBuf>,

        /// Print the diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a single pair of logs
    Compare {
        first: PathBuf,
        second: PathBuf,

        /// Directory with device captures (defaults to the first log's directory)
        #[arg(long)]
        device_dir: Option<PathBuf>,
    },

    /// Triage one run, or diff two runs, using the configured directories
    Run {
        /// Run id (the earlier one when diffing)
        first_run: u64,

        /// Later run id
        second_run: Option<u64>,

        /// Where the logs come from
        #[arg(long, value_enum, default_value = "local")]
        origin: RunOrigin,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a run's failed-test logs from its export
    Materialize {
        /// Run id
        run: u64,

        /// Base directory for run log directories
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the effective configuration
    Info,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("logtriage=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        fail_line_threshold: cli.fail_line_threshold,
        cluster_threshold: cli.cluster_threshold,
        sequential: cli.sequential,
    };
    let cfg = config::build_config(&cli.config, &overrides)?;

    match cli.command {
        Command::Cluster { dir, report, json } => {
            let report = report.map_or_else(Report::none, Report::fresh);
            let corpus = CorpusComparator::new(&cfg);
            let result = tokio::task::spawn_blocking(move || corpus.cluster_dir(&dir, &report))
                .await
                .context("clustering task panicked")?;
            print_run_result(result.as_ref(), json)?;
        }

        Command::Diff {
            earlier,
            later,
            first_report,
            second_report,
            diff_report,
            json,
        } => {
            let reports = DiffReports {
                earlier: first_report.map_or_else(Report::none, Report::fresh),
                later: second_report.map_or_else(Report::none, Report::fresh),
                diff: diff_report.map_or_else(Report::none, Report::append),
            };
            let corpus = CorpusComparator::new(&cfg);
            let result = tokio::task::spawn_blocking(move || {
                diff::diff_runs(&corpus, &earlier, &later, &reports)
            })
            .await
            .context("diff task panicked")?;
            print_run_diff(result.as_ref(), json)?;
        }

        Command::Compare {
            first,
            second,
            device_dir,
        } => {
            cmd_compare(&cfg, &first, &second, device_dir.as_deref());
        }

        Command::Run {
            first_run,
            second_run,
            origin,
            json,
        } => {
            let triage = TriageJob {
                first_run,
                second_run,
                origin,
            };
            let source = JsonExportSource::new(&cfg.export_dir);
            match job::spawn(cfg.clone(), triage, source).await? {
                JobOutcome::Corpus(result) => print_run_result(result.as_ref(), json)?,
                JobOutcome::Diff(result) => print_run_diff(result.as_ref(), json)?,
            }
        }

        Command::Materialize { run, out } => {
            let base = out.unwrap_or_else(|| cfg.logs_dir.clone());
            let source = JsonExportSource::new(&cfg.export_dir);
            let written = source::materialize_run(&source, &base, run)
                .with_context(|| format!("materializing run {run}"))?;
            println!(
                "{} {} log(s) written to {}",
                "OK".green().bold(),
                written.len(),
                base.join(run.to_string()).display()
            );
        }

        Command::Info => {
            print_config(&cfg);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_compare(cfg: &TriageConfig, first: &Path, second: &Path, device_dir: Option<&Path>) {
    let comparator = LogComparator::new(cfg);
    let first_fail = logfile::find_fail_line(first);
    let device_dir = device_dir.or_else(|| first.parent());

    match comparator.breakdown(first, first_fail.as_ref(), second, device_dir) {
        Some(parts) => {
            println!("{}", "Comparison".bold());
            println!("  Fail line: {:.3}", parts.fail_line);
            println!("  Lines:     {:.3}", parts.lines);
            println!("  Shingles:  {:.3}", parts.shingle);
            println!("  Device:    {:.3}", parts.device);
            let score = format!("{:.3}", parts.score);
            let score = if parts.score > cfg.cluster_threshold {
                score.green().bold()
            } else {
                score.yellow().bold()
            };
            println!("  Score:     {score}");
        }
        None => {
            println!("{}", "Not comparable (score 0.000)".yellow().bold());
            match &first_fail {
                Some(f) => println!("  First fail line: {f}"),
                None => println!("  First log has no fail line"),
            }
            match logfile::find_fail_line(second) {
                Some(f) => println!("  Second fail line: {f}"),
                None => println!("  Second log has no fail line"),
            }
        }
    }
}

fn print_run_result(result: Option<&RunResult>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    let Some(result) = result else {
        eprintln!("{}", "No result: log directory not found".red().bold());
        return Ok(());
    };
    println!("{} ({})", "Clusters".bold(), result.len());
    for (key, cluster) in result {
        println!("  {} {}", format!("[{}]", cluster.len()).cyan(), key);
        for (case, score) in &cluster.cases {
            println!("      {case:>8}  {score:.3}");
        }
        for path in &cluster.unidentified {
            println!("      {:>8}  {}", "-", path.display());
        }
    }
    Ok(())
}

fn print_run_diff(result: Option<&RunDiff>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    let Some(diff) = result else {
        println!("{}", "No new failures".green().bold());
        return Ok(());
    };
    println!("{} ({})", "New failures".red().bold(), diff.len());
    for (key, failures) in diff {
        let ids: Vec<String> = failures
            .new_failed_cases
            .iter()
            .map(|id| id.to_string())
            .collect();
        println!("  {key}");
        println!("      {}", ids.join(", "));
    }
    Ok(())
}

fn print_config(cfg: &TriageConfig) {
    println!("logtriage v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Thresholds: fail line {:.2}, cluster {:.2}",
        cfg.fail_line_threshold, cfg.cluster_threshold
    );
    let p = cfg.weights_plain;
    println!(
        "  Weights: shingle={:.2}, fail line={:.2}, lines={:.2}",
        p.shingle, p.fail_line, p.lines
    );
    let d = cfg.weights_with_device;
    println!(
        "  Weights with device log: device={:.2}, shingle={:.2}, fail line={:.2}, lines={:.2}",
        d.device, d.shingle, d.fail_line, d.lines
    );
    println!("  Log extension: .{}", cfg.log_extension);
    println!("  Parallel: {}", cfg.parallel);
    println!("  Logs: {}", cfg.logs_dir.display());
    println!("  Reports: {}", cfg.reports_dir.display());
    println!("  Exports: {}", cfg.export_dir.display());
}
