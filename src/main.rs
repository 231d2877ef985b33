//! CLI entry point for the NR drive-test rater.
//!
//! Provides subcommands for segmenting a single measurement log, extracting
//! its KPI time series, summarizing a companion log, and evaluating a
//! directory of sessions against site criteria.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nr_drive_rater::{
    analyzers::segment_log,
    criteria::{CriteriaTable, SiteTable},
    output::{append_verdicts, print_json, write_json},
    pipeline::process_batch,
    session::discover_sessions,
    stats::RegistrationStats,
    timeseries::extract_timeseries,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nr_drive_rater")]
#[command(about = "A tool to segment and grade 5G NR drive-test logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a measurement log into download, upload and speed test phases
    Segment {
        /// Path to the measurement (NR_RF) CSV log
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// Summarize registration and ping statistics of a companion log
    Summary {
        /// Path to the companion (Summary) CSV log
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// Extract per-KPI time series of a measurement log
    Timeseries {
        /// Path to the measurement (NR_RF) CSV log
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// Process every session in a directory and grade it against site criteria
    Evaluate {
        /// Directory containing extracted session logs
        #[arg(short, long, default_value = "logs_in")]
        dir: String,

        /// CSV export of the site table
        #[arg(short, long, default_value = "sites.csv")]
        sites: String,

        /// CSV export of the criteria table
        #[arg(short = 'k', long, default_value = "criteria.csv")]
        criteria: String,

        /// JSON file to write session records to (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Optional: CSV file to append flat verdict rows to
        #[arg(long)]
        verdicts: Option<String>,

        /// Maximum number of sessions processed concurrently
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nr_drive_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nr_drive_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment { file } => {
            let text = read_log(&file)?;
            let report = segment_log(&text).with_context(|| format!("rejected '{file}'"))?;
            print_json(&report)?;
        }
        Commands::Summary { file } => {
            let text = read_log(&file)?;
            let stats =
                RegistrationStats::from_log(&text).with_context(|| format!("rejected '{file}'"))?;
            print_json(&stats)?;
        }
        Commands::Timeseries { file } => {
            let text = read_log(&file)?;
            let series =
                extract_timeseries(&text).with_context(|| format!("rejected '{file}'"))?;
            print_json(&series)?;
        }
        Commands::Evaluate {
            dir,
            sites,
            criteria,
            output,
            verdicts,
            concurrency,
        } => {
            evaluate_dir(
                &dir,
                &sites,
                &criteria,
                output.as_deref(),
                verdicts.as_deref(),
                concurrency,
            )
            .await?;
        }
    }

    Ok(())
}

/// Filter from `var`, falling back to `default` when unset or invalid.
fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

#[tracing::instrument]
fn read_log(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read '{path}'"))
}

/// Loads the lookup tables, processes every session of `dir` and writes the
/// results.
#[tracing::instrument(skip(output, verdicts))]
async fn evaluate_dir(
    dir: &str,
    sites_path: &str,
    criteria_path: &str,
    output: Option<&str>,
    verdicts: Option<&str>,
    concurrency: usize,
) -> Result<()> {
    let sites = SiteTable::load(sites_path)?;
    let criteria = CriteriaTable::load(criteria_path)?;
    if sites.is_empty() {
        warn!(path = sites_path, "Site table is empty, every session will lack a site");
    }

    let sessions = discover_sessions(Path::new(dir))?;
    if sessions.is_empty() {
        warn!(dir, "No session logs found");
    }

    let records = process_batch(sessions, Arc::new(sites), Arc::new(criteria), concurrency).await;

    let failed = records.iter().filter(|r| !r.errors.is_empty()).count();
    info!(sessions = records.len(), failed, "Evaluation finished");

    match output {
        Some(path) => write_json(path, &records)?,
        None => print_json(&records)?,
    }

    if let Some(path) = verdicts {
        let rows = append_verdicts(path, &records)?;
        info!(path, rows, "Verdict rows appended");
    }

    Ok(())
}
