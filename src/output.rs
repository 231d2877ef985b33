//! Output formatting and persistence for session records.
//!
//! Supports pretty JSON to stdout or a file, and a flat verdict CSV append.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::kpi::KpiValue;
use crate::pipeline::SessionRecord;

/// Prints any serializable value to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a value to `path` as pretty-printed JSON, replacing the file.
pub fn write_json<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write '{path}'"))?;
    info!(path, "JSON output written");
    Ok(())
}

/// One row of the flat verdict table.
#[derive(Debug, Serialize)]
struct VerdictRow<'a> {
    session_id: &'a str,
    kpi_name: &'a str,
    result: String,
    status: &'static str,
    pass_value: f64,
    conditional_pass_value: f64,
    unit: &'a str,
}

/// Appends one row per (session, criterion) verdict to a CSV file.
///
/// Creates the file with headers if it does not already exist. Sessions
/// without verdicts contribute no rows. Returns the number of rows written.
pub fn append_verdicts(path: &str, records: &[SessionRecord]) -> Result<usize> {
    if records.iter().all(|r| r.verdicts().next().is_none()) {
        return Ok(0);
    }

    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending verdict rows");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open '{path}'"))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    let mut rows = 0;
    for record in records {
        for verdict in record.verdicts() {
            writer.serialize(VerdictRow {
                session_id: &record.session_id,
                kpi_name: &verdict.kpi_name,
                result: match &verdict.result {
                    Some(KpiValue::Number(n)) => n.to_string(),
                    Some(KpiValue::Text(s)) => s.clone(),
                    None => String::new(),
                },
                status: verdict.status.as_str(),
                pass_value: verdict.pass_value,
                conditional_pass_value: verdict.conditional_pass_value,
                unit: &verdict.unit,
            })?;
            rows += 1;
        }
    }
    writer.flush()?;

    Ok(rows)
}
