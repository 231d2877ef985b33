//! Per-KPI time series of a measurement log, for plotting a session.
//!
//! The timestamp column is the first whose name contains `time`; KPI columns
//! are matched by case-insensitive substring against [`TIMESERIES_KPIS`].

use chrono::NaiveTime;
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analyzers::kpi::KpiValue;
use crate::error::LogError;

/// Column name fragments plotted over time.
pub const TIMESERIES_KPIS: [&str; 7] = [
    "NR_PCELL_PCI",
    "NR_PCell_PDSCH Tput(Mbps)",
    "NR_PCell_SS-RSRP",
    "NR_PCell_SS-SINR",
    "NR_PCell_WB CQI",
    "NR_PCell_DL MCS(Avg)",
    "NR_PCell_DL Modulation",
];

const TIME_FORMAT: &str = "%H:%M:%S%.6f";

/// One KPI column as `(x, y)` points; rows with an empty cell are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub x: Vec<String>,
    pub y: Vec<KpiValue>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub data: Vec<Trace>,
    /// Earliest and latest timestamp of the log; null for a log without rows.
    pub time_range: Option<TimeRange>,
}

fn is_timeseries_kpi(column: &str) -> bool {
    let column = column.to_lowercase();
    TIMESERIES_KPIS
        .iter()
        .any(|kpi| column.contains(&kpi.to_lowercase()))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S%.f").ok()
}

/// Extracts the plotted KPI traces of a measurement log.
///
/// # Errors
///
/// [`LogError::MissingColumn`] when no timestamp column exists,
/// [`LogError::NoKpiColumns`] when none of [`TIMESERIES_KPIS`] matches, or
/// [`LogError::Csv`] on malformed CSV.
pub fn extract_timeseries(text: &str) -> Result<TimeSeries, LogError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let time_idx = headers
        .iter()
        .position(|h| h.to_lowercase().contains("time"))
        .ok_or_else(|| LogError::MissingColumn("time".to_string()))?;

    let kpi_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != time_idx && is_timeseries_kpi(&headers[i]))
        .collect();
    if kpi_idx.is_empty() {
        return Err(LogError::NoKpiColumns);
    }

    let mut traces: Vec<Trace> = kpi_idx
        .iter()
        .map(|&i| Trace {
            x: Vec::new(),
            y: Vec::new(),
            name: headers[i].clone(),
        })
        .collect();
    let mut range: Option<(NaiveTime, NaiveTime)> = None;

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let raw_time = record.get(time_idx).unwrap_or_default();
        let Some(time) = parse_time(raw_time) else {
            if !raw_time.trim().is_empty() {
                warn!(row = line + 1, value = raw_time, "Skipping row with unparseable time");
            }
            continue;
        };

        range = Some(match range {
            Some((start, end)) => (start.min(time), end.max(time)),
            None => (time, time),
        });

        let stamp = time.format(TIME_FORMAT).to_string();
        for (trace, &idx) in traces.iter_mut().zip(&kpi_idx) {
            let cell = record.get(idx).map(str::trim).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            trace.x.push(stamp.clone());
            trace.y.push(match cell.parse::<f64>() {
                Ok(n) => KpiValue::Number(n),
                Err(_) => KpiValue::from(cell),
            });
        }
    }

    debug!(traces = traces.len(), "Time series extracted");

    Ok(TimeSeries {
        data: traces,
        time_range: range.map(|(start, end)| TimeRange {
            start: start.format(TIME_FORMAT).to_string(),
            end: end.format(TIME_FORMAT).to_string(),
        }),
    })
}
