//! Registration and latency statistics from the companion summary log.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::LogError;
use crate::parser::{CompanionRow, parse_companion_log};

const REG_REQUEST: &str = "RegRequest5G";
const REG_COMPLETE: &str = "RegComplete5G";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationStats {
    /// Raw request tally halved: the log records two events per attempt.
    #[serde(rename = "attachrequest_count")]
    pub attach_request_count: f64,
    #[serde(rename = "attachcomplete_count")]
    pub attach_complete_count: u64,

    // latency, two-decimal strings
    pub ping_max: String,
    pub ping_min: String,
    pub ping_avg: String,

    // ping attempt counters
    pub ping_attempt_count: i64,
    pub ping_success_count: i64,
    pub ping_error_count: i64,
}

impl RegistrationStats {
    pub fn from_rows(rows: &[CompanionRow]) -> Self {
        let mut requests = 0u64;
        let mut completes = 0u64;
        let mut max: Option<f64> = None;
        let mut min: Option<f64> = None;
        let mut avg_sum = 0.0;
        let mut avg_count = 0usize;
        let mut attempts = 0i64;
        let mut successes = 0i64;
        let mut errors = 0i64;

        for row in rows {
            match row.nas.as_deref() {
                Some(REG_REQUEST) => requests += 1,
                Some(REG_COMPLETE) => completes += 1,
                _ => {}
            }

            if let Some(v) = number("Max", row.max.as_deref()) {
                max = Some(max.map_or(v, |m| m.max(v)));
            }

            if let Some(v) = number("Min", row.min.as_deref()) {
                min = Some(min.map_or(v, |m| m.min(v)));
            }

            if let Some(v) = number("Avg", row.avg.as_deref()) {
                avg_sum += v;
                avg_count += 1;
            }

            if let Some(v) = count("Total", row.total.as_deref()) {
                attempts += v;
            }

            if let Some(v) = count("Success", row.success.as_deref()) {
                successes += v;
            }

            if let Some(v) = count("Error", row.error.as_deref()) {
                errors += v;
            }
        }

        let ping_avg = if avg_count > 0 {
            avg_sum / avg_count as f64
        } else {
            0.0
        };

        debug!(
            rows = rows.len(),
            requests,
            completes,
            avg_samples = avg_count,
            "Companion log counted"
        );

        RegistrationStats {
            attach_request_count: requests as f64 / 2.0,
            attach_complete_count: completes,
            ping_max: format!("{:.2}", max.unwrap_or(0.0)),
            ping_min: format!("{:.2}", min.unwrap_or(0.0)),
            ping_avg: format!("{:.2}", ping_avg),
            ping_attempt_count: attempts,
            ping_success_count: successes,
            ping_error_count: errors,
        }
    }

    /// Parses and counts companion log text.
    pub fn from_log(text: &str) -> Result<Self, LogError> {
        let rows = parse_companion_log(text)?;
        Ok(Self::from_rows(&rows))
    }

    /// Registration success rate in percent; 0 when no request was seen.
    pub fn attach_success_rate(&self) -> f64 {
        if self.attach_request_count > 0.0 {
            self.attach_complete_count as f64 / self.attach_request_count * 100.0
        } else {
            0.0
        }
    }
}

fn number(column: &str, raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(column, value = raw, "Skipping non-numeric value");
            None
        }
    }
}

fn count(column: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(column, value = raw, "Skipping non-integer count");
            None
        }
    }
}
