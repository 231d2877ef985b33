//! Flattening of the segmentation and registration summaries into the
//! canonical KPI names referenced by criteria tables.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::types::SegmentationReport;
use crate::error::CriteriaError;
use crate::parser::KpiField;
use crate::stats::RegistrationStats;

pub const PDSCH_PEAK: &str = "PDSCH_Peak";
pub const PUSCH_PEAK: &str = "PUSCH_Peak";
pub const SPEEDTEST_DL: &str = "Ookla_DL(Mbps)";
pub const SPEEDTEST_UL: &str = "Ookla_UL(Mbps)";
pub const PDSCH_AVG: &str = "PDSCH_Avg";
pub const PUSCH_AVG: &str = "PUSCH_Avg";
pub const PING_AVG: &str = "Ping _avg";
pub const ATTACH_SUCCESS_RATE: &str = "Attach_Successrate";

/// Raw KPI value as handed to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiValue {
    Number(f64),
    Text(String),
}

impl KpiValue {
    /// Numeric coercion of the value.
    pub fn as_number(&self) -> Result<f64, CriteriaError> {
        match self {
            KpiValue::Number(n) => Ok(*n),
            KpiValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| CriteriaError::NotNumeric(s.clone())),
        }
    }
}

impl From<&str> for KpiValue {
    fn from(s: &str) -> Self {
        KpiValue::Text(s.to_string())
    }
}

pub type KpiMap = BTreeMap<String, KpiValue>;

/// Builds the KPI map from whichever summaries are available.
///
/// Values are taken as the formatted strings of the summaries, so the
/// evaluator sees the same two-decimal rounding a reader of the record sees.
/// KPIs whose source is unavailable are left out and evaluate to "No data".
pub fn assemble_kpis(
    tests: Option<&SegmentationReport>,
    summary: Option<&RegistrationStats>,
) -> KpiMap {
    let mut kpis = KpiMap::new();
    let mut put = |name: &str, value: Option<&str>| {
        if let Some(v) = value {
            kpis.insert(name.to_string(), KpiValue::from(v));
        }
    };

    if let Some(tests) = tests {
        put(PDSCH_PEAK, tests.download.dl_peak.as_deref());
        put(PUSCH_PEAK, tests.upload.ul_peak.as_deref());
        put(SPEEDTEST_DL, tests.speed_test.dl_peak.as_deref());
        put(SPEEDTEST_UL, tests.speed_test.ul_peak.as_deref());
        put(PDSCH_AVG, tests.download.average(KpiField::PdschTput));
        put(PUSCH_AVG, tests.upload.average(KpiField::PuschTput));
    }

    if let Some(summary) = summary {
        put(PING_AVG, Some(summary.ping_avg.as_str()));
        kpis.insert(
            ATTACH_SUCCESS_RATE.to_string(),
            KpiValue::Number(summary.attach_success_rate()),
        );
    }

    kpis
}
