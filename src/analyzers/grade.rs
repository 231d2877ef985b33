//! Threshold evaluation of KPI values against a site's criteria.

use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::analyzers::kpi::{KpiMap, KpiValue};
use crate::criteria::Criterion;
use crate::error::CriteriaError;

/// Comparison operator of a criterion condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
    Above,
    Below,
}

impl FromStr for Comparison {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">=" => Ok(Comparison::AtLeast),
            "<=" => Ok(Comparison::AtMost),
            ">" => Ok(Comparison::Above),
            "<" => Ok(Comparison::Below),
            other => Err(CriteriaError::UnknownComparisonOperator(other.to_string())),
        }
    }
}

impl Comparison {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtLeast => value >= threshold,
            Comparison::AtMost => value <= threshold,
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
        }
    }
}

/// Outcome of one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Pass,
    #[serde(rename = "Conditional Pass")]
    ConditionalPass,
    Fail,
    #[serde(rename = "No data")]
    NoData,
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "Pass",
            Verdict::ConditionalPass => "Conditional Pass",
            Verdict::Fail => "Fail",
            Verdict::NoData => "No data",
            Verdict::Error => "Error",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (file, criterion) verdict. Always carries the criterion's thresholds
/// and unit so it can be rendered as "value vs. threshold" on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub kpi_name: String,
    /// Coerced number, the raw value on coercion failure, or null.
    pub result: Option<KpiValue>,
    pub status: Verdict,
    pub pass_value: f64,
    pub conditional_pass_value: f64,
    pub unit: String,
}

/// Scores a numeric value: pass condition first, then conditional pass.
///
/// Both operators are validated up front, so a malformed conditional
/// operator is reported even when the pass condition would hold.
pub fn grade(criterion: &Criterion, value: f64) -> Result<Verdict, CriteriaError> {
    let pass: Comparison = criterion.pass_condition.parse()?;
    let conditional: Comparison = criterion.conditional_pass_condition.parse()?;

    Ok(if pass.holds(value, criterion.pass_value) {
        Verdict::Pass
    } else if conditional.holds(value, criterion.conditional_pass_value) {
        Verdict::ConditionalPass
    } else {
        Verdict::Fail
    })
}

/// Evaluates every criterion, in order, against the KPI map.
pub fn evaluate(criteria: &[Criterion], kpis: &KpiMap) -> Vec<EvaluationResult> {
    criteria
        .iter()
        .map(|criterion| evaluate_one(criterion, kpis))
        .collect()
}

fn evaluate_one(criterion: &Criterion, kpis: &KpiMap) -> EvaluationResult {
    let (result, status) = match kpis.get(&criterion.kpi_name) {
        None => {
            warn!(kpi = %criterion.kpi_name, "KPI not found in data");
            (None, Verdict::NoData)
        }
        Some(raw) => match raw.as_number() {
            Err(e) => {
                warn!(kpi = %criterion.kpi_name, error = %e, "KPI value is not numeric");
                (Some(raw.clone()), Verdict::Error)
            }
            Ok(value) => {
                let status = grade(criterion, value).unwrap_or_else(|e| {
                    warn!(kpi = %criterion.kpi_name, error = %e, "Error evaluating criterion");
                    Verdict::Error
                });
                (Some(KpiValue::Number(value)), status)
            }
        },
    };

    debug!(kpi = %criterion.kpi_name, %status, "Criterion evaluated");

    EvaluationResult {
        kpi_name: criterion.kpi_name.clone(),
        result,
        status,
        pass_value: criterion.pass_value,
        conditional_pass_value: criterion.conditional_pass_value,
        unit: criterion.unit.clone(),
    }
}
