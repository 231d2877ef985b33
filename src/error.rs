//! Typed errors surfaced by the log parsers and the criteria evaluator.

use thiserror::Error;

/// Reasons a log file is rejected as a whole.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("required column '{0}' not found")]
    MissingColumn(String),

    #[error("no matching KPI columns found")]
    NoKpiColumns,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Problems evaluating a single criterion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("Unknown comparison condition: {0}")]
    UnknownComparisonOperator(String),

    #[error("could not convert '{0}' to a number")]
    NotNumeric(String),
}
