//! Per-session processing and concurrent batch execution.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, warn};

use crate::analyzers::grade::{EvaluationResult, evaluate};
use crate::analyzers::kpi::assemble_kpis;
use crate::analyzers::segment_log;
use crate::analyzers::types::{PhaseReport, SegmentationReport};
use crate::criteria::{CriteriaStore, SiteDirectory};
use crate::session::Session;
use crate::stats::RegistrationStats;

pub const NO_SITE_FOUND: &str = "No site found in database";

/// One entry of a session's evaluation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationEntry {
    Verdict(EvaluationResult),
    /// Replaces the whole list when the session could not be evaluated.
    Diagnostic { error: String },
}

/// Everything produced for one test session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub processed_at: DateTime<Utc>,
    pub summary_results: Option<RegistrationStats>,
    pub dl_test_results: Option<PhaseReport>,
    pub ul_test_results: Option<PhaseReport>,
    pub ookla_test_results: Option<PhaseReport>,
    pub evaluation_results: Vec<EvaluationEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SessionRecord {
    pub fn new(session_id: &str) -> Self {
        SessionRecord {
            session_id: session_id.to_string(),
            processed_at: Utc::now(),
            summary_results: None,
            dl_test_results: None,
            ul_test_results: None,
            ookla_test_results: None,
            evaluation_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A record for a session that failed before any log was processed.
    pub fn failed(session_id: &str, message: impl Into<String>) -> Self {
        let mut record = Self::new(session_id);
        record.errors.push(message.into());
        record
    }

    /// Verdicts only, skipping diagnostic entries.
    pub fn verdicts(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.evaluation_results.iter().filter_map(|e| match e {
            EvaluationEntry::Verdict(v) => Some(v),
            EvaluationEntry::Diagnostic { .. } => None,
        })
    }
}

/// Fully materialized log text of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionInput {
    pub session_id: String,
    pub measurement: Option<String>,
    pub companion: Option<String>,
}

/// Runs segmentation, counting and evaluation for one session.
///
/// A rejected measurement log leaves the test results and evaluation empty
/// and records the reason; the companion summary is still reported.
#[tracing::instrument(skip_all, fields(session = %input.session_id))]
pub fn process_session(
    input: &SessionInput,
    sites: &dyn SiteDirectory,
    criteria: &dyn CriteriaStore,
) -> SessionRecord {
    let mut record = SessionRecord::new(&input.session_id);

    if let Some(text) = &input.companion {
        match RegistrationStats::from_log(text) {
            Ok(stats) => record.summary_results = Some(stats),
            Err(e) => {
                error!(error = %e, "Companion log rejected");
                record.errors.push(format!("summary log: {e}"));
            }
        }
    }

    let tests: Option<SegmentationReport> = match &input.measurement {
        Some(text) => match segment_log(text) {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Measurement log rejected");
                record.errors.push(format!("measurement log: {e}"));
                None
            }
        },
        None => None,
    };

    if let Some(tests) = tests {
        record.evaluation_results = evaluate_session(
            &input.session_id,
            &tests,
            record.summary_results.as_ref(),
            sites,
            criteria,
        );
        record.dl_test_results = Some(tests.download);
        record.ul_test_results = Some(tests.upload);
        record.ookla_test_results = Some(tests.speed_test);
    }

    info!(
        verdicts = record.verdicts().count(),
        errors = record.errors.len(),
        "Session processed"
    );
    record
}

/// Resolves the session's site and criteria and scores the KPIs.
pub fn evaluate_session(
    session_id: &str,
    tests: &SegmentationReport,
    summary: Option<&RegistrationStats>,
    sites: &dyn SiteDirectory,
    criteria: &dyn CriteriaStore,
) -> Vec<EvaluationEntry> {
    let Some(site) = sites.site_for(session_id) else {
        warn!(session = session_id, "No site found");
        return vec![EvaluationEntry::Diagnostic {
            error: NO_SITE_FOUND.to_string(),
        }];
    };

    let criteria_list = criteria.criteria_for(&site.criteria, &site.criteria_value);
    let kpis = assemble_kpis(Some(tests), summary);

    evaluate(&criteria_list, &kpis)
        .into_iter()
        .map(EvaluationEntry::Verdict)
        .collect()
}

async fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    match path {
        Some(p) => {
            let text = tokio::fs::read_to_string(p)
                .await
                .with_context(|| format!("failed to read '{}'", p.display()))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

async fn load_session(session: &Session) -> anyhow::Result<SessionInput> {
    Ok(SessionInput {
        session_id: session.id.clone(),
        measurement: read_optional(session.measurement.as_deref()).await?,
        companion: read_optional(session.companion.as_deref()).await?,
    })
}

/// Processes sessions concurrently, at most `concurrency` at a time.
///
/// Each session's CPU work runs on the blocking pool. Failures, including
/// panics, become error records and never abort the batch. Records are
/// returned ordered by session identifier.
pub async fn process_batch(
    sessions: Vec<Session>,
    sites: Arc<dyn SiteDirectory>,
    criteria: Arc<dyn CriteriaStore>,
    concurrency: usize,
) -> Vec<SessionRecord> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(sessions.len());

    info!(sessions = sessions.len(), concurrency, "Starting batch");

    for session in sessions {
        let sem = semaphore.clone();
        let sites = sites.clone();
        let criteria = criteria.clone();
        let id = session.id.clone();
        let span = tracing::info_span!("process_session_task", session = %session.id);

        let task = tokio::spawn(
            async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return SessionRecord::failed(&session.id, e.to_string()),
                };

                let input = match load_session(&session).await {
                    Ok(input) => input,
                    Err(e) => {
                        error!(error = %e, "Failed to load session logs");
                        return SessionRecord::failed(&session.id, format!("{e:#}"));
                    }
                };

                let id = session.id.clone();
                tokio::task::spawn_blocking(move || {
                    process_session(&input, sites.as_ref(), criteria.as_ref())
                })
                .await
                .unwrap_or_else(|e| {
                    error!(error = %e, "Session processing panicked");
                    SessionRecord::failed(&id, e.to_string())
                })
            }
            .instrument(span),
        );

        tasks.push((id, task));
    }

    let mut records = Vec::with_capacity(tasks.len());
    for (id, task) in tasks {
        match task.await {
            Ok(record) => records.push(record),
            Err(e) => {
                error!(session = %id, error = %e, "Session task failed");
                records.push(SessionRecord::failed(&id, e.to_string()));
            }
        }
    }

    records.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    info!(records = records.len(), "Batch complete");
    records
}
