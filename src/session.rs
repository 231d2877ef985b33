//! Session identification and discovery of extracted log files.
//!
//! A test session produces a measurement log (`..._NR_RF.csv`) and a
//! companion summary log (`..._Summary.csv`) sharing a `<digits>-<digits>`
//! identifier that is also the site's `siteid_sectorid`.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static SESSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+-\d+").expect("session id pattern is valid"));

/// Extracts the session identifier from a file name, falling back to the
/// whole name when no `<digits>-<digits>` group is present.
pub fn session_id(file_name: &str) -> String {
    SESSION_ID
        .find(file_name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Measurement,
    Companion,
}

impl LogKind {
    /// Classifies a CSV file by name. Non-CSV and unrelated files yield `None`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if !lower.ends_with(".csv") {
            return None;
        }
        if lower.contains("summary") {
            Some(LogKind::Companion)
        } else if lower.contains("nr_rf") {
            Some(LogKind::Measurement)
        } else {
            None
        }
    }
}

/// The log files belonging to one test session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub measurement: Option<PathBuf>,
    pub companion: Option<PathBuf>,
}

/// Groups the CSV logs of `dir` into sessions, ordered by identifier.
///
/// When a session has more than one log of the same kind, the first by file
/// name is kept and the others are reported.
pub fn discover_sessions(dir: &Path) -> Result<Vec<Session>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read log directory '{}'", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut sessions: BTreeMap<String, Session> = BTreeMap::new();
    for name in names {
        let Some(kind) = LogKind::from_file_name(&name) else {
            debug!(file = %name, "Ignoring unrelated file");
            continue;
        };

        let id = session_id(&name);
        let session = sessions.entry(id.clone()).or_insert_with(|| Session {
            id,
            ..Default::default()
        });

        let slot = match kind {
            LogKind::Measurement => &mut session.measurement,
            LogKind::Companion => &mut session.companion,
        };
        if slot.is_some() {
            warn!(file = %name, session = %session.id, ?kind, "Duplicate log for session, ignoring");
            continue;
        }
        *slot = Some(dir.join(&name));
    }

    Ok(sessions.into_values().collect())
}
