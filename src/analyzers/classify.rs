use crate::analyzers::events::LogicalEvent;
use crate::analyzers::types::PhaseKind;

/// Substrings that flag a diagnostic tag inside a phase. Matched case-sensitively.
static FAILURE_WORDS: &[&str] = &["unable", "fail", "busy", "error"];

/// Assigns the textual result of a phase.
///
/// Returns an empty string when the phase was never both opened and closed,
/// `"Success"` when the phase's success marker appears anywhere in the range,
/// otherwise the first diagnostic tag in the range, otherwise `"Failure"`.
pub fn classify_result(
    kind: PhaseKind,
    range: Option<(usize, usize)>,
    events: &[LogicalEvent<'_>],
) -> String {
    let Some((start, end)) = range else {
        return String::new();
    };

    let span = events
        .get(start..=end.min(events.len().saturating_sub(1)))
        .unwrap_or_default();

    if span.iter().any(|e| e.tag.contains(kind.success_marker())) {
        return "Success".into();
    }

    span.iter()
        .find(|e| FAILURE_WORDS.iter().any(|w| e.tag.contains(w)))
        .map(|e| e.tag.to_string())
        .unwrap_or_else(|| "Failure".into())
}
