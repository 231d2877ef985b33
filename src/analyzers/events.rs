use crate::parser::MeasurementRow;

/// One event tag paired with the measurement snapshot it was logged with.
#[derive(Debug, Clone, Copy)]
pub struct LogicalEvent<'a> {
    pub tag: &'a str,
    pub row: &'a MeasurementRow,
    pub row_index: usize,
    /// Number of tags packed into the originating row.
    pub co_tags: usize,
}

/// Splits every row's `;`-packed event field into independent events.
///
/// Tags are trimmed but never collapsed: `"A;B;B"` yields three events, and an
/// empty event field yields a single empty one. Row order and within-row tag
/// order are preserved.
pub fn split_events(rows: &[MeasurementRow]) -> Vec<LogicalEvent<'_>> {
    let mut events = Vec::with_capacity(rows.len());

    for (row_index, row) in rows.iter().enumerate() {
        let co_tags = row.event.split(';').count();
        events.extend(row.event.split(';').map(|tag| LogicalEvent {
            tag: tag.trim(),
            row,
            row_index,
            co_tags,
        }));
    }

    events
}
