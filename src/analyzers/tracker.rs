//! Phase state machine over the logical event stream.

use tracing::debug;

use crate::analyzers::aggregate::PhaseAccumulator;
use crate::analyzers::events::LogicalEvent;
use crate::analyzers::types::{PhaseKind, StartContext};
use crate::parser::KpiField;

const DL_START: &str = "Iperf - UDP DL Start";
const UL_START: &str = "Iperf - UDP UL Start";
const SPEEDTEST_START: &str = "Speedtest - Session Start";
const IPERF_COMPLETE: &str = "Iperf - Complete";
const SPEEDTEST_COMPLETE: &str = "Speedtest - Complete";

/// At most one phase is open at any point of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    DownloadOpen,
    UploadOpen,
    SpeedTestOpen,
}

impl TrackerState {
    pub fn open_phase(self) -> Option<PhaseKind> {
        match self {
            TrackerState::Idle => None,
            TrackerState::DownloadOpen => Some(PhaseKind::Download),
            TrackerState::UploadOpen => Some(PhaseKind::Upload),
            TrackerState::SpeedTestOpen => Some(PhaseKind::SpeedTest),
        }
    }

    fn opened(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Download => TrackerState::DownloadOpen,
            PhaseKind::Upload => TrackerState::UploadOpen,
            PhaseKind::SpeedTest => TrackerState::SpeedTestOpen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Start(PhaseKind),
    IperfComplete,
    SpeedTestComplete,
}

/// Recognizes a transition marker. Checks run in priority order, so a tag
/// matching several markers resolves to the first.
fn marker(tag: &str) -> Option<Marker> {
    if tag.contains(DL_START) {
        Some(Marker::Start(PhaseKind::Download))
    } else if tag.contains(UL_START) {
        Some(Marker::Start(PhaseKind::Upload))
    } else if tag.contains(SPEEDTEST_START) {
        Some(Marker::Start(PhaseKind::SpeedTest))
    } else if tag.contains(IPERF_COMPLETE) {
        Some(Marker::IperfComplete)
    } else if tag.contains(SPEEDTEST_COMPLETE) {
        Some(Marker::SpeedTestComplete)
    } else {
        None
    }
}

/// Span of one phase within the event arena plus its running statistics.
#[derive(Debug, Clone)]
pub struct PhaseWindow {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub start_context: StartContext,
    pub(crate) acc: PhaseAccumulator,
}

impl PhaseWindow {
    fn new(kind: PhaseKind, columns: &[KpiField]) -> Self {
        PhaseWindow {
            start: None,
            end: None,
            start_context: StartContext::default(),
            acc: PhaseAccumulator::new(kind, columns),
        }
    }

    pub fn kind(&self) -> PhaseKind {
        self.acc.kind()
    }

    /// `(start, end)` when the phase was both opened and completed.
    pub fn closed_range(&self) -> Option<(usize, usize)> {
        self.start.zip(self.end)
    }
}

/// Drives phase transitions and routes events into the open phase's
/// accumulator.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    state: TrackerState,
    columns: Vec<KpiField>,
    download: PhaseWindow,
    upload: PhaseWindow,
    speed_test: PhaseWindow,
}

impl PhaseTracker {
    pub fn new(columns: &[KpiField]) -> Self {
        PhaseTracker {
            state: TrackerState::Idle,
            columns: columns.to_vec(),
            download: PhaseWindow::new(PhaseKind::Download, columns),
            upload: PhaseWindow::new(PhaseKind::Upload, columns),
            speed_test: PhaseWindow::new(PhaseKind::SpeedTest, columns),
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn window(&self, kind: PhaseKind) -> &PhaseWindow {
        match kind {
            PhaseKind::Download => &self.download,
            PhaseKind::Upload => &self.upload,
            PhaseKind::SpeedTest => &self.speed_test,
        }
    }

    fn window_mut(&mut self, kind: PhaseKind) -> &mut PhaseWindow {
        match kind {
            PhaseKind::Download => &mut self.download,
            PhaseKind::Upload => &mut self.upload,
            PhaseKind::SpeedTest => &mut self.speed_test,
        }
    }

    /// Processes the event at arena position `index`.
    pub fn observe(&mut self, index: usize, event: &LogicalEvent<'_>) {
        match marker(event.tag) {
            Some(Marker::Start(kind)) => {
                if let Some(previous) = self.state.open_phase() {
                    debug!(?previous, index, "Phase abandoned without completion");
                }

                // A repeated start of the same phase replaces the earlier attempt.
                let mut window = PhaseWindow::new(kind, &self.columns);
                window.start = Some(index);
                window.start_context = StartContext::from_row(event.row);
                *self.window_mut(kind) = window;

                self.state = TrackerState::opened(kind);
                debug!(?kind, index, row = event.row_index, "Phase opened");
                self.fold(event);
            }
            Some(Marker::IperfComplete) => {
                if matches!(
                    self.state,
                    TrackerState::DownloadOpen | TrackerState::UploadOpen
                ) {
                    self.close(index);
                }
                self.state = TrackerState::Idle;
            }
            Some(Marker::SpeedTestComplete) => {
                if self.state == TrackerState::SpeedTestOpen {
                    self.close(index);
                } else {
                    debug!(index, state = ?self.state, "Speed test completion outside an open speed test");
                }
                self.state = TrackerState::Idle;
            }
            None => self.fold(event),
        }
    }

    fn fold(&mut self, event: &LogicalEvent<'_>) {
        if let Some(kind) = self.state.open_phase() {
            self.window_mut(kind).acc.fold(event.row);
        }
    }

    /// Records the end index. The completion event itself is not folded.
    fn close(&mut self, index: usize) {
        if let Some(kind) = self.state.open_phase() {
            let window = self.window_mut(kind);
            if window.end.is_none() {
                window.end = Some(index);
                debug!(?kind, index, folded = window.acc.folded, "Phase closed");
            }
        }
    }

    /// Consumes the tracker, yielding the download, upload and speed test windows.
    pub fn into_windows(self) -> [PhaseWindow; 3] {
        [self.download, self.upload, self.speed_test]
    }
}
