//! Measurement-log segmentation and KPI evaluation.
//!
//! A log is split into logical events, walked by the phase tracker, and each
//! phase's accumulated statistics are finalized into a [`SegmentationReport`].
//! The summaries are then flattened into a KPI map and scored against the
//! site's criteria by [`grade::evaluate`].

pub mod aggregate;
pub mod classify;
pub mod events;
pub mod grade;
pub mod kpi;
pub mod tracker;
pub mod types;
pub mod utility;

use tracing::debug;

use crate::analyzers::classify::classify_result;
use crate::analyzers::events::{LogicalEvent, split_events};
use crate::analyzers::tracker::{PhaseTracker, PhaseWindow};
use crate::analyzers::types::{PhaseReport, SegmentationReport};
use crate::error::LogError;
use crate::parser::{MeasurementLog, parse_measurement_log};

/// Segments a parsed measurement log into its download, upload and speed
/// test phases.
pub fn segment(log: &MeasurementLog) -> SegmentationReport {
    let events = split_events(&log.rows);

    let mut tracker = PhaseTracker::new(&log.columns);
    for (index, event) in events.iter().enumerate() {
        tracker.observe(index, event);
    }

    debug!(
        rows = log.rows.len(),
        events = events.len(),
        final_state = ?tracker.state(),
        "Segmentation pass complete"
    );

    let [download, upload, speed_test] = tracker.into_windows();
    SegmentationReport {
        download: finalize(download, &events),
        upload: finalize(upload, &events),
        speed_test: finalize(speed_test, &events),
    }
}

/// Parses and segments measurement log text.
///
/// # Errors
///
/// Fails when the log is rejected by the parser (missing `Call Event`
/// column or malformed CSV).
pub fn segment_log(text: &str) -> Result<SegmentationReport, LogError> {
    let log = parse_measurement_log(text)?;
    Ok(segment(&log))
}

fn finalize(window: PhaseWindow, events: &[LogicalEvent<'_>]) -> PhaseReport {
    let result = classify_result(window.kind(), window.closed_range(), events);
    window.acc.into_report(result, window.start_context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::KpiField;

    const HEADER: &str = "Date,Time,Latitude,Longitude,Call Event,NR_PCell_PCI,NR_PCell_NR_ARFCN,\
NR_Total_PDSCH Tput(Mbps),NR_Total_PUSCH Tput(Mbps),NR_PCell_DL Modulation,NR_PCell_UL Modulation";

    fn log(lines: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text.push('\n');
        text
    }

    #[test]
    fn test_abandoned_download_keeps_peak_and_empty_result() {
        let text = log(&[
            "2024-05-01,10:00:00,40.1,-74.2,Iperf - UDP DL Start,101,627264,,,,",
            "2024-05-01,10:00:01,40.1,-74.2,,101,627264,10.0,,256QAM,",
            "2024-05-01,10:00:02,40.1,-74.2,,101,627264,25.5,,256QAM,",
            "2024-05-01,10:00:03,40.1,-74.2,,202,627264,18.2,,64QAM,",
            "2024-05-01,10:00:04,40.1,-74.2,Iperf - UDP UL Start,202,627264,,3.0,,QPSK",
        ]);
        let report = segment_log(&text).unwrap();

        let dl = &report.download;
        assert_eq!(dl.dl_peak.as_deref(), Some("25.50"));
        assert_eq!(dl.result, "");
        assert_eq!(dl.start.time, "10:00:00");
        assert_eq!(dl.start.pci, "101");
        assert_eq!(dl.pci_distribution, "101: 75.00%; 202: 25.00%");
        assert_eq!(
            dl.dl_modulation_distribution.as_deref(),
            Some("256QAM: 66.67%; 64QAM: 33.33%")
        );
        assert_eq!(dl.average(KpiField::PdschTput), Some("17.90"));

        let ul = &report.upload;
        assert_eq!(ul.start.time, "10:00:04");
        assert_eq!(ul.ul_peak.as_deref(), Some("3.00"));
        assert_eq!(ul.result, "");
    }

    #[test]
    fn test_completed_phases_are_classified() {
        let text = log(&[
            "d,t1,1,2,Iperf - UDP DL Start,101,1,,,,",
            "d,t2,1,2,Iperf - UDP DL Success,101,1,50,,,",
            "d,t3,1,2,Iperf - Complete,101,1,,,,",
            "d,t4,1,2,Iperf - UDP UL Start,101,1,,,,",
            "d,t5,1,2,Iperf - unable to reach server,101,1,,,,",
            "d,t6,1,2,Iperf - Complete,101,1,,,,",
            "d,t7,1,2,Speedtest - Session Start,101,1,,,,",
            "d,t8,1,2,Speedtest - Complete,101,1,,,,",
        ]);
        let report = segment_log(&text).unwrap();

        assert_eq!(report.download.result, "Success");
        assert_eq!(report.upload.result, "Iperf - unable to reach server");
        assert_eq!(report.speed_test.result, "Failure");
    }

    #[test]
    fn test_completion_row_does_not_feed_statistics() {
        let text = log(&[
            "d,t1,1,2,Iperf - UDP DL Start,101,1,,,,",
            "d,t2,1,2,,101,1,100.0,,256QAM,",
            "d,t3,1,2,Iperf - UDP DL Success,101,1,150.0,,256QAM,",
            "d,t4,1,2,Iperf - Complete,999,1,900.0,,QPSK,",
        ]);
        let report = segment_log(&text).unwrap();

        let dl = &report.download;
        assert_eq!(dl.result, "Success");
        assert_eq!(dl.dl_peak.as_deref(), Some("150.00"));
        assert_eq!(dl.average(KpiField::PdschTput), Some("125.00"));
        assert_eq!(dl.pci_distribution, "101: 100.00%");
        assert_eq!(dl.dl_modulation_distribution.as_deref(), Some("256QAM: 100.00%"));
    }

    #[test]
    fn test_phase_never_started_is_empty() {
        let text = log(&["d,t1,1,2,Handover,101,1,99,99,QPSK,QPSK"]);
        let report = segment_log(&text).unwrap();

        for phase in [&report.download, &report.upload, &report.speed_test] {
            assert_eq!(phase.result, "");
            assert_eq!(phase.start.date, "");
            assert_eq!(phase.pci_distribution, "");
        }
        assert_eq!(report.download.dl_peak.as_deref(), Some("0.00"));
        assert_eq!(report.speed_test.ul_peak.as_deref(), Some("0.00"));
    }

    #[test]
    fn test_multi_tag_rows_count_once_per_tag() {
        let text = log(&[
            "d,t1,1,2,Iperf - UDP DL Start,101,1,,,,",
            "d,t2,1,2,Handover;Handover,202,1,,,,",
        ]);
        let report = segment_log(&text).unwrap();

        assert_eq!(report.download.pci_distribution, "202: 66.67%; 101: 33.33%");
    }

    #[test]
    fn test_missing_event_column_rejects_log() {
        let result = segment_log("Date,Time\n2024-05-01,10:00:00\n");
        assert!(matches!(result, Err(LogError::MissingColumn(_))));
    }
}
