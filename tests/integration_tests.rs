use nr_drive_rater::analyzers::grade::Verdict;
use nr_drive_rater::analyzers::segment_log;
use nr_drive_rater::criteria::{CriteriaStore, CriteriaTable, SiteTable};
use nr_drive_rater::parser::KpiField;
use nr_drive_rater::pipeline::{EvaluationEntry, NO_SITE_FOUND, process_batch};
use nr_drive_rater::session::discover_sessions;
use nr_drive_rater::stats::RegistrationStats;
use nr_drive_rater::timeseries::extract_timeseries;
use std::path::Path;
use std::sync::Arc;

const MEASUREMENT: &str = include_str!("fixtures/logs/Drive_100-1_NR_RF.csv");
const COMPANION: &str = include_str!("fixtures/logs/Drive_100-1_Summary.csv");

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn test_segment_fixture_log() {
    let report = segment_log(MEASUREMENT).expect("Failed to segment log");

    let dl = &report.download;
    assert_eq!(dl.result, "Success");
    assert_eq!(dl.start.time, "10:00:00");
    assert_eq!(dl.start.pci, "101");
    assert_eq!(dl.dl_peak.as_deref(), Some("150.00"));
    // the success tag on the closing row is folded, the completion tag is not
    assert_eq!(dl.pci_distribution, "101: 75.00%; 102: 25.00%");
    assert_eq!(
        dl.dl_modulation_distribution.as_deref(),
        Some("256QAM: 66.67%; 64QAM: 33.33%")
    );
    assert_eq!(dl.average(KpiField::PdschTput), Some("100.00"));

    let ul = &report.upload;
    assert_eq!(ul.result, "Iperf - UDP UL failed");
    assert_eq!(ul.ul_peak.as_deref(), Some("20.00"));
    assert!(ul.dl_peak.is_none());

    let ookla = &report.speed_test;
    assert_eq!(ookla.result, "Success");
    assert_eq!(ookla.dl_peak.as_deref(), Some("300.00"));
    assert_eq!(ookla.ul_peak.as_deref(), Some("40.00"));
    assert_eq!(ookla.arfcn_distribution, "650032: 100.00%");
}

#[test]
fn test_segmentation_json_keys() {
    let report = segment_log(MEASUREMENT).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["DL_Test"]["PDSCH_Peak"], "150.00");
    assert_eq!(json["DL_Test"]["Start_Latitude"], "40.7128");
    assert_eq!(json["UL_Test"]["PUSCH_Peak"], "20.00");
    assert_eq!(json["Ookla_Test"]["Ookla_DL(Mbps)_Peak"], "300.00");
    assert_eq!(json["Ookla_Test"]["UL_Modulation_Distribution"], "64QAM: 100.00%");
    assert_eq!(json["DL_Test"]["Avg_NR_Total_PDSCH Tput(Mbps)"], "100.00");
    assert!(json["DL_Test"].get("PUSCH_Peak").is_none());
}

#[test]
fn test_timeseries_fixture_log() {
    let series = extract_timeseries(MEASUREMENT).expect("Failed to extract time series");

    let names: Vec<_> = series.data.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "NR_PCell_PCI",
            "NR_PCell_SS-RSRP",
            "NR_PCell_SS-SINR",
            "NR_PCell_DL Modulation"
        ]
    );
    // modulation is blank on marker-only rows
    assert_eq!(series.data[0].x.len(), 11);
    assert_eq!(series.data[3].x.len(), 4);

    let range = series.time_range.unwrap();
    assert_eq!(range.start, "10:00:00.000000");
    assert_eq!(range.end, "10:02:02.000000");
}

#[test]
fn test_summary_fixture_log() {
    let stats = RegistrationStats::from_log(COMPANION).expect("Failed to parse summary");

    assert_eq!(stats.attach_request_count, 1.0);
    assert_eq!(stats.attach_complete_count, 1);
    assert_eq!(stats.attach_success_rate(), 100.0);
    assert_eq!(stats.ping_max, "40.00");
    assert_eq!(stats.ping_min, "10.50");
    assert_eq!(stats.ping_avg, "25.00");
    assert_eq!(stats.ping_attempt_count, 15);
    assert_eq!(stats.ping_success_count, 14);
    assert_eq!(stats.ping_error_count, 1);
}

#[test]
fn test_fixture_tables_load() {
    let sites = SiteTable::load(&fixture("sites.csv")).unwrap();
    let criteria = CriteriaTable::load(&fixture("criteria.csv")).unwrap();

    assert_eq!(sites.len(), 3);
    assert_eq!(criteria.len(), 8);
    assert_eq!(criteria.criteria_for("Market", "Urban").len(), 7);
    assert_eq!(criteria.criteria_for("Market", "Rural").len(), 1);
}

#[tokio::test]
async fn test_full_pipeline() {
    let sites = SiteTable::load(&fixture("sites.csv")).unwrap();
    let criteria = CriteriaTable::load(&fixture("criteria.csv")).unwrap();
    let sessions = discover_sessions(Path::new(&fixture("logs"))).unwrap();
    assert_eq!(sessions.len(), 3);

    let records = process_batch(sessions, Arc::new(sites), Arc::new(criteria), 2).await;
    let ids: Vec<_> = records.iter().map(|r| r.session_id.as_str()).collect();
    assert_eq!(ids, vec!["100-1", "200-2", "300-3"]);

    // full session with a site
    let full = &records[0];
    assert!(full.errors.is_empty());
    let statuses: Vec<_> = full
        .verdicts()
        .map(|v| (v.kpi_name.as_str(), v.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("PDSCH_Peak", Verdict::ConditionalPass),
            ("PUSCH_Peak", Verdict::Pass),
            ("Ookla_DL(Mbps)", Verdict::Pass),
            ("Ping _avg", Verdict::ConditionalPass),
            ("Attach_Successrate", Verdict::Pass),
            ("PDSCH_Avg", Verdict::Pass),
            ("RSRP_Avg", Verdict::NoData),
        ]
    );

    // no site binding
    let unbound = &records[1];
    assert_eq!(
        unbound.evaluation_results,
        vec![EvaluationEntry::Diagnostic {
            error: NO_SITE_FOUND.to_string()
        }]
    );
    let dl = unbound.dl_test_results.as_ref().unwrap();
    assert_eq!(dl.result, "");
    assert_eq!(dl.dl_peak.as_deref(), Some("30.00"));
    assert!(unbound.summary_results.is_none());

    // measurement log without a Call Event column
    let rejected = &records[2];
    assert_eq!(rejected.errors.len(), 1);
    assert!(rejected.dl_test_results.is_none());
    assert!(rejected.evaluation_results.is_empty());
    assert_eq!(
        rejected.summary_results.as_ref().map(|s| s.ping_avg.as_str()),
        Some("14.00")
    );
}
