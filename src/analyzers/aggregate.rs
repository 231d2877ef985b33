use crate::analyzers::types::{PhaseKind, PhaseReport, StartContext};
use crate::analyzers::utility::mean;
use crate::parser::{KpiField, MeasurementRow};
use std::collections::{BTreeMap, HashMap};

/// Frequency counter over the distinct values of one categorical column.
///
/// Values keep their first-seen order so that ties render deterministically.
#[derive(Debug, Default, Clone)]
pub struct Distribution {
    counts: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl Distribution {
    pub fn observe(&mut self, value: &str) {
        match self.index.get(value) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(value.to_string(), self.counts.len());
                self.counts.push((value.to_string(), 1));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    /// Renders `value: pct%` entries by descending frequency, joined with `; `.
    /// An empty counter renders as an empty string.
    pub fn render(&self) -> String {
        let total = self.total();
        if total == 0 {
            return String::new();
        }

        let mut ordered: Vec<&(String, usize)> = self.counts.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));

        ordered
            .iter()
            .map(|(value, count)| {
                format!("{}: {:.2}%", value, *count as f64 / total as f64 * 100.0)
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Running statistics for one phase. Owned by the tracker while the phase is
/// open and consumed once by [`PhaseAccumulator::into_report`].
#[derive(Debug, Clone)]
pub struct PhaseAccumulator {
    kind: PhaseKind,
    pci: Distribution,
    arfcn: Distribution,
    dl_modulation: Distribution,
    ul_modulation: Distribution,
    dl_peak: f64,
    ul_peak: f64,
    series: BTreeMap<KpiField, Vec<f64>>,
    pub(crate) folded: usize,
}

impl PhaseAccumulator {
    /// Creates an empty accumulator averaging the given columns (non-averaged
    /// columns in `columns` are ignored).
    pub fn new(kind: PhaseKind, columns: &[KpiField]) -> Self {
        let series = columns
            .iter()
            .filter(|f| f.is_averaged())
            .map(|&f| (f, Vec::new()))
            .collect();

        PhaseAccumulator {
            kind,
            pci: Distribution::default(),
            arfcn: Distribution::default(),
            dl_modulation: Distribution::default(),
            ul_modulation: Distribution::default(),
            dl_peak: 0.0,
            ul_peak: 0.0,
            series,
            folded: 0,
        }
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Folds one logical event's measurement snapshot into the phase.
    pub fn fold(&mut self, row: &MeasurementRow) {
        self.folded += 1;

        if let Some(pci) = row.value(KpiField::Pci) {
            self.pci.observe(pci);
        }
        if let Some(arfcn) = row.value(KpiField::Arfcn) {
            self.arfcn.observe(arfcn);
        }

        if self.kind.tracks_downlink() {
            if let Some(m) = row.value(KpiField::DlModulation) {
                self.dl_modulation.observe(m);
            }
            if let Some(tput) = row.number(KpiField::PdschTput) {
                self.dl_peak = self.dl_peak.max(tput);
            }
        }

        if self.kind.tracks_uplink() {
            if let Some(m) = row.value(KpiField::UlModulation) {
                self.ul_modulation.observe(m);
            }
            if let Some(tput) = row.number(KpiField::PuschTput) {
                self.ul_peak = self.ul_peak.max(tput);
            }
        }

        for (field, values) in self.series.iter_mut() {
            if let Some(v) = row.number(*field) {
                values.push(v);
            }
        }
    }

    pub fn into_report(self, result: String, start: StartContext) -> PhaseReport {
        let downlink = self.kind.tracks_downlink();
        let uplink = self.kind.tracks_uplink();

        PhaseReport {
            kind: self.kind,
            result,
            start,
            dl_peak: downlink.then(|| format!("{:.2}", self.dl_peak)),
            ul_peak: uplink.then(|| format!("{:.2}", self.ul_peak)),
            pci_distribution: self.pci.render(),
            arfcn_distribution: self.arfcn.render(),
            dl_modulation_distribution: downlink.then(|| self.dl_modulation.render()),
            ul_modulation_distribution: uplink.then(|| self.ul_modulation.render()),
            averages: self
                .series
                .iter()
                .map(|(field, values)| (*field, format!("{:.2}", mean(values))))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct_sum(rendered: &str) -> f64 {
        rendered
            .split("; ")
            .map(|entry| {
                let pct = entry.rsplit(": ").next().unwrap().trim_end_matches('%');
                pct.parse::<f64>().unwrap()
            })
            .sum()
    }

    #[test]
    fn test_distribution_orders_by_frequency() {
        let mut d = Distribution::default();
        for v in ["101", "202", "202", "303", "202", "101"] {
            d.observe(v);
        }
        assert_eq!(d.render(), "202: 50.00%; 101: 33.33%; 303: 16.67%");
    }

    #[test]
    fn test_distribution_ties_keep_first_seen_order() {
        let mut d = Distribution::default();
        for v in ["QPSK", "256QAM", "64QAM", "256QAM", "QPSK"] {
            d.observe(v);
        }
        assert_eq!(d.render(), "QPSK: 40.00%; 256QAM: 40.00%; 64QAM: 20.00%");
    }

    #[test]
    fn test_distribution_percentages_sum_to_100() {
        let mut d = Distribution::default();
        for v in ["a", "b", "c", "a", "b", "a", "d"] {
            d.observe(v);
        }
        assert!((pct_sum(&d.render()) - 100.0).abs() < 0.05);
    }

    #[test]
    fn test_distribution_empty_renders_empty() {
        assert_eq!(Distribution::default().render(), "");
    }

    #[test]
    fn test_download_tracks_pdsch_only() {
        let mut acc = PhaseAccumulator::new(
            PhaseKind::Download,
            &[KpiField::PdschTput, KpiField::PuschTput],
        );
        acc.fold(
            &MeasurementRow::new("")
                .with_value(KpiField::PdschTput, "42.1")
                .with_value(KpiField::PuschTput, "9.0")
                .with_value(KpiField::DlModulation, "256QAM")
                .with_value(KpiField::UlModulation, "QPSK"),
        );

        let report = acc.into_report(String::new(), StartContext::default());
        assert_eq!(report.dl_peak.as_deref(), Some("42.10"));
        assert_eq!(report.ul_peak, None);
        assert_eq!(report.dl_modulation_distribution.as_deref(), Some("256QAM: 100.00%"));
        assert_eq!(report.ul_modulation_distribution, None);
        assert_eq!(report.average(KpiField::PuschTput), Some("9.00"));
    }

    #[test]
    fn test_speed_test_tracks_both_directions() {
        let mut acc = PhaseAccumulator::new(PhaseKind::SpeedTest, &[]);
        acc.fold(
            &MeasurementRow::new("")
                .with_value(KpiField::PdschTput, "300")
                .with_value(KpiField::PuschTput, "bad")
                .with_value(KpiField::UlModulation, "64QAM"),
        );
        acc.fold(&MeasurementRow::new("").with_value(KpiField::PuschTput, "55.5"));

        let report = acc.into_report(String::new(), StartContext::default());
        assert_eq!(report.dl_peak.as_deref(), Some("300.00"));
        assert_eq!(report.ul_peak.as_deref(), Some("55.50"));
        assert_eq!(report.ul_modulation_distribution.as_deref(), Some("64QAM: 100.00%"));
        assert_eq!(report.dl_modulation_distribution.as_deref(), Some(""));
    }

    #[test]
    fn test_non_numeric_values_are_skipped_not_zeroed() {
        let mut acc = PhaseAccumulator::new(PhaseKind::Upload, &[KpiField::Rsrp]);
        acc.fold(&MeasurementRow::new("").with_value(KpiField::Rsrp, "-80"));
        acc.fold(&MeasurementRow::new("").with_value(KpiField::Rsrp, "N/A"));
        acc.fold(&MeasurementRow::new("").with_value(KpiField::Rsrp, "-90"));

        let report = acc.into_report(String::new(), StartContext::default());
        assert_eq!(report.average(KpiField::Rsrp), Some("-85.00"));
        assert_eq!(report.ul_peak.as_deref(), Some("0.00"));
    }

    #[test]
    fn test_untouched_accumulator_reports_defaults() {
        let acc = PhaseAccumulator::new(PhaseKind::Download, &[KpiField::Pci, KpiField::Sinr]);
        let report = acc.into_report(String::new(), StartContext::default());

        assert_eq!(report.dl_peak.as_deref(), Some("0.00"));
        assert_eq!(report.pci_distribution, "");
        assert_eq!(report.averages, vec![(KpiField::Sinr, "0.00".to_string())]);
    }
}
