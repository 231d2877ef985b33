//! Record types produced by log segmentation.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::parser::{KpiField, MeasurementRow};

/// The three mutually exclusive test episodes found in a drive-test log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Download,
    Upload,
    SpeedTest,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [PhaseKind::Download, PhaseKind::Upload, PhaseKind::SpeedTest];

    /// Whether the phase tracks PDSCH peak and downlink modulation.
    pub fn tracks_downlink(self) -> bool {
        matches!(self, PhaseKind::Download | PhaseKind::SpeedTest)
    }

    /// Whether the phase tracks PUSCH peak and uplink modulation.
    pub fn tracks_uplink(self) -> bool {
        matches!(self, PhaseKind::Upload | PhaseKind::SpeedTest)
    }

    /// Tag fragment that marks a successful run of this phase.
    pub fn success_marker(self) -> &'static str {
        match self {
            PhaseKind::Download => "UDP DL Success",
            PhaseKind::Upload => "UDP UL Success",
            PhaseKind::SpeedTest => "Test Success",
        }
    }

    fn dl_peak_key(self) -> &'static str {
        match self {
            PhaseKind::SpeedTest => "Ookla_DL(Mbps)_Peak",
            _ => "PDSCH_Peak",
        }
    }

    fn ul_peak_key(self) -> &'static str {
        match self {
            PhaseKind::SpeedTest => "Ookla_UL(Mbps)_Peak",
            _ => "PUSCH_Peak",
        }
    }

    fn dl_modulation_key(self) -> &'static str {
        match self {
            PhaseKind::SpeedTest => "DL_Modulation_Distribution",
            _ => "Modulation_Distribution",
        }
    }

    fn ul_modulation_key(self) -> &'static str {
        match self {
            PhaseKind::SpeedTest => "UL_Modulation_Distribution",
            _ => "Modulation_Distribution",
        }
    }
}

/// Where and when a phase started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartContext {
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub pci: String,
    pub arfcn: String,
}

impl StartContext {
    pub fn from_row(row: &MeasurementRow) -> Self {
        StartContext {
            date: row.date.clone(),
            time: row.time.clone(),
            latitude: row.latitude.clone(),
            longitude: row.longitude.clone(),
            pci: row.value(KpiField::Pci).unwrap_or_default().to_string(),
            arfcn: row.value(KpiField::Arfcn).unwrap_or_default().to_string(),
        }
    }
}

/// Finalized statistics of one phase, with every number already formatted
/// to two decimals.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub kind: PhaseKind,
    /// `"Success"`, a failure tag, `"Failure"`, or empty when never closed.
    pub result: String,
    pub start: StartContext,
    pub dl_peak: Option<String>,
    pub ul_peak: Option<String>,
    pub pci_distribution: String,
    pub arfcn_distribution: String,
    pub dl_modulation_distribution: Option<String>,
    pub ul_modulation_distribution: Option<String>,
    pub averages: Vec<(KpiField, String)>,
}

impl PhaseReport {
    /// Formatted average of a column, if that column was present in the log.
    pub fn average(&self, field: KpiField) -> Option<&str> {
        self.averages
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }
}

impl Serialize for PhaseReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Result", &self.result)?;
        map.serialize_entry("Start_Date", &self.start.date)?;
        map.serialize_entry("Start_Time", &self.start.time)?;
        map.serialize_entry("Start_Latitude", &self.start.latitude)?;
        map.serialize_entry("Start_Longitude", &self.start.longitude)?;
        map.serialize_entry("Start_PCI", &self.start.pci)?;
        map.serialize_entry("Start_ARFCN", &self.start.arfcn)?;

        if let Some(peak) = &self.dl_peak {
            map.serialize_entry(self.kind.dl_peak_key(), peak)?;
        }
        if let Some(peak) = &self.ul_peak {
            map.serialize_entry(self.kind.ul_peak_key(), peak)?;
        }

        map.serialize_entry("PCI_Distribution", &self.pci_distribution)?;
        map.serialize_entry("ARFCN_Distribution", &self.arfcn_distribution)?;
        if let Some(dist) = &self.dl_modulation_distribution {
            map.serialize_entry(self.kind.dl_modulation_key(), dist)?;
        }
        if let Some(dist) = &self.ul_modulation_distribution {
            map.serialize_entry(self.kind.ul_modulation_key(), dist)?;
        }

        for (field, avg) in &self.averages {
            map.serialize_entry(&format!("Avg_{}", field.header()), avg)?;
        }
        map.end()
    }
}

/// Segmentation output for one measurement log.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SegmentationReport {
    #[serde(rename = "DL_Test")]
    pub download: PhaseReport,
    #[serde(rename = "UL_Test")]
    pub upload: PhaseReport,
    #[serde(rename = "Ookla_Test")]
    pub speed_test: PhaseReport,
}

impl SegmentationReport {
    pub fn phase(&self, kind: PhaseKind) -> &PhaseReport {
        match kind {
            PhaseKind::Download => &self.download,
            PhaseKind::Upload => &self.upload,
            PhaseKind::SpeedTest => &self.speed_test,
        }
    }
}
