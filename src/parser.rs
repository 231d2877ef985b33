//! CSV parsers for the two drive-test log types.
//!
//! The measurement log (`*_NR_RF.csv`) carries one row per second of radio
//! samples plus a `Call Event` column that may pack several `;`-separated
//! tags. The companion log (`*_Summary.csv`) carries NAS registration events
//! and ping statistics.

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::error::LogError;

/// Column holding the raw, possibly multi-tag event string.
pub const EVENT_COLUMN: &str = "Call Event";

const DATE_COLUMN: &str = "Date";
const TIME_COLUMN: &str = "Time";
const LATITUDE_COLUMN: &str = "Latitude";
const LONGITUDE_COLUMN: &str = "Longitude";

/// Radio KPI columns read from the measurement log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KpiField {
    Band,
    Pci,
    Arfcn,
    Rsrp,
    Sinr,
    Cqi,
    Ri,
    DlMcs,
    DlLayers,
    DlRbs,
    PdschTput,
    PuschTput,
    UlMcs,
    DlModulation,
    UlModulation,
}

const KPI_FIELD_COUNT: usize = 15;

impl KpiField {
    pub const ALL: [KpiField; KPI_FIELD_COUNT] = [
        KpiField::Band,
        KpiField::Pci,
        KpiField::Arfcn,
        KpiField::Rsrp,
        KpiField::Sinr,
        KpiField::Cqi,
        KpiField::Ri,
        KpiField::DlMcs,
        KpiField::DlLayers,
        KpiField::DlRbs,
        KpiField::PdschTput,
        KpiField::PuschTput,
        KpiField::UlMcs,
        KpiField::DlModulation,
        KpiField::UlModulation,
    ];

    /// Header text of the column in the measurement log.
    pub fn header(self) -> &'static str {
        match self {
            KpiField::Band => "NR_PCell_Band",
            KpiField::Pci => "NR_PCell_PCI",
            KpiField::Arfcn => "NR_PCell_NR_ARFCN",
            KpiField::Rsrp => "NR_PCell_SS-RSRP",
            KpiField::Sinr => "NR_PCell_SS-SINR",
            KpiField::Cqi => "NR_PCell_WB CQI",
            KpiField::Ri => "NR_PCell_RI",
            KpiField::DlMcs => "NR_PCell_DL MCS(Avg)",
            KpiField::DlLayers => "NR_PCell_DL Num Layers",
            KpiField::DlRbs => "NR_PCell_DL Num RBs",
            KpiField::PdschTput => "NR_Total_PDSCH Tput(Mbps)",
            KpiField::PuschTput => "NR_Total_PUSCH Tput(Mbps)",
            KpiField::UlMcs => "NR_PCell_UL MCS(Avg)",
            KpiField::DlModulation => "NR_PCell_DL Modulation",
            KpiField::UlModulation => "NR_PCell_UL Modulation",
        }
    }

    /// Whether the column is folded into the per-phase `Avg_*` entries.
    ///
    /// Band and PCI are identifiers and the two modulation columns are
    /// categorical, so everything from ARFCN onward except those is averaged.
    pub fn is_averaged(self) -> bool {
        !matches!(
            self,
            KpiField::Band | KpiField::Pci | KpiField::DlModulation | KpiField::UlModulation
        )
    }
}

/// One timestamped sample of the measurement log.
#[derive(Debug, Clone, Default)]
pub struct MeasurementRow {
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub event: String,
    values: [Option<String>; KPI_FIELD_COUNT],
}

impl MeasurementRow {
    pub fn new(event: impl Into<String>) -> Self {
        MeasurementRow {
            event: event.into(),
            ..Default::default()
        }
    }

    /// Sets a KPI column value. Mostly useful for building rows in tests.
    pub fn with_value(mut self, field: KpiField, value: impl Into<String>) -> Self {
        self.values[field as usize] = Some(value.into());
        self
    }

    /// Trimmed, non-empty value of a KPI column.
    pub fn value(&self, field: KpiField) -> Option<&str> {
        self.values[field as usize]
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Numeric value of a KPI column; `None` when absent or not a number.
    pub fn number(&self, field: KpiField) -> Option<f64> {
        self.value(field)?.parse().ok()
    }
}

/// A fully materialized measurement log.
#[derive(Debug, Clone, Default)]
pub struct MeasurementLog {
    pub rows: Vec<MeasurementRow>,
    /// KPI columns present in the header, in [`KpiField::ALL`] order.
    pub columns: Vec<KpiField>,
}

/// Parses measurement log text.
///
/// # Errors
///
/// Returns [`LogError::MissingColumn`] when the `Call Event` column is absent,
/// or [`LogError::Csv`] on malformed CSV.
pub fn parse_measurement_log(text: &str) -> Result<MeasurementLog, LogError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let event_idx =
        position(EVENT_COLUMN).ok_or_else(|| LogError::MissingColumn(EVENT_COLUMN.to_string()))?;
    let date_idx = position(DATE_COLUMN);
    let time_idx = position(TIME_COLUMN);
    let lat_idx = position(LATITUDE_COLUMN);
    let lon_idx = position(LONGITUDE_COLUMN);

    let kpi_idx: Vec<(KpiField, usize)> = KpiField::ALL
        .iter()
        .filter_map(|&f| position(f.header()).map(|i| (f, i)))
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };

        let mut row = MeasurementRow {
            date: cell(date_idx),
            time: cell(time_idx),
            latitude: cell(lat_idx),
            longitude: cell(lon_idx),
            event: cell(Some(event_idx)),
            ..Default::default()
        };
        for &(field, idx) in &kpi_idx {
            row.values[field as usize] = record.get(idx).map(str::to_string);
        }
        rows.push(row);
    }

    debug!(rows = rows.len(), kpi_columns = kpi_idx.len(), "Measurement log parsed");

    Ok(MeasurementLog {
        rows,
        columns: kpi_idx.into_iter().map(|(f, _)| f).collect(),
    })
}

/// One row of the companion registration/latency log.
///
/// Every column is optional; absent or empty cells deserialize to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanionRow {
    #[serde(rename = "NAS", default)]
    pub nas: Option<String>,
    #[serde(rename = "Max", default)]
    pub max: Option<String>,
    #[serde(rename = "Min", default)]
    pub min: Option<String>,
    #[serde(rename = "Avg", default)]
    pub avg: Option<String>,
    #[serde(rename = "Total", default)]
    pub total: Option<String>,
    #[serde(rename = "Success", default)]
    pub success: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

/// Parses companion log text into rows.
pub fn parse_companion_log(text: &str) -> Result<Vec<CompanionRow>, LogError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: CompanionRow = result?;
        rows.push(row);
    }

    debug!(rows = rows.len(), "Companion log parsed");
    Ok(rows)
}
