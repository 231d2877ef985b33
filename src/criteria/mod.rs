//! Site and criteria lookup.
//!
//! [`CriteriaStore`] resolves the ordered criteria for a site category and
//! [`SiteDirectory`] resolves a session identifier to its site record.
//! [`CriteriaTable`] and [`SiteTable`] implement both from CSV exports.

mod sites;
mod table;

pub use sites::SiteTable;
pub use table::CriteriaTable;

use serde::{Deserialize, Serialize};

/// A pass / conditional-pass threshold rule for one KPI within a site category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(rename = "type")]
    pub criteria_type: String,
    pub value: String,
    pub kpi_name: String,
    pub pass_condition: String,
    pub pass_value: f64,
    pub conditional_pass_condition: String,
    pub conditional_pass_value: f64,
    pub unit: String,
}

impl Criterion {
    /// Uniqueness key within a criteria table.
    pub fn key(&self) -> (&str, &str, &str) {
        (
            self.criteria_type.as_str(),
            self.value.as_str(),
            self.kpi_name.as_str(),
        )
    }
}

/// A surveyed site; `criteria` and `criteria_value` select its criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub siteid_sectorid: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub criteria: String,
    pub criteria_value: String,
}

/// Read-only source of criteria, ordered as the store defines them.
pub trait CriteriaStore: Send + Sync {
    fn criteria_for(&self, criteria_type: &str, value: &str) -> Vec<Criterion>;
}

/// Read-only source of site records keyed by `siteid_sectorid`.
pub trait SiteDirectory: Send + Sync {
    fn site_for(&self, site_id: &str) -> Option<&Site>;
}
