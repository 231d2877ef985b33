use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{info, warn};

use super::{Site, SiteDirectory};

/// Site records keyed by `siteid_sectorid`, loaded from a CSV export.
///
/// Later rows for the same site replace earlier ones.
#[derive(Debug, Default, Clone)]
pub struct SiteTable {
    entries: HashMap<String, Site>,
}

impl SiteTable {
    /// Loads the table from a CSV file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read site file '{path}'"))?;
        Self::from_csv(&content)
    }

    /// Builds the table from CSV text. Malformed rows are logged and skipped.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut entries = HashMap::new();
        let mut errors = 0;

        for (line, result) in rdr.deserialize::<Site>().enumerate() {
            match result {
                Ok(site) => {
                    entries.insert(site.siteid_sectorid.clone(), site);
                }
                Err(e) => {
                    warn!(row = line + 1, error = %e, "Skipping malformed site row");
                    errors += 1;
                }
            }
        }

        info!(sites = entries.len(), errors, "Site table loaded");
        Ok(Self { entries })
    }

    pub fn insert(&mut self, site: Site) {
        self.entries.insert(site.siteid_sectorid.clone(), site);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SiteDirectory for SiteTable {
    fn site_for(&self, site_id: &str) -> Option<&Site> {
        self.entries.get(site_id)
    }
}
