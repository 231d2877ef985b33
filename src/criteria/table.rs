use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{info, warn};

use super::{CriteriaStore, Criterion};

/// In-memory criteria table loaded from a CSV export.
///
/// Expected header:
/// ```text
/// type,value,kpi_name,pass_condition,pass_value,conditional_pass_condition,conditional_pass_value,unit
/// ```
/// A row whose `(type, value, kpi_name)` already exists replaces the earlier
/// row in place, so the order of first insertion is kept.
#[derive(Debug, Default, Clone)]
pub struct CriteriaTable {
    entries: Vec<Criterion>,
    index: HashMap<(String, String, String), usize>,
    skipped: usize,
}

impl CriteriaTable {
    /// Loads the table from a CSV file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read criteria file '{path}'"))?;
        Self::from_csv(&content)
    }

    /// Builds the table from CSV text. Malformed rows are counted and skipped.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut table = CriteriaTable::default();
        let mut added = 0;
        let mut updated = 0;

        for (line, result) in rdr.deserialize::<Criterion>().enumerate() {
            match result {
                Ok(criterion) => {
                    if table.upsert(criterion) {
                        updated += 1;
                    } else {
                        added += 1;
                    }
                }
                Err(e) => {
                    warn!(row = line + 1, error = %e, "Skipping malformed criteria row");
                    table.skipped += 1;
                }
            }
        }

        info!(added, updated, errors = table.skipped, "Criteria table loaded");
        Ok(table)
    }

    /// Inserts or replaces a criterion. Returns `true` when it replaced one.
    pub fn upsert(&mut self, criterion: Criterion) -> bool {
        let (t, v, k) = criterion.key();
        let key = (t.to_string(), v.to_string(), k.to_string());

        match self.index.get(&key) {
            Some(&i) => {
                self.entries[i] = criterion;
                true
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(criterion);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rows rejected while loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl CriteriaStore for CriteriaTable {
    fn criteria_for(&self, criteria_type: &str, value: &str) -> Vec<Criterion> {
        self.entries
            .iter()
            .filter(|c| c.criteria_type == criteria_type && c.value == value)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "type,value,kpi_name,pass_condition,pass_value,conditional_pass_condition,conditional_pass_value,unit";

    #[test]
    fn test_from_csv_filters_by_type_and_value() {
        let text = format!(
            "{HEADER}\n\
             Market,Urban,PDSCH_Peak,>=,500,>=,300,Mbps\n\
             Market,Rural,PDSCH_Peak,>=,200,>=,100,Mbps\n\
             Market,Urban,Ping _avg,<=,30,<=,50,ms\n"
        );
        let table = CriteriaTable::from_csv(&text).unwrap();

        let urban = table.criteria_for("Market", "Urban");
        let names: Vec<_> = urban.iter().map(|c| c.kpi_name.as_str()).collect();
        assert_eq!(names, vec!["PDSCH_Peak", "Ping _avg"]);
        assert_eq!(urban[0].pass_value, 500.0);
        assert!(table.criteria_for("Market", "Suburban").is_empty());
    }

    #[test]
    fn test_duplicate_key_replaces_in_place() {
        let text = format!(
            "{HEADER}\n\
             Market,Urban,PDSCH_Peak,>=,500,>=,300,Mbps\n\
             Market,Urban,PUSCH_Peak,>=,50,>=,30,Mbps\n\
             Market,Urban,PDSCH_Peak,>=,450,>=,250,Mbps\n"
        );
        let table = CriteriaTable::from_csv(&text).unwrap();

        assert_eq!(table.len(), 2);
        let urban = table.criteria_for("Market", "Urban");
        assert_eq!(urban[0].kpi_name, "PDSCH_Peak");
        assert_eq!(urban[0].pass_value, 450.0);
        assert_eq!(urban[1].kpi_name, "PUSCH_Peak");
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let text = format!(
            "{HEADER}\n\
             Market,Urban,PDSCH_Peak,>=,lots,>=,300,Mbps\n\
             Market,Urban,PUSCH_Peak,>=,50,>=,30,Mbps\n"
        );
        let table = CriteriaTable::from_csv(&text).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped(), 1);
    }
}
