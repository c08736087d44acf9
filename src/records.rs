//! Raw measurement rows as handed over by a data source.
//!
//! Rows stay column-keyed so the engine can check a level's required columns
//! against what the source actually delivered.

use std::collections::HashMap;

/// Column holding the plant name, when the source provides one.
pub const PLANT_FIELD: &str = "Plant";
/// Combined date+time column.
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Hour-resolution fallback column (`YYYY-MM-DD HH`).
pub const DAY_HOUR_FIELD: &str = "Day_Hour";

/// One sampled reading, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementRecord {
    fields: HashMap<String, String>,
}

impl MeasurementRecord {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Returns the trimmed value of `field`, treating blanks as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The raw timestamp text: `timestamp` when present, else `Day_Hour`.
    pub fn raw_timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP_FIELD)
            .or_else(|| self.get(DAY_HOUR_FIELD))
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }
}

impl<K, V> FromIterator<(K, V)> for MeasurementRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A collection of records for one level together with the schema they came with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementBatch {
    columns: Vec<String>,
    records: Vec<MeasurementRecord>,
}

impl MeasurementBatch {
    pub fn new(columns: Vec<String>, records: Vec<MeasurementRecord>) -> Self {
        Self { columns, records }
    }

    /// Builds a batch whose schema is the union of the records' columns,
    /// in order of first appearance.
    pub fn from_records(records: Vec<MeasurementRecord>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            let mut keys: Vec<&String> = record.fields.keys().collect();
            keys.sort();
            for key in keys {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fills `field` with `value` on every record lacking it and registers the column.
    pub fn with_default_column(mut self, field: &str, value: &str) -> Self {
        for record in &mut self.records {
            if record.get(field).is_none() {
                record.set(field, value);
            }
        }
        if !self.has_column(field) {
            self.columns.push(field.to_string());
        }
        self
    }

    /// Keeps only the records for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&MeasurementRecord) -> bool) {
        self.records.retain(keep);
    }
}
