//! Data-fetch side of the tool: where measurement batches come from.
//!
//! [`MeasurementSource`] is the seam the batch runner talks to;
//! [`DirectorySource`] serves plant folders of CSV / JSON-lines files.

mod directory;
pub mod json;
mod selection;

pub use directory::DirectorySource;
pub use selection::Selection;

use anyhow::Result;
use chrono::NaiveDate;

use crate::analyzers::schema::{LevelSchema, SERIAL_FIELD, STRING_ID_FIELD};
use crate::analyzers::types::Level;
use crate::parser::parse_timestamp;
use crate::records::{MeasurementBatch, MeasurementRecord};

/// Provider of per-plant measurement batches.
#[async_trait::async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Identifiers of every plant the source can serve, sorted.
    async fn list_plants(&self) -> Result<Vec<String>>;

    /// Records of `plant` at the query's level, already narrowed by the query.
    /// A plant without data yields an empty batch.
    async fn fetch(&self, plant: &str, query: &FetchQuery) -> Result<MeasurementBatch>;
}

/// What to fetch for each plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub level: Level,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub inverters: Selection,
    pub mppts: Selection,
    pub strings: Selection,
}

impl FetchQuery {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            start_date: None,
            end_date: None,
            inverters: Selection::All,
            mppts: Selection::All,
            strings: Selection::All,
        }
    }

    /// Whether `record` falls inside the date range and entity selections.
    ///
    /// Rows whose timestamp does not parse are kept; the engine drops and
    /// reports them.
    pub fn keep(&self, record: &MeasurementRecord) -> bool {
        if let Some(date) = record
            .raw_timestamp()
            .and_then(parse_timestamp)
            .map(|ts| ts.date())
        {
            if self.start_date.is_some_and(|start| date < start)
                || self.end_date.is_some_and(|end| date > end)
            {
                return false;
            }
        }

        if self.level == Level::Plant {
            return true;
        }
        if !self.inverters.matches(record.get(SERIAL_FIELD)) {
            return false;
        }
        if let Some(field) = LevelSchema::for_level(self.level).mppt_field() {
            if !self.mppts.matches(record.get(field)) {
                return false;
            }
        }
        self.level != Level::String || self.strings.matches(record.get(STRING_ID_FIELD))
    }
}

/// Human-readable plant name: underscores in identifiers become spaces.
pub fn display_name(plant: &str) -> String {
    plant.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[(&str, &str)]) -> MeasurementRecord {
        fields.iter().copied().collect()
    }

    #[test]
    fn test_keep_by_date_range() {
        let mut query = FetchQuery::new(Level::Inverter);
        query.start_date = NaiveDate::from_ymd_opt(2025, 1, 2);
        query.end_date = NaiveDate::from_ymd_opt(2025, 1, 3);

        assert!(!query.keep(&row(&[("timestamp", "2025-01-01 23:59:59")])));
        assert!(query.keep(&row(&[("timestamp", "2025-01-02 00:00:00")])));
        assert!(query.keep(&row(&[("timestamp", "2025-01-03 23:59:59")])));
        assert!(!query.keep(&row(&[("timestamp", "2025-01-04 00:00:00")])));
        assert!(query.keep(&row(&[("timestamp", "unknown")])));
    }

    #[test]
    fn test_keep_by_entity_selection() {
        let mut query = FetchQuery::new(Level::String);
        query.inverters = "INV1".parse().unwrap();
        query.mppts = "MPPT1,MPPT2".parse().unwrap();
        query.strings = "pv9".parse().unwrap();

        let hit = row(&[("sn", "INV1"), ("MPPT", "MPPT2"), ("Strings", "pv9")]);
        let wrong_string = row(&[("sn", "INV1"), ("MPPT", "MPPT2"), ("Strings", "pv1")]);
        let wrong_inverter = row(&[("sn", "INV2"), ("MPPT", "MPPT2"), ("Strings", "pv9")]);

        assert!(query.keep(&hit));
        assert!(!query.keep(&wrong_string));
        assert!(!query.keep(&wrong_inverter));
    }

    #[test]
    fn test_mppt_level_filters_on_mppt_id() {
        let mut query = FetchQuery::new(Level::Mppt);
        query.mppts = "MPPT5".parse().unwrap();

        assert!(query.keep(&row(&[("sn", "A"), ("mpptId", "MPPT5")])));
        assert!(!query.keep(&row(&[("sn", "A"), ("mpptId", "MPPT1")])));
    }

    #[test]
    fn test_plant_level_ignores_entity_filters() {
        let mut query = FetchQuery::new(Level::Plant);
        query.inverters = "INV1".parse().unwrap();
        assert!(query.keep(&row(&[("timestamp", "2025-01-01 10:00:00")])));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Coca_Cola_Faisalabad"), "Coca Cola Faisalabad");
    }
}
