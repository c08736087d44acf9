//! Per-record classification: the map stage of the pipeline.

use tracing::{debug, warn};

use crate::analyzers::schema::LevelSchema;
use crate::analyzers::types::ClassifiedRecord;
use crate::parser::{parse_number, parse_timestamp};
use crate::records::{MeasurementBatch, PLANT_FIELD};

pub const DEFAULT_IRRADIANCE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_POWER_THRESHOLD: f64 = 0.0;

/// Strict lower bounds an interval must exceed to count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub irradiance: f64,
    pub power: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            irradiance: DEFAULT_IRRADIANCE_THRESHOLD,
            power: DEFAULT_POWER_THRESHOLD,
        }
    }
}

/// The four derived indicators of one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicators {
    pub num: u8,
    pub den: u8,
    pub actual_weight: f64,
    pub potential_weight: f64,
}

/// Classifies a single interval. An absent reading never exceeds a threshold.
pub fn indicators(
    power: Option<f64>,
    irradiance: Option<f64>,
    thresholds: &Thresholds,
) -> Indicators {
    let irradiance_ok = irradiance.is_some_and(|g| g > thresholds.irradiance);
    let power_ok = power.is_some_and(|p| p > thresholds.power);
    let g = irradiance.unwrap_or(0.0);

    match (irradiance_ok, power_ok) {
        (true, true) => Indicators {
            num: 1,
            den: 1,
            actual_weight: g,
            potential_weight: g,
        },
        (true, false) => Indicators {
            num: 0,
            den: 1,
            actual_weight: 0.0,
            potential_weight: g,
        },
        (false, _) => Indicators {
            num: 0,
            den: 0,
            actual_weight: 0.0,
            potential_weight: 0.0,
        },
    }
}

/// Why rows were left out of a classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DroppedRows {
    pub filtered: usize,
    pub bad_timestamp: usize,
    pub missing_id: usize,
}

impl DroppedRows {
    pub fn total(&self) -> usize {
        self.filtered + self.bad_timestamp + self.missing_id
    }
}

/// Applies the level's row filter, then classifies every remaining record.
///
/// Records whose timestamp cannot be parsed or which lack one of the level's
/// identifier values are dropped with a warning.
pub fn classify_batch(
    batch: &MeasurementBatch,
    schema: &LevelSchema,
    thresholds: &Thresholds,
) -> (Vec<ClassifiedRecord>, DroppedRows) {
    let mut dropped = DroppedRows::default();
    let mut classified = Vec::with_capacity(batch.len());
    let keyed_by_plant = batch.has_column(PLANT_FIELD);

    for record in batch.records() {
        if let Some(filter) = &schema.row_filter {
            if !filter.keep(record) {
                dropped.filtered += 1;
                continue;
            }
        }

        let Some(timestamp) = record.raw_timestamp().and_then(parse_timestamp) else {
            dropped.bad_timestamp += 1;
            continue;
        };

        let ids: Option<Vec<String>> = schema
            .id_fields
            .iter()
            .map(|field| record.get(field).map(str::to_string))
            .collect();
        let Some(ids) = ids else {
            dropped.missing_id += 1;
            continue;
        };

        let power = record.get(schema.power_field).and_then(parse_number);
        let irradiance = record.get(schema.irradiance_field).and_then(parse_number);
        let ind = indicators(power, irradiance, thresholds);

        classified.push(ClassifiedRecord {
            plant: if keyed_by_plant {
                record.get(PLANT_FIELD).map(str::to_string)
            } else {
                None
            },
            timestamp,
            date: timestamp.date(),
            ids,
            power,
            irradiance,
            num: ind.num,
            den: ind.den,
            actual_weight: ind.actual_weight,
            potential_weight: ind.potential_weight,
        });
    }

    if dropped.filtered > 0 {
        debug!(
            level = %schema.level,
            rows = dropped.filtered,
            "Rows excluded by level filter"
        );
    }
    if dropped.bad_timestamp > 0 {
        warn!(
            level = %schema.level,
            rows = dropped.bad_timestamp,
            "Dropped rows with unparsable timestamp"
        );
    }
    if dropped.missing_id > 0 {
        warn!(
            level = %schema.level,
            rows = dropped.missing_id,
            id_fields = ?schema.id_fields,
            "Dropped rows missing an identifier"
        );
    }

    (classified, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::Level;
    use crate::records::MeasurementRecord;

    fn t() -> Thresholds {
        Thresholds::default()
    }

    #[test]
    fn test_indicators_productive_interval() {
        let ind = indicators(Some(3.2), Some(0.6), &t());
        assert_eq!(ind.num, 1);
        assert_eq!(ind.den, 1);
        assert_eq!(ind.actual_weight, 0.6);
        assert_eq!(ind.potential_weight, 0.6);
    }

    #[test]
    fn test_indicators_sunny_but_no_power() {
        let ind = indicators(Some(0.0), Some(0.6), &t());
        assert_eq!((ind.num, ind.den), (0, 1));
        assert_eq!(ind.actual_weight, 0.0);
        assert_eq!(ind.potential_weight, 0.6);
    }

    #[test]
    fn test_indicators_thresholds_are_strict() {
        let ind = indicators(Some(5.0), Some(0.05), &t());
        assert_eq!((ind.num, ind.den), (0, 0));

        let custom = Thresholds {
            irradiance: 0.05,
            power: 2.0,
        };
        let ind = indicators(Some(2.0), Some(0.3), &custom);
        assert_eq!((ind.num, ind.den), (0, 1));
    }

    #[test]
    fn test_indicators_missing_values_never_qualify() {
        let ind = indicators(None, Some(0.9), &t());
        assert_eq!((ind.num, ind.den), (0, 1));

        let ind = indicators(Some(4.0), None, &t());
        assert_eq!((ind.num, ind.den), (0, 0));
        assert_eq!(ind.potential_weight, 0.0);
    }

    #[test]
    fn test_indicator_invariants_hold_over_grid() {
        let readings = [None, Some(-1.0), Some(0.0), Some(0.05), Some(0.051), Some(2.0)];
        for power in readings {
            for irradiance in readings {
                let ind = indicators(power, irradiance, &t());
                if ind.num == 1 {
                    assert_eq!(ind.den, 1);
                }
                if ind.actual_weight > 0.0 {
                    assert!(ind.potential_weight > 0.0);
                }
            }
        }
    }

    fn string_row(ts: &str, configured: &str, string_id: &str) -> MeasurementRecord {
        [
            ("Plant", "Metro DHA"),
            ("Day_Hour", ts),
            ("sn", "6T21B9040017"),
            ("MPPT", "MPPT1"),
            ("Strings", string_id),
            ("String_Configured", configured),
            ("P_abd", "120.0"),
            ("radiation_intensity", "0.4"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_classify_batch_filters_and_drops() {
        let batch = MeasurementBatch::from_records(vec![
            string_row("2025-01-01 10", "1", "pv1"),
            string_row("2025-01-01 11", "0", "pv1"),
            string_row("garbage", "1", "pv1"),
            string_row("2025-01-01 12", "1", ""),
        ]);
        let schema = LevelSchema::for_level(Level::String);

        let (records, dropped) = classify_batch(&batch, &schema, &t());

        assert_eq!(records.len(), 1);
        assert_eq!(
            dropped,
            DroppedRows {
                filtered: 1,
                bad_timestamp: 1,
                missing_id: 1,
            }
        );
        let r = &records[0];
        assert_eq!(r.plant.as_deref(), Some("Metro DHA"));
        assert_eq!(r.ids, vec!["6T21B9040017", "MPPT1", "pv1"]);
        assert_eq!(r.date.to_string(), "2025-01-01");
        assert_eq!((r.num, r.den), (1, 1));
    }

    #[test]
    fn test_classify_batch_without_plant_column() {
        let row: MeasurementRecord = [
            ("timestamp", "2025-01-01 10:00:00"),
            ("dataItemMap.inverter_power", "10"),
            ("dataItemMap.radiation_intensity", "0.2"),
        ]
        .into_iter()
        .collect();
        let batch = MeasurementBatch::from_records(vec![row]);
        let schema = LevelSchema::for_level(Level::Plant);

        let (records, dropped) = classify_batch(&batch, &schema, &t());

        assert_eq!(dropped.total(), 0);
        assert_eq!(records[0].plant, None);
        assert!(records[0].ids.is_empty());
    }
}
