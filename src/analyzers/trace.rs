//! Per-record audit trail of a computation.
//!
//! The trace owns the very records the aggregator summed, so displayed
//! aggregates and the evidence behind them cannot drift apart.

use chrono::NaiveDateTime;

use crate::analyzers::schema::LevelSchema;
use crate::analyzers::types::ClassifiedRecord;

/// One row of the debug trace, borrowed from a classified record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRow<'a> {
    pub plant: Option<&'a str>,
    pub timestamp: NaiveDateTime,
    pub ids: &'a [String],
    pub power: Option<f64>,
    pub irradiance: Option<f64>,
    pub num: u8,
    pub den: u8,
    pub actual_weight: f64,
    pub potential_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugTrace {
    pub power_field: &'static str,
    pub irradiance_field: &'static str,
    pub id_fields: &'static [&'static str],
    records: Vec<ClassifiedRecord>,
}

impl DebugTrace {
    pub fn new(schema: &LevelSchema, records: Vec<ClassifiedRecord>) -> Self {
        Self {
            power_field: schema.power_field,
            irradiance_field: schema.irradiance_field,
            id_fields: schema.id_fields,
            records,
        }
    }

    pub fn empty(schema: &LevelSchema) -> Self {
        Self::new(schema, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClassifiedRecord] {
        &self.records
    }

    pub fn rows(&self) -> impl Iterator<Item = TraceRow<'_>> {
        self.records.iter().map(|r| TraceRow {
            plant: r.plant.as_deref(),
            timestamp: r.timestamp,
            ids: &r.ids,
            power: r.power,
            irradiance: r.irradiance,
            num: r.num,
            den: r.den,
            actual_weight: r.actual_weight,
            potential_weight: r.potential_weight,
        })
    }

    /// Appends another trace of the same level.
    pub fn extend(&mut self, other: DebugTrace) {
        self.records.extend(other.records);
    }
}
