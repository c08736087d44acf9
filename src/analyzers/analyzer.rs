use tracing::{debug, warn};

use crate::analyzers::aggregate::aggregate_daily;
use crate::analyzers::classify::{Thresholds, classify_batch};
use crate::analyzers::error::EngineError;
use crate::analyzers::formula::evaluate;
use crate::analyzers::schema::LevelSchema;
use crate::analyzers::trace::DebugTrace;
use crate::analyzers::types::{DailyAggregate, Formula, Level};
use crate::records::MeasurementBatch;

/// Everything one computation needs besides the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub level: Level,
    pub formula: Formula,
    pub thresholds: Thresholds,
}

impl EngineConfig {
    /// Validates the thresholds; both must be finite numbers.
    pub fn new(
        level: Level,
        formula: Formula,
        irradiance_threshold: f64,
        power_threshold: f64,
    ) -> Result<Self, EngineError> {
        for (name, value) in [
            ("irradiance threshold", irradiance_threshold),
            ("power threshold", power_threshold),
        ] {
            if !value.is_finite() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }

        Ok(Self {
            level,
            formula,
            thresholds: Thresholds {
                irradiance: irradiance_threshold,
                power: power_threshold,
            },
        })
    }

    /// Default thresholds for `level` and `formula`.
    pub fn with_defaults(level: Level, formula: Formula) -> Self {
        Self {
            level,
            formula,
            thresholds: Thresholds::default(),
        }
    }
}

/// Daily table plus the audit trace it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityReport {
    pub level: Level,
    pub formula: Formula,
    pub daily: Vec<DailyAggregate>,
    pub trace: DebugTrace,
}

impl AvailabilityReport {
    pub fn empty(config: &EngineConfig) -> Self {
        Self {
            level: config.level,
            formula: config.formula,
            daily: Vec::new(),
            trace: DebugTrace::empty(&LevelSchema::for_level(config.level)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }

    /// Appends the rows of another report computed with the same configuration.
    pub fn append(&mut self, other: AvailabilityReport) {
        self.daily.extend(other.daily);
        self.trace.extend(other.trace);
    }
}

/// Computes daily availability for one batch of records.
///
/// Pipeline: resolve level schema → filter and classify rows → sum per
/// (date, identifiers, plant) → evaluate the formula.
///
/// An empty batch, or one with no rows left after filtering, yields an
/// empty report. A batch lacking the level's power, irradiance or filter
/// column fails with [`EngineError::SchemaMismatch`].
pub fn calculate_availability(
    batch: &MeasurementBatch,
    config: &EngineConfig,
) -> Result<AvailabilityReport, EngineError> {
    if batch.is_empty() {
        warn!(level = %config.level, "No input records");
        return Ok(AvailabilityReport::empty(config));
    }

    let schema = LevelSchema::resolve(config.level, batch)?;

    let (records, dropped) = classify_batch(batch, &schema, &config.thresholds);
    if records.is_empty() {
        warn!(
            level = %config.level,
            input = batch.len(),
            dropped = dropped.total(),
            "No records left after filtering"
        );
        return Ok(AvailabilityReport::empty(config));
    }

    let daily: Vec<DailyAggregate> = aggregate_daily(&records)
        .into_iter()
        .map(|(key, sums)| DailyAggregate {
            availability: evaluate(config.formula, &sums),
            key,
            sums,
        })
        .collect();

    debug!(
        level = %config.level,
        formula = %config.formula,
        records = records.len(),
        groups = daily.len(),
        "Availability computed"
    );

    Ok(AvailabilityReport {
        level: config.level,
        formula: config.formula,
        daily,
        trace: DebugTrace::new(&schema, records),
    })
}
