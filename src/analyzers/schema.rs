//! Per-level column knowledge: which fields carry power and irradiance, which
//! identify the entity, and which rows take part at all.

use crate::analyzers::error::EngineError;
use crate::analyzers::types::Level;
use crate::parser::parse_number;
use crate::records::{MeasurementBatch, MeasurementRecord};

pub const PLANT_POWER_FIELD: &str = "dataItemMap.inverter_power";
pub const PLANT_IRRADIANCE_FIELD: &str = "dataItemMap.radiation_intensity";
pub const INVERTER_POWER_FIELD: &str = "InverterPower";
pub const MPPT_POWER_FIELD: &str = "mppt_Power";
pub const STRING_POWER_FIELD: &str = "P_abd";
pub const IRRADIANCE_FIELD: &str = "radiation_intensity";

pub const SERIAL_FIELD: &str = "sn";
pub const MPPT_ID_FIELD: &str = "mpptId";
pub const STRING_MPPT_FIELD: &str = "MPPT";
pub const STRING_ID_FIELD: &str = "Strings";
pub const STRING_CONFIGURED_FIELD: &str = "String_Configured";

/// Row predicate applied before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// Keep rows whose flag column parses to exactly 1.
    FlagEquals1(&'static str),
}

impl RowFilter {
    pub fn field(&self) -> &'static str {
        match self {
            RowFilter::FlagEquals1(field) => *field,
        }
    }

    pub fn keep(&self, record: &MeasurementRecord) -> bool {
        match self {
            RowFilter::FlagEquals1(field) => {
                record.get(field).and_then(parse_number) == Some(1.0)
            }
        }
    }
}

/// Column semantics of one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSchema {
    pub level: Level,
    pub power_field: &'static str,
    pub irradiance_field: &'static str,
    pub id_fields: &'static [&'static str],
    pub row_filter: Option<RowFilter>,
}

impl LevelSchema {
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Plant => LevelSchema {
                level,
                power_field: PLANT_POWER_FIELD,
                irradiance_field: PLANT_IRRADIANCE_FIELD,
                id_fields: &[],
                row_filter: None,
            },
            Level::Inverter => LevelSchema {
                level,
                power_field: INVERTER_POWER_FIELD,
                irradiance_field: IRRADIANCE_FIELD,
                id_fields: &[SERIAL_FIELD],
                row_filter: None,
            },
            Level::Mppt => LevelSchema {
                level,
                power_field: MPPT_POWER_FIELD,
                irradiance_field: IRRADIANCE_FIELD,
                id_fields: &[SERIAL_FIELD, MPPT_ID_FIELD],
                row_filter: None,
            },
            Level::String => LevelSchema {
                level,
                power_field: STRING_POWER_FIELD,
                irradiance_field: IRRADIANCE_FIELD,
                id_fields: &[SERIAL_FIELD, STRING_MPPT_FIELD, STRING_ID_FIELD],
                row_filter: Some(RowFilter::FlagEquals1(STRING_CONFIGURED_FIELD)),
            },
        }
    }

    /// Resolves the schema of `level` against the columns a batch actually has.
    ///
    /// Fails with [`EngineError::SchemaMismatch`] when the power, irradiance or
    /// filter column is absent. Identifier columns are not checked here: rows
    /// lacking an identifier are dropped during classification.
    pub fn resolve(level: Level, batch: &MeasurementBatch) -> Result<Self, EngineError> {
        let schema = Self::for_level(level);

        let mut required = vec![schema.power_field, schema.irradiance_field];
        if let Some(filter) = schema.row_filter {
            required.push(filter.field());
        }

        let missing: Vec<String> = required
            .into_iter()
            .filter(|field| !batch.has_column(field))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(schema)
        } else {
            Err(EngineError::SchemaMismatch { level, missing })
        }
    }

    /// Column used to narrow a batch by MPPT selection, if the level has one.
    pub fn mppt_field(&self) -> Option<&'static str> {
        match self.level {
            Level::Mppt => Some(MPPT_ID_FIELD),
            Level::String => Some(STRING_MPPT_FIELD),
            Level::Plant | Level::Inverter => None,
        }
    }
}
