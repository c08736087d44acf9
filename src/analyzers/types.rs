//! Data types used by the availability pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::analyzers::error::EngineError;

/// Text written in place of a percentage when the ratio is undefined.
pub const DATA_UNAVAILABLE: &str = "Data Unavailable";

/// Hierarchy level an availability figure is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Plant,
    Inverter,
    Mppt,
    String,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Plant, Level::Inverter, Level::Mppt, Level::String];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Plant => "plant",
            Level::Inverter => "inverter",
            Level::Mppt => "mppt",
            Level::String => "string",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plant" => Ok(Level::Plant),
            "inverter" => Ok(Level::Inverter),
            "mppt" => Ok(Level::Mppt),
            "string" => Ok(Level::String),
            other => Err(EngineError::InvalidConfiguration(format!(
                "unknown level '{other}' (expected one of: {})",
                Level::ALL.map(|l| l.as_str()).join(", ")
            ))),
        }
    }
}

/// Scoring formula.
///
/// - `A`: share of irradiance-qualifying intervals in which power was produced.
/// - `B`: the same share, weighted by the irradiance of each interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Formula {
    A,
    B,
}

impl Formula {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formula::A => "A",
            Formula::B => "B",
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Formula {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Formula::A),
            "B" => Ok(Formula::B),
            other => Err(EngineError::InvalidConfiguration(format!(
                "unknown formula '{other}' (expected A or B)"
            ))),
        }
    }
}

/// A daily availability figure: a percentage rounded to two decimals, or the
/// "Data Unavailable" sentinel when the denominator was zero or undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Availability {
    Percent(f64),
    Unavailable,
}

impl Availability {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Availability::Percent(v) => Some(*v),
            Availability::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Availability::Unavailable)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Percent(v) => write!(f, "{v:.2}"),
            Availability::Unavailable => f.write_str(DATA_UNAVAILABLE),
        }
    }
}

impl Serialize for Availability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Availability::Percent(v) => serializer.serialize_f64(*v),
            Availability::Unavailable => serializer.serialize_str(DATA_UNAVAILABLE),
        }
    }
}

/// A measurement after classification against the thresholds.
///
/// Invariants: `num == 1` implies `den == 1`; `actual_weight > 0` implies
/// `potential_weight > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub plant: Option<String>,
    pub timestamp: NaiveDateTime,
    pub date: NaiveDate,
    /// Values of the level's identifier fields, in schema order.
    pub ids: Vec<String>,
    pub power: Option<f64>,
    pub irradiance: Option<f64>,
    pub num: u8,
    pub den: u8,
    pub actual_weight: f64,
    pub potential_weight: f64,
}

/// Grouping key of a daily aggregate. Field order is the output sort order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub date: NaiveDate,
    pub ids: Vec<String>,
    pub plant: Option<String>,
}

/// Summed indicators for one (day, entity) group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSums {
    pub num: u64,
    pub den: u64,
    pub actual_weight: f64,
    pub potential_weight: f64,
}

/// One row of the daily availability table.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub key: GroupKey,
    pub sums: IndicatorSums,
    pub availability: Availability,
}

impl DailyAggregate {
    pub fn date(&self) -> NaiveDate {
        self.key.date
    }

    pub fn plant(&self) -> Option<&str> {
        self.key.plant.as_deref()
    }

    pub fn ids(&self) -> &[String] {
        &self.key.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str_is_case_insensitive() {
        assert_eq!("MPPT".parse::<Level>().unwrap(), Level::Mppt);
        assert_eq!(" string ".parse::<Level>().unwrap(), Level::String);
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn test_unknown_level_is_invalid_configuration() {
        let err = "feeder".parse::<Level>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("plant, inverter, mppt, string"));
    }

    #[test]
    fn test_formula_from_str() {
        assert_eq!("a".parse::<Formula>().unwrap(), Formula::A);
        assert_eq!("B".parse::<Formula>().unwrap(), Formula::B);
        assert!(matches!(
            "C".parse::<Formula>(),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_availability_display() {
        assert_eq!(Availability::Percent(75.0).to_string(), "75.00");
        assert_eq!(Availability::Unavailable.to_string(), "Data Unavailable");
    }

    #[test]
    fn test_availability_serializes_as_number_or_sentinel() {
        assert_eq!(serde_json::to_string(&Availability::Percent(98.5)).unwrap(), "98.5");
        assert_eq!(
            serde_json::to_string(&Availability::Unavailable).unwrap(),
            "\"Data Unavailable\""
        );
    }
}
