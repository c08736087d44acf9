//! Availability computation engine.
//!
//! Raw records are mapped to per-interval indicators ([`classify`]), reduced
//! per day and entity ([`aggregate`]), scored ([`formula`]) and bucketed for
//! presentation ([`grade`]). [`analyzer::calculate_availability`] runs the
//! whole pipeline for one batch.

pub mod aggregate;
pub mod analyzer;
pub mod classify;
pub mod error;
pub mod formula;
pub mod grade;
pub mod schema;
pub mod trace;
pub mod types;
pub mod utility;

pub use analyzer::{AvailabilityReport, EngineConfig, calculate_availability};
pub use error::EngineError;
pub use grade::Severity;
pub use types::{Availability, DailyAggregate, Formula, Level};
