use thiserror::Error;

use crate::analyzers::types::Level;

/// Hard failures of an availability computation.
///
/// Zero denominators and empty inputs are not errors: the former yield
/// [`Availability::Unavailable`](crate::analyzers::types::Availability), the
/// latter an empty report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("schema mismatch at {level} level: missing column(s) {}", .missing.join(", "))]
    SchemaMismatch { level: Level, missing: Vec<String> },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
