use serde::Serialize;
use std::fmt;

use crate::analyzers::types::Availability;

/// Presentation bucket of an availability percentage.
///
/// | Range            | Bucket       | Color     |
/// |------------------|--------------|-----------|
/// | sentinel / NaN   | Unknown      | `#808080` |
/// | == 100           | Perfect      | `#00FF00` |
/// | [98, 100)        | High         | `#0000FF` |
/// | [95, 98)         | Good         | `#FFFF00` |
/// | [80, 95)         | Degraded     | `#FFA500` |
/// | [0, 80)          | Poor         | `#FF0000` |
/// | outside [0, 100] | Unclassified | `#FFFFFF` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Perfect,
    High,
    Good,
    Degraded,
    Poor,
    Unknown,
    Unclassified,
}

impl Severity {
    pub fn of(availability: &Availability) -> Self {
        match availability {
            Availability::Percent(v) => Self::from_value(*v),
            Availability::Unavailable => Severity::Unknown,
        }
    }

    pub fn from_value(v: f64) -> Self {
        match v {
            v if v.is_nan() => Severity::Unknown,
            v if v == 100.0 => Severity::Perfect,
            v if (98.0..100.0).contains(&v) => Severity::High,
            v if (95.0..98.0).contains(&v) => Severity::Good,
            v if (80.0..95.0).contains(&v) => Severity::Degraded,
            v if (0.0..80.0).contains(&v) => Severity::Poor,
            _ => Severity::Unclassified,
        }
    }

    /// Hex RGB fill used when rendering the bucket.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Perfect => "#00FF00",
            Severity::High => "#0000FF",
            Severity::Good => "#FFFF00",
            Severity::Degraded => "#FFA500",
            Severity::Poor => "#FF0000",
            Severity::Unknown => "#808080",
            Severity::Unclassified => "#FFFFFF",
        }
    }

    /// [`Self::color`] as a `0xRRGGBB` value.
    pub fn rgb(&self) -> u32 {
        u32::from_str_radix(self.color().trim_start_matches('#'), 16).unwrap_or(0xFFFFFF)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Perfect => "Perfect",
            Severity::High => "High",
            Severity::Good => "Good",
            Severity::Degraded => "Degraded",
            Severity::Poor => "Poor",
            Severity::Unknown => "Unknown",
            Severity::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
