//! Conversion of summed indicators into an availability percentage.

use crate::analyzers::types::{Availability, Formula, IndicatorSums};
use crate::analyzers::utility::{percentage, round2};

/// Evaluates `formula` over one group's sums.
///
/// - A: `Num / Den`
/// - B: `ActualWeight / PotentialWeight`
///
/// A zero or undefined denominator yields [`Availability::Unavailable`].
pub fn evaluate(formula: Formula, sums: &IndicatorSums) -> Availability {
    let (numerator, denominator) = match formula {
        Formula::A => (sums.num as f64, sums.den as f64),
        Formula::B => (sums.actual_weight, sums.potential_weight),
    };
    ratio(numerator, Some(denominator))
}

/// Rounded percentage of `numerator / denominator`, or the sentinel.
pub fn ratio(numerator: f64, denominator: Option<f64>) -> Availability {
    match percentage(numerator, denominator) {
        Some(pct) => Availability::Percent(round2(pct)),
        None => Availability::Unavailable,
    }
}
