/// Rounds to two decimal places, half away from zero.
///
/// Applied to every reported percentage so output does not depend on the
/// platform's float formatting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * numerator / denominator`, or `None` when the denominator is absent,
/// not positive, or the result is not finite.
pub fn percentage(numerator: f64, denominator: Option<f64>) -> Option<f64> {
    let denominator = denominator.filter(|d| *d > 0.0)?;
    let numerator = if numerator.is_nan() { 0.0 } else { numerator };
    let pct = numerator / denominator * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(75.0), 75.0);
        assert_eq!(round2(99.999), 100.0);
        assert_eq!(round2(66.66666), 66.67);
        assert_eq!(round2(12.345_000_1), 12.35);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn test_percentage_guards_denominator() {
        assert_eq!(percentage(6.0, Some(8.0)), Some(75.0));
        assert_eq!(percentage(0.0, Some(0.0)), None);
        assert_eq!(percentage(1.0, Some(-2.0)), None);
        assert_eq!(percentage(1.0, None), None);
        assert_eq!(percentage(1.0, Some(f64::NAN)), None);
        assert_eq!(percentage(f64::NAN, Some(4.0)), Some(0.0));
    }
}
