use crate::FtError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, FtError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FtError::NonFinite { what, value: v })
    }
}

/// Check that `v` lies in the half-open unit interval `(0, 1]`.
pub fn ensure_fraction(v: Real, what: &'static str) -> Result<Real, FtError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 && v <= 1.0 {
        Ok(v)
    } else {
        Err(FtError::OutOfRange {
            what,
            value: v,
            min: 0.0,
            max: 1.0,
        })
    }
}

/// Ratio `num / den` clamped to `[0, 1]`. A non-positive denominator yields 1.
///
/// Used for the partial-power scaling factors, which must fall continuously to
/// zero as the numerator does.
pub fn unit_ratio(num: Real, den: Real) -> Real {
    if den <= 0.0 {
        return 1.0;
    }
    (num / den).clamp(0.0, 1.0)
}

/// Non-negative part of a reading. NaN maps to zero.
pub fn non_negative(v: Real) -> Real {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_fraction_bounds() {
        assert!(ensure_fraction(1.0, "f").is_ok());
        assert!(ensure_fraction(0.25, "f").is_ok());
        assert!(ensure_fraction(0.0, "f").is_err());
        assert!(ensure_fraction(1.01, "f").is_err());
        assert!(ensure_fraction(Real::INFINITY, "f").is_err());
    }

    #[test]
    fn unit_ratio_clamps() {
        assert_eq!(unit_ratio(0.5, 1.0), 0.5);
        assert_eq!(unit_ratio(2.0, 1.0), 1.0);
        assert_eq!(unit_ratio(-1.0, 1.0), 0.0);
        assert_eq!(unit_ratio(3.0, 0.0), 1.0);
    }

    #[test]
    fn non_negative_handles_nan() {
        assert_eq!(non_negative(Real::NAN), 0.0);
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(4.5), 4.5);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn unit_ratio_stays_in_unit_interval(num in -1e6..1e6f64, den in -1e6..1e6f64) {
            let r = unit_ratio(num, den);
            prop_assert!((0.0..=1.0).contains(&r));
        }

        #[test]
        fn unit_ratio_is_monotone_in_numerator(a in 0.0..100.0f64, b in 0.0..100.0f64, den in 0.1..50.0f64) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(unit_ratio(lo, den) <= unit_ratio(hi, den));
        }
    }
}
