use crate::CoreError;

/// Scalar type of every state field and rate.
pub type Real = f64;

/// Absolute and relative slack for comparing accumulated quantities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    /// Totals that only went through explicit-Euler transfers between
    /// entities; they drift by rounding alone.
    pub const CONSERVATION: Tolerances = Tolerances {
        abs: 1e-12,
        rel: 1e-9,
    };

    pub const fn new(abs: Real, rel: Real) -> Self {
        Self { abs, rel }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::CONSERVATION
    }
}

/// `|a - b|` within `tol.abs`, or within `tol.rel` of the larger magnitude.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Finite and strictly positive, e.g. a timestep.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_uses_either_bound() {
        let tol = Tolerances::new(1e-12, 1e-9);
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(nearly_equal(1.0e6, 1.0e6 + 1e-4, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
        assert!(!nearly_equal(Real::NAN, Real::NAN, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let msg = ensure_finite(Real::NAN, "mass").unwrap_err().to_string();
        assert!(msg.contains("mass"));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_infinity() {
        assert!(ensure_positive(0.1, "dt").is_ok());
        assert!(matches!(
            ensure_positive(0.0, "dt"),
            Err(CoreError::InvalidArg { what: "dt" })
        ));
        assert!(matches!(
            ensure_positive(Real::INFINITY, "dt"),
            Err(CoreError::NonFinite { .. })
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6_f64..1e6, b in -1e6_f64..1e6) {
            let tol = Tolerances::CONSERVATION;
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }

        #[test]
        fn nearly_equal_is_reflexive(a in -1e12_f64..1e12) {
            prop_assert!(nearly_equal(a, a, Tolerances::default()));
        }
    }
}
