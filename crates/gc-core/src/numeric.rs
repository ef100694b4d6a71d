use crate::GcError;

/// Floating point type used throughout system
pub type Real = f64;

/// `|a - b| <= eps`, the comparison used by every coupling check.
#[inline]
pub fn within(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() <= eps
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, GcError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(GcError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, GcError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(GcError::InvalidArg { what })
    }
}
