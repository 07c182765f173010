//! Approximate equality.

/// Default relative tolerance for [`is_close`].
pub const DEFAULT_RTOL: f64 = 1e-5;

/// Default absolute tolerance for [`is_close`].
pub const DEFAULT_ATOL: f64 = 1e-8;

/// Returns `|a - b| <= atol + rtol * |b|`.
///
/// The relative term is scaled by `b` only, so `is_close(a, b, ..)` and
/// `is_close(b, a, ..)` can disagree. This matches numpy's `isclose` and
/// callers rely on it; `b` is the reference value.
///
/// Equal values (including equal infinities) are close; NaN is never close.
pub fn is_close(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= atol + rtol * b.abs()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_exact_and_near() {
        assert!(is_close(1.0, 1.0, 0.0, 0.0));
        assert!(is_close(1.0, 1.0 + 1e-9, DEFAULT_RTOL, DEFAULT_ATOL));
        assert!(!is_close(1.0, 1.1, DEFAULT_RTOL, DEFAULT_ATOL));
    }

    #[test]
    fn test_asymmetric_in_reference() {
        // |10 - 9| = 1; tolerance 0.1 * |b|
        assert!(is_close(9.0, 10.0, 0.1, 0.0));
        assert!(!is_close(10.0, 9.0, 0.1, 0.0));
    }

    #[test]
    fn test_threshold_edge() {
        // the largest accepted difference is atol + rtol * |b|
        let b = 1e3;
        let limit = DEFAULT_ATOL + DEFAULT_RTOL * b;
        assert_abs_diff_eq!(limit, 1.000_001e-2, epsilon = 1e-15);
        assert!(is_close(b + limit * 0.5, b, DEFAULT_RTOL, DEFAULT_ATOL));
        assert!(!is_close(b + limit * 2.0, b, DEFAULT_RTOL, DEFAULT_ATOL));
    }

    #[test]
    fn test_non_finite() {
        assert!(is_close(f64::INFINITY, f64::INFINITY, 0.0, 0.0));
        assert!(!is_close(f64::INFINITY, f64::NEG_INFINITY, 1.0, 1.0));
        assert!(!is_close(f64::NAN, f64::NAN, 1.0, 1.0));
        assert!(!is_close(1.0, f64::NAN, 1.0, 1.0));
    }
}
