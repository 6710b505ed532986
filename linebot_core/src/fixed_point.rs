//! Float-to-integer helpers for the duty-cycle path.
//!
//! The PID output is a real number; duty cycles are timer counts. Conversion
//! truncates toward zero and saturates instead of wrapping.

/// Truncate toward zero into `i64`, saturating at the range ends.
/// Non-finite values (NaN/±Inf) map to 0.
#[inline]
pub fn truncate_to_i64(x: f64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    // `as` on floats saturates and truncates toward zero.
    x.trunc() as i64
}

/// Clamp a signed count into `[lo, hi]` and narrow to `u16`.
#[inline]
pub fn clamp_to_u16(v: i64, lo: u16, hi: u16) -> u16 {
    debug_assert!(lo <= hi, "clamp_to_u16: empty band {lo}..={hi}");
    let clamped = v.clamp(i64::from(lo), i64::from(hi));
    // In range by construction.
    u16::try_from(clamped).unwrap_or(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(truncate_to_i64(2.9), 2);
        assert_eq!(truncate_to_i64(-2.9), -2);
        assert_eq!(truncate_to_i64(-0.4), 0);
    }

    #[test]
    fn non_finite_maps_to_zero() {
        assert_eq!(truncate_to_i64(f64::NAN), 0);
        assert_eq!(truncate_to_i64(f64::INFINITY), 0);
        assert_eq!(truncate_to_i64(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn huge_values_saturate() {
        assert_eq!(truncate_to_i64(1e300), i64::MAX);
        assert_eq!(truncate_to_i64(-1e300), i64::MIN);
    }

    #[test]
    fn clamp_band_edges() {
        assert_eq!(clamp_to_u16(-5, 500, 6500), 500);
        assert_eq!(clamp_to_u16(i64::MAX, 500, 6500), 6500);
        assert_eq!(clamp_to_u16(3500, 500, 6500), 3500);
    }
}
