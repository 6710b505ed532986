//! Tick-rate to period conversion for the schedule config.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Period in microseconds for a tick rate in Hz.
/// - `hz` is clamped to at least 1.
/// - Result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    debug_assert!(hz > 0, "tick rate must be > 0");
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}
