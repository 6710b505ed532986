//! Reflectance bitmap and lateral position estimate.
//!
//! Offsets are in units of 0.1 mm; positive means the line is under the
//! right-hand sensors.

/// Signed lateral offset of the line relative to the array centre (0.1 mm).
pub type Offset = i32;

/// Per-sensor weights, index 0 = rightmost sensor.
pub const SENSOR_WEIGHTS: [Offset; 8] = [334, 238, 142, 48, -48, -142, -238, -334];

/// Bit mask for each sensor, index-aligned with `SENSOR_WEIGHTS`.
pub const SENSOR_MASKS: [u8; 8] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];

/// Reported when no sensor sees the line. One past the rightmost weight so it
/// can never be confused with a real position.
pub const OFF_ROAD_OFFSET: Offset = SENSOR_WEIGHTS[0] + 1;

/// Four rightmost sensors.
pub const RIGHT_NIBBLE: u8 = 0x0F;
/// Four leftmost sensors.
pub const LEFT_NIBBLE: u8 = 0xF0;

/// One reading of the 8-channel array; 1 = dark (line), 0 = background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SensorBitmap(u8);

impl SensorBitmap {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Drop the leftmost sensor by shifting every reading one place right.
    #[inline]
    pub const fn shifted_right(self) -> Self {
        Self(self.0 >> 1)
    }

    #[inline]
    pub const fn has_all(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    #[inline]
    pub const fn has_any(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    /// Number of sensors currently over the line.
    #[inline]
    pub const fn active_count(self) -> u32 {
        self.0.count_ones()
    }
}

impl From<u8> for SensorBitmap {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl From<SensorBitmap> for u8 {
    fn from(b: SensorBitmap) -> Self {
        b.0
    }
}

impl core::fmt::Display for SensorBitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

/// Mean of the weights of all active sensors, truncated toward zero.
///
/// Returns `OFF_ROAD_OFFSET` when the bitmap is empty.
pub fn estimate(bitmap: SensorBitmap) -> Offset {
    let mut sum: Offset = 0;
    let mut count: Offset = 0;
    for (weight, mask) in SENSOR_WEIGHTS.iter().zip(SENSOR_MASKS) {
        if bitmap.has_any(mask) {
            sum += weight;
            count += 1;
        }
    }
    if count == 0 {
        return OFF_ROAD_OFFSET;
    }
    // Rust integer division truncates toward zero.
    sum / count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_road_sentinel_is_one_past_rightmost_weight() {
        assert_eq!(OFF_ROAD_OFFSET, 335);
        assert_eq!(estimate(SensorBitmap::EMPTY), 335);
    }

    #[test]
    fn mixed_sign_mean_truncates_toward_zero() {
        // 48 + -48 + -142 = -142; -142 / 3 = -47.33 -> -47
        assert_eq!(estimate(SensorBitmap::new(0x38)), -47);
        // 334 + 238 + 142 + 48 + -48 = 714; 714 / 5 = 142.8 -> 142
        assert_eq!(estimate(SensorBitmap::new(0x1F)), 142);
    }

    #[test]
    fn bitmap_helpers() {
        let b = SensorBitmap::new(0b1000_1111);
        assert!(b.has_all(RIGHT_NIBBLE));
        assert!(!b.has_all(LEFT_NIBBLE));
        assert!(b.has_any(LEFT_NIBBLE));
        assert_eq!(b.shifted_right().bits(), 0b0100_0111);
        assert_eq!(b.active_count(), 5);
        assert_eq!(b.to_string(), "10001111");
    }
}
