//! Absolute time in the driver's representation.
//!
//! The driver counts whole seconds since 1904-01-01 00:00:00 UTC and
//! a fraction of a second in units of 2^-64 s. [`Timestamp`] keeps that
//! representation exactly and converts to `chrono` at nanosecond resolution.

use chrono::{DateTime, TimeZone, Utc};

/// Seconds between the 1904 driver epoch and the 1970 Unix epoch.
pub const EPOCH_OFFSET_SECONDS: i64 = 2_082_844_800;

const NANOS_PER_SECOND: u128 = 1_000_000_000;
const FEMTOS_PER_SECOND: u128 = 1_000_000_000_000_000;

/// Absolute time with sub-femtosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    seconds: i64,
    fraction: u64,
}

impl Timestamp {
    /// Build from raw driver fields.
    pub const fn new(seconds_since_1904: i64, fraction: u64) -> Self {
        Self {
            seconds: seconds_since_1904,
            fraction,
        }
    }

    /// Whole seconds since the 1904 epoch.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Fractional second in units of 2^-64 s.
    pub fn fraction(&self) -> u64 {
        self.fraction
    }

    /// Nanoseconds within the second, truncated.
    pub fn subsec_nanos(&self) -> u32 {
        ((u128::from(self.fraction) * NANOS_PER_SECOND) >> 64) as u32
    }

    /// Femtoseconds within the second, truncated.
    pub fn subsec_femtos(&self) -> u64 {
        ((u128::from(self.fraction) * FEMTOS_PER_SECOND) >> 64) as u64
    }

    /// Yoctoseconds within the second, truncated.
    pub fn subsec_yoctos(&self) -> u128 {
        // 10^24 * 2^64 overflows u128, so scale in two 10^12 steps.
        let scaled = u128::from(self.fraction) * 1_000_000_000_000;
        let high = (scaled >> 32) * 1_000_000_000_000;
        let low = ((scaled & 0xFFFF_FFFF) * 1_000_000_000_000) >> 32;
        (high + low) >> 32
    }

    /// Build from femtoseconds within a 1904-epoch second.
    pub fn from_parts_femtos(seconds_since_1904: i64, femtos: u64) -> Self {
        let femtos = u128::from(femtos).min(FEMTOS_PER_SECOND - 1);
        Self::new(seconds_since_1904, ceil_fraction(femtos, FEMTOS_PER_SECOND))
    }

    /// Convert to a UTC date-time, truncating below one nanosecond.
    ///
    /// Returns `None` when the instant is outside chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let unix = self.seconds.checked_sub(EPOCH_OFFSET_SECONDS)?;
        Utc.timestamp_opt(unix, self.subsec_nanos()).single()
    }
}

/// Smallest fraction that truncates back to `units`, so conversions round-trip.
fn ceil_fraction(units: u128, per_second: u128) -> u64 {
    let numerator = units << 64;
    let fraction = numerator.div_ceil(per_second);
    u64::try_from(fraction).unwrap_or(u64::MAX)
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        let nanos = u128::from(dt.timestamp_subsec_nanos()).min(NANOS_PER_SECOND - 1);
        Self::new(
            dt.timestamp() + EPOCH_OFFSET_SECONDS,
            ceil_fraction(nanos, NANOS_PER_SECOND),
        )
    }
}

impl From<daqmx_sys::CVIAbsoluteTime> for Timestamp {
    fn from(raw: daqmx_sys::CVIAbsoluteTime) -> Self {
        Self::new(raw.msb, raw.lsb)
    }
}

impl From<Timestamp> for daqmx_sys::CVIAbsoluteTime {
    fn from(ts: Timestamp) -> Self {
        daqmx_sys::CVIAbsoluteTime {
            lsb: ts.fraction,
            msb: ts.seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        let ts = Timestamp::new(EPOCH_OFFSET_SECONDS, 0);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 0);
    }

    #[test]
    fn test_half_second_fraction() {
        let ts = Timestamp::new(0, 1 << 63);
        assert_eq!(ts.subsec_nanos(), 500_000_000);
        assert_eq!(ts.subsec_femtos(), 500_000_000_000_000);
        assert_eq!(ts.subsec_yoctos(), 500_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_datetime_round_trip_keeps_nanoseconds() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).single().unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts.to_datetime(), Some(dt));
    }

    #[test]
    fn test_before_unix_epoch() {
        // 1950-01-01, between the two epochs.
        let dt = Utc.timestamp_opt(-631_152_000, 999_999_999).single().unwrap();
        let ts = Timestamp::from(dt);
        assert!(ts.seconds() > 0);
        assert_eq!(ts.to_datetime(), Some(dt));
    }

    #[test]
    fn test_femtos_round_trip() {
        let ts = Timestamp::from_parts_femtos(10, 123_456_789_012_345);
        assert_eq!(ts.subsec_femtos(), 123_456_789_012_345);
    }

    #[test]
    fn test_ordering_follows_time() {
        let a = Timestamp::new(5, u64::MAX);
        let b = Timestamp::new(6, 0);
        assert!(a < b);
    }

    #[test]
    fn test_raw_conversion() {
        let raw = daqmx_sys::CVIAbsoluteTime { lsb: 7, msb: 9 };
        let ts = Timestamp::from(raw);
        assert_eq!((ts.seconds(), ts.fraction()), (9, 7));
        assert_eq!(daqmx_sys::CVIAbsoluteTime::from(ts), raw);
    }
}
