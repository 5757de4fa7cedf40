//! Binary sample codes of the simulated converters.
//!
//! A code spans the full width of its integer type across the channel's
//! configured range; signed codes are centred on zero.

pub(super) trait RawCode: Copy + Default {
    const LOWEST: f64;
    const SPAN: f64;

    fn from_f64(v: f64) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! raw_code {
    ($ty:ty) => {
        impl RawCode for $ty {
            const LOWEST: f64 = <$ty>::MIN as f64;
            const SPAN: f64 = <$ty>::MAX as f64 - <$ty>::MIN as f64;

            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

raw_code!(i16);
raw_code!(u16);
raw_code!(i32);
raw_code!(u32);

/// Fixed ranges of the power channel's binary read.
pub(super) const POWER_VOLTAGE_RANGE: (f64, f64) = (-20.0, 20.0);
pub(super) const POWER_CURRENT_RANGE: (f64, f64) = (-2.0, 2.0);

pub(super) fn encode<T: RawCode>(value: f64, (lo, hi): (f64, f64)) -> T {
    let norm = if hi > lo { ((value - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.0 };
    T::from_f64((T::LOWEST + norm * T::SPAN).round())
}

pub(super) fn decode<T: RawCode>(code: T, (lo, hi): (f64, f64)) -> f64 {
    lo + (code.to_f64() - T::LOWEST) / T::SPAN * (hi - lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_codes_span_range() {
        assert_eq!(encode::<i16>(-10.0, (-10.0, 10.0)), i16::MIN);
        assert_eq!(encode::<i16>(10.0, (-10.0, 10.0)), i16::MAX);
        assert_eq!(encode::<i16>(99.0, (-10.0, 10.0)), i16::MAX);
    }

    #[test]
    fn test_decode_inverts_encode_within_one_code() {
        let range = (-5.0, 5.0);
        let code: u16 = encode(1.25, range);
        let back = decode(code, range);
        assert!((back - 1.25).abs() < 10.0 / 65535.0);
    }
}
