//! IEEE-754 half-precision reconstruction.
//!
//! Layout: 1 sign bit, 5 exponent bits (bias 15), 10 mantissa bits.

/// Convert a binary16 bit pattern to `f32`.
pub fn f16_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0f32 } else { 1.0f32 };
    let exponent = (bits >> 10) & 0x1f;
    let mantissa = (bits & 0x03ff) as f32 / 1024.0;

    match exponent {
        // Subnormal (and signed zero)
        0 => sign * 2.0f32.powi(-14) * mantissa,
        0x1f => {
            if mantissa == 0.0 {
                sign * f32::INFINITY
            } else {
                f32::NAN
            }
        }
        e => sign * 2.0f32.powi(e as i32 - 15) * (1.0 + mantissa),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_and_zero() {
        assert_eq!(f16_to_f32(0x3c00), 1.0);
        assert_eq!(f16_to_f32(0x0000), 0.0);
        assert_eq!(f16_to_f32(0xbc00), -1.0);
    }

    #[test]
    fn test_infinities_and_nan() {
        assert_eq!(f16_to_f32(0x7c00), f32::INFINITY);
        assert_eq!(f16_to_f32(0xfc00), f32::NEG_INFINITY);
        assert!(f16_to_f32(0x7c01).is_nan());
        assert!(f16_to_f32(0xfe00).is_nan());
    }

    #[test]
    fn test_subnormals() {
        // Smallest positive subnormal: 2^-24
        assert_eq!(f16_to_f32(0x0001), 2.0f32.powi(-24));
        // Largest subnormal: 2^-14 * 1023/1024
        assert_eq!(f16_to_f32(0x03ff), 2.0f32.powi(-14) * (1023.0 / 1024.0));
    }

    #[test]
    fn test_normal_values() {
        assert_eq!(f16_to_f32(0x4000), 2.0);
        assert_eq!(f16_to_f32(0x3800), 0.5);
        assert_eq!(f16_to_f32(0x4d00), 20.0);
        // Largest finite half
        assert_eq!(f16_to_f32(0x7bff), 65504.0);
    }
}
