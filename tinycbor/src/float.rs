/*!
Conversions between IEEE 754 binary16, binary32 and binary64.

The `*_bits` functions operate purely on bit patterns, so they work on targets
without floating-point hardware or a native half-precision type. Narrowing
conversions round to nearest, ties to even. NaNs keep their sign and as much
payload as fits, with the quiet bit forced.

The value-level wrappers pick the native conversion where one exists, unless
the `soft-float` feature is enabled.
*/

const F16_EXP_MASK: u16 = 0x7C00;
const F16_MAN_MASK: u16 = 0x03FF;
const F16_QUIET: u16 = 0x0200;

const F32_EXP_MASK: u32 = 0x7F80_0000;
const F32_MAN_MASK: u32 = 0x007F_FFFF;
const F32_QUIET: u32 = 0x0040_0000;

const F64_EXP_MASK: u64 = 0x7FF0_0000_0000_0000;
const F64_MAN_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;
const F64_QUIET: u64 = 0x0008_0000_0000_0000;

/// Shifts `man` right by `shift` bits, rounding to nearest even.
///
/// The bit just below the cut is the guard bit; everything below it is
/// sticky. A carry out of the mantissa is left for the caller to propagate
/// into the exponent by plain addition.
fn round_shift(man: u64, shift: u32) -> u64 {
    let kept = man >> shift;
    let guard = 1u64 << (shift - 1);
    let rest = man & ((1u64 << shift) - 1);
    if rest > guard || (rest == guard && kept & 1 == 1) {
        kept + 1
    } else {
        kept
    }
}

pub fn f16_bits_to_f32_bits(h: u16) -> u32 {
    let sign = ((h & 0x8000) as u32) << 16;
    let exp = (h & F16_EXP_MASK) >> 10;
    let mut man = (h & F16_MAN_MASK) as u32;

    match exp {
        0 if man == 0 => sign,
        0 => {
            // Subnormal: renormalize
            let mut e: i32 = -14;
            while man & 0x400 == 0 {
                man <<= 1;
                e -= 1;
            }
            man &= F16_MAN_MASK as u32;
            sign | (((e + 127) as u32) << 23) | (man << 13)
        }
        0x1F if man == 0 => sign | F32_EXP_MASK,
        0x1F => sign | F32_EXP_MASK | F32_QUIET | (man << 13),
        _ => sign | ((exp as u32 + 112) << 23) | (man << 13),
    }
}

pub fn f32_bits_to_f16_bits(f: u32) -> u16 {
    let sign = ((f >> 16) & 0x8000) as u16;
    let exp = ((f & F32_EXP_MASK) >> 23) as i32;
    let man = f & F32_MAN_MASK;

    if exp == 0xFF {
        return if man == 0 {
            sign | F16_EXP_MASK
        } else {
            sign | F16_EXP_MASK | F16_QUIET | (man >> 13) as u16
        };
    }
    if exp == 0 {
        // Zero, or a binary32 subnormal far below the binary16 range
        return sign;
    }

    let e = exp - 127;
    if e > 15 {
        sign | F16_EXP_MASK
    } else if e >= -14 {
        let biased = (((e + 15) as u64) << 23) | man as u64;
        // The carry may walk into the exponent, up to infinity
        sign | round_shift(biased, 13) as u16
    } else if e >= -25 {
        let full = (man | 0x0080_0000) as u64;
        sign | round_shift(full, (-e - 1) as u32) as u16
    } else {
        sign
    }
}

pub fn f32_bits_to_f64_bits(f: u32) -> u64 {
    let sign = ((f & 0x8000_0000) as u64) << 32;
    let exp = (f & F32_EXP_MASK) >> 23;
    let mut man = f & F32_MAN_MASK;

    match exp {
        0 if man == 0 => sign,
        0 => {
            // Subnormal: renormalize
            let mut e: i64 = -126;
            while man & 0x0080_0000 == 0 {
                man <<= 1;
                e -= 1;
            }
            man &= F32_MAN_MASK;
            sign | (((e + 1023) as u64) << 52) | ((man as u64) << 29)
        }
        0xFF if man == 0 => sign | F64_EXP_MASK,
        0xFF => sign | F64_EXP_MASK | F64_QUIET | ((man as u64) << 29),
        _ => sign | ((exp as u64 + 896) << 52) | ((man as u64) << 29),
    }
}

pub fn f64_bits_to_f32_bits(d: u64) -> u32 {
    let sign = ((d >> 32) & 0x8000_0000) as u32;
    let exp = ((d & F64_EXP_MASK) >> 52) as i32;
    let man = d & F64_MAN_MASK;

    if exp == 0x7FF {
        return if man == 0 {
            sign | F32_EXP_MASK
        } else {
            sign | F32_EXP_MASK | F32_QUIET | (man >> 29) as u32
        };
    }
    if exp == 0 {
        return sign;
    }

    let e = exp - 1023;
    if e > 127 {
        sign | F32_EXP_MASK
    } else if e >= -126 {
        let biased = (((e + 127) as u64) << 52) | man;
        sign | round_shift(biased, 29) as u32
    } else if e >= -150 {
        let full = man | (1u64 << 52);
        sign | round_shift(full, (-e - 97) as u32) as u32
    } else {
        sign
    }
}

/// Widens a binary16 bit pattern to `f32`.
pub fn f16_to_f32(bits: u16) -> f32 {
    #[cfg(all(feature = "half", not(feature = "soft-float")))]
    {
        half::f16::from_bits(bits).to_f32()
    }
    #[cfg(not(all(feature = "half", not(feature = "soft-float"))))]
    {
        f32::from_bits(f16_bits_to_f32_bits(bits))
    }
}

/// Narrows an `f32` to a binary16 bit pattern.
pub fn f32_to_f16(value: f32) -> u16 {
    #[cfg(all(feature = "half", not(feature = "soft-float")))]
    {
        half::f16::from_f32(value).to_bits()
    }
    #[cfg(not(all(feature = "half", not(feature = "soft-float"))))]
    {
        f32_bits_to_f16_bits(value.to_bits())
    }
}

pub fn f32_to_f64(value: f32) -> f64 {
    #[cfg(not(feature = "soft-float"))]
    {
        value as f64
    }
    #[cfg(feature = "soft-float")]
    {
        f64::from_bits(f32_bits_to_f64_bits(value.to_bits()))
    }
}

pub fn f64_to_f32(value: f64) -> f32 {
    #[cfg(not(feature = "soft-float"))]
    {
        value as f32
    }
    #[cfg(feature = "soft-float")]
    {
        f32::from_bits(f64_bits_to_f32_bits(value.to_bits()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn half_to_single() {
        assert_eq!(f16_bits_to_f32_bits(0x0000), 0x0000_0000);
        assert_eq!(f16_bits_to_f32_bits(0x8000), 0x8000_0000);
        assert_eq!(f16_bits_to_f32_bits(0x7C00), 0x7F80_0000);
        assert_eq!(f16_bits_to_f32_bits(0xFC00), 0xFF80_0000);
        assert_eq!(f16_bits_to_f32_bits(0x7E00), 0x7FC0_0000);
        // Signalling NaN is quietened, payload kept
        assert_eq!(f16_bits_to_f32_bits(0x7C01), 0x7FC0_2000);
        assert_eq!(f16_bits_to_f32_bits(0x3C00), 1.0f32.to_bits());
        assert_eq!(f16_bits_to_f32_bits(0x3E00), 1.5f32.to_bits());
        assert_eq!(f16_bits_to_f32_bits(0xC400), (-4.0f32).to_bits());
        assert_eq!(f16_bits_to_f32_bits(0x7BFF), 65504.0f32.to_bits());
        // Smallest subnormal, 2^-24
        assert_eq!(f16_bits_to_f32_bits(0x0001), 0x3380_0000);
        // Largest subnormal
        assert_eq!(
            f32::from_bits(f16_bits_to_f32_bits(0x03FF)),
            1023.0 / 16777216.0
        );
        assert_eq!(f16_bits_to_f32_bits(0x0400), 0.00006103515625f32.to_bits());
    }

    #[test]
    fn single_to_half() {
        assert_eq!(f32_bits_to_f16_bits(0x0000_0000), 0x0000);
        assert_eq!(f32_bits_to_f16_bits(0x8000_0000), 0x8000);
        assert_eq!(f32_bits_to_f16_bits(0x7F80_0000), 0x7C00);
        assert_eq!(f32_bits_to_f16_bits(0xFF80_0000), 0xFC00);
        assert_eq!(f32_bits_to_f16_bits(0x7FC0_0000), 0x7E00);
        assert_eq!(f32_bits_to_f16_bits(0xFFC0_0000), 0xFE00);
        assert_eq!(f32_bits_to_f16_bits(1.5f32.to_bits()), 0x3E00);
        assert_eq!(f32_bits_to_f16_bits(65504.0f32.to_bits()), 0x7BFF);
        assert_eq!(f32_bits_to_f16_bits(0x3380_0000), 0x0001);
        // Overflow saturates to infinity, both directly and by rounding carry
        assert_eq!(f32_bits_to_f16_bits(1.0e10f32.to_bits()), 0x7C00);
        assert_eq!(f32_bits_to_f16_bits(65520.0f32.to_bits()), 0x7C00);
        // Ties to even: 1 + 2^-11 rounds down, 1 + 3*2^-11 rounds up
        assert_eq!(f32_bits_to_f16_bits(0x3F80_1000), 0x3C00);
        assert_eq!(f32_bits_to_f16_bits(0x3F80_3000), 0x3C02);
        // Half of the smallest subnormal rounds to zero, just above it does not
        assert_eq!(f32_bits_to_f16_bits(0x3300_0000), 0x0000);
        assert_eq!(f32_bits_to_f16_bits(0x3300_0001), 0x0001);
        // Underflow
        assert_eq!(f32_bits_to_f16_bits(1.0e-10f32.to_bits()), 0x0000);
        assert_eq!(f32_bits_to_f16_bits((-1.0e-10f32).to_bits()), 0x8000);
    }

    #[test]
    fn single_to_double() {
        assert_eq!(f32_bits_to_f64_bits(0x0000_0000), 0);
        assert_eq!(f32_bits_to_f64_bits(0x8000_0000), 0x8000_0000_0000_0000);
        assert_eq!(f32_bits_to_f64_bits(0x7F80_0000), 0x7FF0_0000_0000_0000);
        assert_eq!(f32_bits_to_f64_bits(0xFF80_0000), 0xFFF0_0000_0000_0000);
        assert_eq!(f32_bits_to_f64_bits(0x7FC0_0000), 0x7FF8_0000_0000_0000);
        assert_eq!(f32_bits_to_f64_bits(0x7F80_0001), 0x7FF8_0000_2000_0000);
        assert_eq!(f32_bits_to_f64_bits(1.5f32.to_bits()), 1.5f64.to_bits());
        // Smallest binary32 subnormal, 2^-149
        assert_eq!(f32_bits_to_f64_bits(0x0000_0001), 0x36A0_0000_0000_0000);
    }

    #[test]
    fn double_to_single() {
        assert_eq!(f64_bits_to_f32_bits(0), 0);
        assert_eq!(f64_bits_to_f32_bits(0x8000_0000_0000_0000), 0x8000_0000);
        assert_eq!(f64_bits_to_f32_bits(0x7FF0_0000_0000_0000), 0x7F80_0000);
        assert_eq!(f64_bits_to_f32_bits(0xFFF0_0000_0000_0000), 0xFF80_0000);
        assert_eq!(f64_bits_to_f32_bits(0x7FF8_0000_0000_0000), 0x7FC0_0000);
        assert_eq!(f64_bits_to_f32_bits(1.5f64.to_bits()), 1.5f32.to_bits());
        assert_eq!(f64_bits_to_f32_bits(0x36A0_0000_0000_0000), 0x0000_0001);
        assert_eq!(f64_bits_to_f32_bits(1.0e300f64.to_bits()), 0x7F80_0000);
        assert_eq!(f64_bits_to_f32_bits(1.0e-300f64.to_bits()), 0);
    }

    #[test]
    fn matches_native() {
        for v in [
            1.1f64,
            -4.1,
            100000.0,
            3.4028234663852886e+38,
            3.4028235677973366e+38,
            1.0e-40,
            -7.0e-45,
            core::f64::consts::PI,
            1.0 / 3.0,
        ] {
            assert_eq!(f64_bits_to_f32_bits(v.to_bits()), (v as f32).to_bits());
        }
        for v in [1.1f32, -4.1, 1.0e-40, f32::MAX, f32::MIN_POSITIVE] {
            assert_eq!(f32_bits_to_f64_bits(v.to_bits()), (v as f64).to_bits());
        }
    }

    #[test]
    fn matches_half_crate() {
        for v in [
            0.1f32,
            -2.5,
            1.0e-5,
            6.0e-8,
            3.0e-8,
            65519.0,
            0.333,
            1234.5678,
        ] {
            assert_eq!(
                f32_bits_to_f16_bits(v.to_bits()),
                half::f16::from_f32(v).to_bits()
            );
        }
        for bits in [0x0001u16, 0x03FF, 0x0400, 0x3555, 0x7BFF, 0xB800] {
            assert_eq!(
                f16_bits_to_f32_bits(bits),
                half::f16::from_bits(bits).to_f32().to_bits()
            );
        }
    }

    #[test]
    fn value_wrappers() {
        assert_eq!(f16_to_f32(0x3E00), 1.5);
        assert_eq!(f32_to_f16(1.5), 0x3E00);
        assert_eq!(f32_to_f64(1.5), 1.5);
        assert_eq!(f64_to_f32(1.5), 1.5);
        assert!(f16_to_f32(0x7E00).is_nan());
    }
}
