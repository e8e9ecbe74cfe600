use anyhow::{ensure, Result};

use crate::scalar::s32::{round_shr64, sat32};
use crate::types::Exponent;

const F32_EXP_BIAS: i32 = 127;
const F32_FRAC_BITS: i32 = 23;

/// Decompose a float into `(sign_negative, frac, exp)` with value
/// `+-frac * 2^exp`; subnormals included, zero maps to `frac == 0`.
fn decompose(v: f32) -> (bool, u32, i32) {
    let bits = v.to_bits();
    let neg = bits >> 31 != 0;
    let biased = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x7F_FFFF;
    if biased == 0 {
        (neg, frac, 1 - F32_EXP_BIAS - F32_FRAC_BITS)
    } else {
        (neg, frac | (1 << 23), biased - F32_EXP_BIAS - F32_FRAC_BITS)
    }
}

/// The smallest exponent at which every element's mantissa fits in 32 bits.
///
/// Errors on non-finite input. An all-zero vector yields a benign default.
pub fn f32_max_exponent(x: &[f32]) -> Result<Exponent> {
    let mut max_exp = i32::MIN;
    for &v in x {
        ensure!(v.is_finite(), "non-finite sample in float vector");
        let (_, frac, exp) = decompose(v);
        if frac != 0 {
            // 24 significant bits at exponent `exp`; an i32 holds 31.
            max_exp = max_exp.max(exp + 24 - 31);
        }
    }
    if max_exp == i32::MIN {
        max_exp = -31;
    }
    Ok(max_exp)
}

/// Quantise a float to the mantissa of `v * 2^-exp`, rounding to nearest.
///
/// Pure integer arithmetic on the float's bit pattern, so results are
/// bit-reproducible across targets.
pub fn f32_to_s32(v: f32, exp: Exponent) -> i32 {
    let (neg, frac, e) = decompose(v);
    if frac == 0 {
        return 0;
    }
    let shift = e - exp;
    let mag: i64 = if shift >= 0 {
        if shift > 38 {
            i64::MAX
        } else {
            (frac as i64) << shift
        }
    } else {
        round_shr64(frac as i64, (-shift) as u32)
    };
    sat32(if neg { -mag } else { mag })
}

/// The float nearest to `mant * 2^exp`.
pub fn s32_to_f32(mant: i32, exp: Exponent) -> f32 {
    if mant == 0 {
        return 0.0;
    }
    let exp = exp.clamp(-252, 252);
    let h1 = exp / 2;
    let h2 = exp - h1;
    let scale = |h: i32| f32::from_bits(((F32_EXP_BIAS + h) as u32) << 23);
    (mant as f32) * scale(h1) * scale(h2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantise_round_trip() {
        for &v in &[0.0f32, 1.0, -1.0, 0.5, 1234.5678, -0.001, 3.0e-3] {
            let exp = f32_max_exponent(&[v]).unwrap();
            let m = f32_to_s32(v, exp);
            let back = s32_to_f32(m, exp);
            assert!(
                (back - v).abs() <= v.abs() * 1e-6,
                "{v} -> {m}*2^{exp} -> {back}"
            );
        }
    }

    #[test]
    fn max_exponent_leaves_no_overflow() {
        let xs = [1.0f32, -3.5, 1.0e20, -2.0e20];
        let exp = f32_max_exponent(&xs).unwrap();
        let lsb = (exp as f64).exp2() as f32;
        for &v in &xs {
            let m = f32_to_s32(v, exp);
            // Must not have saturated.
            assert!(m.unsigned_abs() < 0x7FFF_FFFF);
            // Small elements vanish beneath the block exponent; everything is
            // within one LSb of exact.
            let back = s32_to_f32(m, exp);
            assert!((back - v).abs() <= lsb);
        }
    }

    #[test]
    fn rejects_non_finite() {
        assert!(f32_max_exponent(&[f32::INFINITY]).is_err());
        assert!(f32_max_exponent(&[f32::NAN]).is_err());
    }

    #[test]
    fn subnormals_quantise_to_zeroish() {
        let v = f32::from_bits(1); // smallest subnormal
        let m = f32_to_s32(v, 0);
        assert_eq!(m, 0);
    }
}
