use alloc::vec::Vec;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::bfp::{BfpS32, BfpVector};
use crate::scalar::s16::{ashr16, headroom16};
use crate::scalar::s32::{headroom64, round_shr64, sat32};
use crate::types::{
    Exponent, FloatS16, FloatS32, FloatS64, Headroom, LeftShift, SQRT_DEPTH_S16,
};
use crate::vect::prepare::{self, ClipPlan};
use crate::vect::s16 as vect;

/// A real-valued BFP vector with 16-bit mantissas.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BfpS16 {
    pub data: Vec<i16>,
    pub exp: Exponent,
    pub hr: Headroom,
}

impl BfpVector for BfpS16 {
    type Elem = i16;

    fn len(&self) -> usize {
        self.data.len()
    }
    fn exp(&self) -> Exponent {
        self.exp
    }
    fn hr(&self) -> Headroom {
        self.hr
    }
}

impl BfpS16 {
    /// Wrap a caller-provided mantissa buffer, computing its headroom.
    pub fn new(data: Vec<i16>, exp: Exponent) -> Self {
        let hr = vect::headroom(&data);
        Self { data, exp, hr }
    }

    /// Wrap a buffer with a caller-asserted headroom.
    pub fn with_headroom(data: Vec<i16>, exp: Exponent, hr: Headroom) -> Self {
        Self { data, exp, hr }
    }

    /// Allocate a zeroed vector of the given length.
    pub fn try_alloc(length: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(length).map_err(|_| {
            log::warn!("BFP allocation of {length} elements failed");
            anyhow!("allocation of {length} elements failed")
        })?;
        data.resize(length, 0);
        Ok(Self {
            data,
            exp: 0,
            hr: 15,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Recompute (and store) the vector's headroom.
    pub fn headroom(&mut self) -> Headroom {
        self.hr = vect::headroom(&self.data);
        self.hr
    }

    /// Force the vector onto a caller-chosen exponent, rescaling mantissas.
    pub fn use_exponent(&mut self, exp: Exponent) {
        let delta = exp - self.exp;
        if delta == 0 {
            return;
        }
        self.hr = vect::shr_in_place(&mut self.data, delta);
        self.exp = exp;
    }

    /// `self <- b * 2^shl`, keeping the exponent.
    pub fn shl(&mut self, b: &Self, shl: LeftShift) {
        debug_assert_eq!(self.len(), b.len());
        self.exp = b.exp;
        self.hr = vect::shl(&mut self.data, &b.data, shl);
    }

    /// Set every element to `value * 2^exp`.
    pub fn set(&mut self, value: i16, exp: Exponent) {
        self.exp = exp;
        self.hr = vect::set(&mut self.data, value);
    }

    /// `self <- b + c`.
    pub fn add(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::add_sub(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::add(&mut self.data, &b.data, &c.data, p.b_shr, p.c_shr);
    }

    /// `self <- b - c`.
    pub fn sub(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::add_sub(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::sub(&mut self.data, &b.data, &c.data, p.b_shr, p.c_shr);
    }

    /// `self <- b + c` for a scalar `c`.
    pub fn add_scalar(&mut self, b: &Self, c: FloatS16) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::add_sub(b.exp, c.exp, b.hr, headroom16(c.mant));
        let c_mant = ashr16(c.mant, p.c_shr);
        self.exp = p.exp;
        self.hr = vect::add_scalar(&mut self.data, &b.data, c_mant, p.b_shr);
    }

    /// `self <- b * c`, element-wise.
    pub fn mul(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::mul_s16(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::mul(&mut self.data, &b.data, &c.data, p.a_shr);
    }

    /// `self <- b * c` for a scalar `c`.
    pub fn scale(&mut self, b: &Self, c: FloatS16) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::mul_s16(b.exp, c.exp, b.hr, headroom16(c.mant));
        self.exp = p.exp;
        self.hr = vect::scale(&mut self.data, &b.data, c.mant, p.a_shr);
    }

    /// `self <- self + b * c`, element-wise multiply-accumulate.
    pub fn macc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::macc_s16(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::macc(&mut self.data, &b.data, &c.data, p.acc_shr, p.bc_sat);
    }

    /// `self <- self - b * c`.
    pub fn nmacc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::macc_s16(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::nmacc(&mut self.data, &b.data, &c.data, p.acc_shr, p.bc_sat);
    }

    /// `self <- |b|`, element-wise.
    pub fn abs(&mut self, b: &Self) {
        debug_assert_eq!(self.len(), b.len());
        self.exp = b.exp;
        self.hr = vect::abs(&mut self.data, &b.data);
    }

    /// `self <- max(b, 0)`, element-wise.
    pub fn rect(&mut self, b: &Self) {
        debug_assert_eq!(self.len(), b.len());
        self.exp = b.exp;
        self.hr = vect::rect(&mut self.data, &b.data);
    }

    /// Clamp `b` into `[lower, upper] * 2^bound_exp`.
    pub fn clip(&mut self, b: &Self, lower: i16, upper: i16, bound_exp: Exponent) {
        debug_assert_eq!(self.len(), b.len());
        assert!(lower <= upper);
        match prepare::clip_s16(b.exp, bound_exp, b.hr, lower, upper) {
            ClipPlan::ForceUpper { mant, exp }
            | ClipPlan::ForceLower { mant, exp }
            | ClipPlan::Collapsed { mant, exp } => {
                self.exp = exp;
                self.hr = vect::set(&mut self.data, mant);
            }
            ClipPlan::Rescale {
                exp,
                b_shr,
                lower,
                upper,
            } => {
                self.exp = exp;
                self.hr = vect::clip(&mut self.data, &b.data, lower, upper, b_shr);
            }
        }
    }

    /// `self <- sqrt(b)` element-wise, at the default precision depth.
    pub fn sqrt(&mut self, b: &Self) {
        self.sqrt_with_depth(b, SQRT_DEPTH_S16);
    }

    /// `self <- sqrt(b)` computing `depth` most-significant result bits.
    pub fn sqrt_with_depth(&mut self, b: &Self, depth: u32) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::sqrt_s16(b.exp, b.hr);
        self.exp = p.exp;
        self.hr = vect::sqrt(&mut self.data, &b.data, p.b_shr, depth);
    }

    /// `self <- 1 / b`, element-wise. A zero element is a domain error.
    pub fn inverse(&mut self, b: &Self) -> Result<()> {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::inverse_s16(&b.data, b.exp)?;
        self.exp = p.exp;
        self.hr = vect::inverse(&mut self.data, &b.data, p.scale);
        Ok(())
    }

    /// Sum of all elements.
    pub fn sum(&self) -> FloatS32 {
        FloatS32 {
            mant: vect::sum(&self.data),
            exp: self.exp,
        }
    }

    /// Sum of element magnitudes.
    pub fn abs_sum(&self) -> FloatS32 {
        FloatS32 {
            mant: vect::abs_sum(&self.data),
            exp: self.exp,
        }
    }

    /// Inner product with `c`.
    pub fn dot(&self, c: &Self) -> FloatS64 {
        debug_assert_eq!(self.len(), c.len());
        let p = prepare::dot_s16(self.exp, c.exp, self.hr, c.hr, self.len());
        FloatS64 {
            mant: vect::dot(&self.data, &c.data, p.b_shr, p.c_shr),
            exp: p.exp,
        }
    }

    /// Sum of squared elements.
    pub fn energy(&self) -> FloatS32 {
        let p = prepare::energy_s16(self.len(), self.exp, self.hr);
        FloatS32 {
            mant: vect::energy(&self.data, p.b_shr),
            exp: p.exp,
        }
    }

    /// Arithmetic mean of the elements.
    pub fn mean(&self) -> FloatS32 {
        debug_assert!(!self.is_empty());
        let sum = vect::sum(&self.data) as i64;
        let hr = headroom64(sum);
        let mean64 = (sum << hr) / self.len() as i64;
        let shr = (32 - headroom64(mean64) as i32).max(0);
        FloatS32 {
            mant: sat32(round_shr64(mean64, shr as u32)),
            exp: self.exp - hr as i32 + shr,
        }
    }

    pub fn max(&self) -> FloatS16 {
        FloatS16 {
            mant: vect::max(&self.data),
            exp: self.exp,
        }
    }

    pub fn min(&self) -> FloatS16 {
        FloatS16 {
            mant: vect::min(&self.data),
            exp: self.exp,
        }
    }

    pub fn argmax(&self) -> usize {
        vect::argmax(&self.data)
    }

    pub fn argmin(&self) -> usize {
        vect::argmin(&self.data)
    }

    /// Narrow a 32-bit vector into this 16-bit representation.
    pub fn from_s32(b: &BfpS32) -> Self {
        let b_shr = 16 - b.hr as i32;
        let mut data = alloc::vec![0i16; b.len()];
        let hr = crate::vect::s32::to_s16(&mut data, &b.data, b_shr);
        Self {
            data,
            exp: b.exp + b_shr,
            hr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bfp(data: &[i16], exp: Exponent) -> BfpS16 {
        BfpS16::new(data.to_vec(), exp)
    }

    fn value(mant: i16, exp: Exponent) -> f64 {
        mant as f64 * (exp as f64).exp2()
    }

    #[test]
    fn add_with_differing_exponents() {
        // B = [0x4000, 0x4000] at exp 0 (hr 0); C = [0x0100, 0x0100] at
        // exp +4 (hr 6). Prepare must land on exp 1 with shifts (1, -3).
        let b = bfp(&[0x4000, 0x4000], 0);
        let c = bfp(&[0x0100, 0x0100], 4);
        assert_eq!((b.hr, c.hr), (0, 6));

        let p = prepare::add_sub(b.exp, c.exp, b.hr, c.hr);
        assert_eq!((p.exp, p.b_shr, p.c_shr), (1, 1, -3));

        let mut a = bfp(&[0, 0], 0);
        a.add(&b, &c);
        assert_eq!(a.exp, 1);
        // 0x4000*2^0 + 0x0100*2^4 = 16384 + 4096 = 20480 = 0x2800 * 2^1
        for &v in &a.data {
            assert_eq!(v, 0x2800);
        }
        assert_eq!(a.hr, 1);
    }

    #[test]
    fn mul_hits_fourteen_bit_product_shift() {
        // One bit of headroom between the operands: the classic 14-bit shift.
        let b = bfp(&[0x4000], 0);
        let c = bfp(&[0x2000], 0);
        let p = prepare::mul_s16(b.exp, c.exp, b.hr, c.hr);
        assert_eq!(p.a_shr, 14);

        let mut a = bfp(&[0], 0);
        a.mul(&b, &c);
        // 0x4000 * 0x2000 = 2^27; >>14 = 2^13; value 2^13 * 2^14 = 2^27.
        assert_eq!(a.data[0], 1 << 13);
        assert_eq!(value(a.data[0], a.exp), (2f64).powi(27));
    }

    #[test]
    fn macc_exponent_identity_holds() {
        let mut acc = bfp(&[100, -200], 3);
        let b = bfp(&[0x1000, 0x2000], 0);
        let c = bfp(&[0x0800, -0x0800], 1);
        let before = acc.clone();
        let p = prepare::macc_s16(acc.exp, b.exp, c.exp, acc.hr, b.hr, c.hr);
        acc.macc(&b, &c);
        assert_eq!(acc.exp, p.exp);

        // Check one element against exact arithmetic.
        let expect = value(before.data[0], before.exp)
            + value(b.data[0], b.exp) * value(c.data[0], c.exp);
        let got = value(acc.data[0], acc.exp);
        let lsb = (acc.exp as f64).exp2();
        assert!((got - expect).abs() <= 2.0 * lsb, "{got} vs {expect}");
    }

    #[test]
    fn sum_and_mean() {
        let b = bfp(&[100, 200, 300, 400], 2);
        let s = b.sum();
        assert_eq!(s.mant, 1000);
        assert_eq!(s.exp, 2);

        let m = b.mean();
        assert!((value_32(m.mant, m.exp) - 1000.0).abs() < 0.01);
    }

    fn value_32(mant: i32, exp: Exponent) -> f64 {
        mant as f64 * (exp as f64).exp2()
    }

    #[test]
    fn dot_short_vectors() {
        let b = bfp(&[1 << 10; 4], 0);
        let c = bfp(&[1 << 10; 4], 0);
        let d = b.dot(&c);
        let got = d.mant as f64 * (d.exp as f64).exp2();
        assert_eq!(got, 4.0 * (1 << 20) as f64);
    }

    #[test]
    fn sqrt16_values() {
        let b = bfp(&[400, 900], 0);
        let mut a = bfp(&[0, 0], 0);
        a.sqrt(&b);
        assert!((value(a.data[0], a.exp) - 20.0).abs() < 0.01);
        assert!((value(a.data[1], a.exp) - 30.0).abs() < 0.01);
    }

    #[test]
    fn inverse16_round_trip() {
        let b = bfp(&[16, -128, 3], 0);
        let mut a = bfp(&[0; 3], 0);
        a.inverse(&b).unwrap();
        for k in 0..3 {
            let product = value(a.data[k], a.exp) * value(b.data[k], b.exp);
            assert!((product - 1.0).abs() < 1e-3, "{product}");
        }
    }

    #[test]
    fn clip_ordinary_case() {
        let b = bfp(&[-3200, -80, 80, 3200], 0);
        let mut a = bfp(&[0; 4], 0);
        a.clip(&b, -100, 100, 0);
        for (k, &v) in a.data.iter().enumerate() {
            let clamped = value(b.data[k], b.exp).clamp(-100.0, 100.0);
            assert_eq!(value(v, a.exp), clamped);
        }
    }
}
