use alloc::vec::Vec;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::bfp::{BfpS16, BfpVector};
use crate::scalar::s32::{headroom32, round_shr64, s32_inverse, s32_mul, s32_sqrt, sat32, ashr32, headroom64, s64_to_s32};
use crate::types::{
    Exponent, FloatS32, FloatS64, Headroom, LeftShift, SQRT_DEPTH_S32,
};
use crate::vect::prepare::{self, ClipPlan};
use crate::vect::s32 as vect;

/// A real-valued BFP vector with 32-bit mantissas.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BfpS32 {
    pub data: Vec<i32>,
    pub exp: Exponent,
    pub hr: Headroom,
}

impl BfpVector for BfpS32 {
    type Elem = i32;

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

impl BfpS32 {
    /// Wrap a caller-provided mantissa buffer, computing its headroom.
    pub fn new(data: Vec<i32>, exp: Exponent) -> Self {
        let hr = vect::headroom(&data);
        Self { data, exp, hr }
    }

    /// Wrap a buffer with a caller-asserted headroom. The headroom may be
    /// stale until the next library operation stores the true value.
    pub fn with_headroom(data: Vec<i32>, exp: Exponent, hr: Headroom) -> Self {
        Self { data, exp, hr }
    }

    /// Allocate a zeroed vector of the given length.
    ///
    /// The buffer reserves two extra elements so a mono FFT spectrum derived
    /// from it can be unpacked in place (see [`super::complex_s32::BfpComplexS32::fft_unpack_mono`]).
    /// Allocation failure is reported as an error, not a panic.
    pub fn try_alloc(length: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(length + 2).map_err(|_| {
            log::warn!("BFP allocation of {} elements failed", length + 2);
            anyhow!("allocation of {length} elements failed")
        })?;
        data.resize(length, 0);
        Ok(Self {
            data,
            exp: 0,
            hr: 31,
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
    pub fn set(&mut self, value: i32, exp: Exponent) {
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
    pub fn add_scalar(&mut self, b: &Self, c: FloatS32) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::add_sub(b.exp, c.exp, b.hr, headroom32(c.mant));
        let c_mant = ashr32(c.mant, p.c_shr);
        self.exp = p.exp;
        self.hr = vect::add_scalar(&mut self.data, &b.data, c_mant, p.b_shr);
    }

    /// `self <- b * c`, element-wise.
    pub fn mul(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::mul_s32(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::mul(&mut self.data, &b.data, &c.data, p.b_shr, p.c_shr);
    }

    /// `self <- b * c` for a scalar `c`.
    pub fn scale(&mut self, b: &Self, c: FloatS32) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::mul_s32(b.exp, c.exp, b.hr, headroom32(c.mant));
        self.exp = p.exp;
        self.hr = vect::scale(&mut self.data, &b.data, c.mant, p.b_shr, p.c_shr);
    }

    /// `self <- self + b * c`, element-wise multiply-accumulate.
    pub fn macc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::macc_s32(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::macc(&mut self.data, &b.data, &c.data, p.acc_shr, p.b_shr, p.c_shr);
    }

    /// `self <- self - b * c`.
    pub fn nmacc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::macc_s32(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::nmacc(&mut self.data, &b.data, &c.data, p.acc_shr, p.b_shr, p.c_shr);
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
    pub fn clip(&mut self, b: &Self, lower: i32, upper: i32, bound_exp: Exponent) {
        debug_assert_eq!(self.len(), b.len());
        assert!(lower <= upper);
        match prepare::clip_s32(b.exp, bound_exp, b.hr, lower, upper) {
            ClipPlan::ForceUpper { mant, exp } | ClipPlan::ForceLower { mant, exp } => {
                self.exp = exp;
                self.hr = vect::set(&mut self.data, mant);
            }
            ClipPlan::Collapsed { mant, exp } => {
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
        self.sqrt_with_depth(b, SQRT_DEPTH_S32);
    }

    /// `self <- sqrt(b)` computing `depth` most-significant result bits.
    pub fn sqrt_with_depth(&mut self, b: &Self, depth: u32) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::sqrt_s32(b.exp, b.hr);
        self.exp = p.exp;
        self.hr = vect::sqrt(&mut self.data, &b.data, p.b_shr, depth);
    }

    /// `self <- 1 / b`, element-wise. A zero element is a domain error.
    pub fn inverse(&mut self, b: &Self) -> Result<()> {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::inverse_s32(&b.data, b.exp)?;
        self.exp = p.exp;
        self.hr = vect::inverse(&mut self.data, &b.data, p.scale);
        Ok(())
    }

    /// Sum of all elements.
    pub fn sum(&self) -> FloatS64 {
        FloatS64 {
            mant: vect::sum(&self.data),
            exp: self.exp,
        }
    }

    /// Sum of element magnitudes.
    pub fn abs_sum(&self) -> FloatS64 {
        FloatS64 {
            mant: vect::abs_sum(&self.data),
            exp: self.exp,
        }
    }

    /// Inner product with `c`.
    pub fn dot(&self, c: &Self) -> FloatS64 {
        debug_assert_eq!(self.len(), c.len());
        let p = prepare::dot_s32(self.exp, c.exp, self.hr, c.hr, self.len());
        FloatS64 {
            mant: vect::dot(&self.data, &c.data, p.b_shr, p.c_shr),
            exp: p.exp,
        }
    }

    /// Sum of squared elements.
    pub fn energy(&self) -> FloatS64 {
        let p = prepare::energy_s32(self.len(), self.exp, self.hr);
        FloatS64 {
            mant: vect::energy(&self.data, p.b_shr),
            exp: p.exp,
        }
    }

    /// Arithmetic mean of the elements.
    pub fn mean(&self) -> FloatS32 {
        debug_assert!(!self.is_empty());
        let sum = vect::sum(&self.data);
        let hr = headroom64(sum);
        let mean64 = (sum << hr) / self.len() as i64;
        let shr = (32 - headroom64(mean64) as i32).max(0);
        FloatS32 {
            mant: sat32(round_shr64(mean64, shr as u32)),
            exp: self.exp - hr as i32 + shr,
        }
    }

    /// Root-mean-square of the elements.
    pub fn rms(&self) -> FloatS32 {
        debug_assert!(!self.is_empty());
        let energy = self.energy();
        let e32 = s64_to_s32(energy.mant, energy.exp);
        let len_inv = s32_inverse(self.len() as i32);
        let mean_energy = s32_mul(e32.mant, len_inv.mant, e32.exp, len_inv.exp);
        s32_sqrt(mean_energy.mant, mean_energy.exp, SQRT_DEPTH_S32)
    }

    pub fn max(&self) -> FloatS32 {
        FloatS32 {
            mant: vect::max(&self.data),
            exp: self.exp,
        }
    }

    pub fn min(&self) -> FloatS32 {
        FloatS32 {
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

    /// Widen a 16-bit vector into this 32-bit vector.
    pub fn from_s16(b: &BfpS16) -> Self {
        let mut data = alloc::vec![0i32; b.len()];
        let hr = crate::vect::s16::to_s32(&mut data, &b.data);
        Self {
            data,
            exp: b.exp - 8,
            hr,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::testing::rand_vec_i32;
    use crate::types::SAT32_MAX;

    fn bfp(data: &[i32], exp: Exponent) -> BfpS32 {
        BfpS32::new(data.to_vec(), exp)
    }

    fn value(mant: i32, exp: Exponent) -> f64 {
        mant as f64 * (exp as f64).exp2()
    }

    #[test]
    fn element_wise_multiply_tight_exponent() {
        // 32-bit multiply: hr 0 x hr 1 keeps the full product precision.
        let b = bfp(&[0x4000_0000], 0);
        let c = bfp(&[0x2000_0000], 0);
        assert_eq!((b.hr, c.hr), (0, 1));

        let mut a = bfp(&[0], 0);
        a.mul(&b, &c);
        assert_eq!(a.data[0], 0x2000_0000);
        assert_eq!(a.exp, 30);
        // b*c = 2^30 * 2^29 = 2^59 == mant * 2^exp
        assert_eq!(value(a.data[0], a.exp), (2f64).powi(59));
    }

    #[test]
    #[allow(arithmetic_overflow)]
    fn saturating_add_never_wraps() {
        let b = bfp(&[SAT32_MAX - 1], 0);
        let c = bfp(&[3], 0);
        let mut a = bfp(&[0], 0);
        a.add(&b, &c);
        // Prepare reserves a carry bit, so no saturation here; the value is
        // exact at the prepared exponent.
        assert_eq!(a.exp, 1);
        assert_eq!(a.data[0], (SAT32_MAX - 1 + 3) / 2);
    }

    #[test]
    fn zero_headroom_operands_get_headroom_in_output() {
        let b = bfp(&[SAT32_MAX], 0);
        let c = bfp(&[SAT32_MAX], 0);
        let mut a = bfp(&[0], 0);
        a.add(&b, &c);
        assert!(a.hr >= 1 || a.data[0] < SAT32_MAX);
        assert_eq!(value(a.data[0], a.exp), 2.0 * SAT32_MAX as f64);
    }

    #[test]
    fn headroom_invariant_after_ops() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xCAFE);
        let b = BfpS32::new(rand_vec_i32(&mut rng, 64, 3), -2);
        let c = BfpS32::new(rand_vec_i32(&mut rng, 64, 1), 4);
        let mut a = BfpS32::try_alloc(64).unwrap();

        a.add(&b, &c);
        assert_eq!(a.hr, vect::headroom(&a.data));
        a.mul(&b, &c);
        assert_eq!(a.hr, vect::headroom(&a.data));
        a.macc(&b, &c);
        assert_eq!(a.hr, vect::headroom(&a.data));
        a.abs(&b);
        assert_eq!(a.hr, vect::headroom(&a.data));
    }

    #[test]
    fn add_exponent_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xD00D);
        let b = BfpS32::new(rand_vec_i32(&mut rng, 32, 2), 3);
        let c = BfpS32::new(rand_vec_i32(&mut rng, 32, 5), -1);
        let p = prepare::add_sub(b.exp, c.exp, b.hr, c.hr);
        assert_eq!(b.exp + p.b_shr, p.exp);
        assert_eq!(c.exp + p.c_shr, p.exp);

        let mut a = BfpS32::try_alloc(32).unwrap();
        a.add(&b, &c);
        assert_eq!(a.exp, p.exp);
    }

    #[test]
    fn use_exponent_is_reversible_and_noop_on_same_exp() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x11);
        // Clear the low bits so the rescale down and back is lossless.
        let data: alloc::vec::Vec<i32> = rand_vec_i32(&mut rng, 16, 8)
            .into_iter()
            .map(|v| v & !0xFF)
            .collect();
        let mut v = BfpS32::new(data, 2);
        let original = v.clone();

        v.use_exponent(2);
        assert_eq!(v, original);

        v.use_exponent(5);
        assert_eq!(v.exp, 5);
        v.use_exponent(2);
        assert_eq!(v.data, original.data);
    }

    #[test]
    fn abs_is_idempotent() {
        let b = bfp(&[-5, 3, i32::MIN, 0], 0);
        let mut a1 = bfp(&[0; 4], 0);
        a1.abs(&b);
        let mut a2 = bfp(&[0; 4], 0);
        a2.abs(&a1.clone());
        assert_eq!(a1, a2);
    }

    #[test]
    fn clip_force_cases_set_constant_output() {
        // Negative upper bound above the input's exponent range: every
        // element is forced to the upper bound.
        let b = bfp(&[1 << 20, 1 << 24], -40);
        let mut a = bfp(&[0, 0], 0);
        a.clip(&b, -200, -100, 0);
        assert_eq!(a.exp, 0);
        for &v in &a.data {
            assert_eq!(v, -100);
        }
    }

    #[test]
    fn sqrt_of_squares() {
        let b = bfp(&[16 << 20, 25 << 20], 0);
        let mut a = bfp(&[0, 0], 0);
        a.sqrt(&b);
        let r0 = value(a.data[0], a.exp);
        let r1 = value(a.data[1], a.exp);
        assert!((r0 - 4096.0).abs() < 0.01, "{r0}");
        assert!((r1 - 5120.0).abs() < 0.01, "{r1}");
    }

    #[test]
    fn inverse_roundtrip() {
        let b = bfp(&[1 << 10, -(1 << 12), 3 << 8], 0);
        let mut a = bfp(&[0; 3], 0);
        a.inverse(&b).unwrap();
        for k in 0..3 {
            let product = value(a.data[k], a.exp) * value(b.data[k], b.exp);
            assert!((product - 1.0).abs() < 1e-6, "{product}");
        }

        let zero = bfp(&[1, 0, 2], 0);
        assert!(a.inverse(&zero).is_err());
    }

    #[test]
    fn mean_and_rms() {
        let b = bfp(&[1000, 3000, 5000, 7000], 0);
        let mean = b.mean();
        assert!((value(mean.mant, mean.exp) - 4000.0).abs() < 0.01);

        let rms = b.rms();
        let expected = ((1000f64.powi(2) + 3000f64.powi(2) + 5000f64.powi(2) + 7000f64.powi(2))
            / 4.0)
            .sqrt();
        let got = value(rms.mant, rms.exp);
        assert!((got - expected).abs() / expected < 1e-4, "{got} vs {expected}");
    }

    #[test]
    fn dot_and_energy_agree_on_self() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x1DEA);
        let b = BfpS32::new(rand_vec_i32(&mut rng, 128, 4), -3);
        let d = b.dot(&b);
        let e = b.energy();
        let dv = d.mant as f64 * (d.exp as f64).exp2();
        let ev = e.mant as f64 * (e.exp as f64).exp2();
        assert!((dv - ev).abs() <= (dv.abs() * 1e-6).max(1.0), "{dv} vs {ev}");
    }

    #[test]
    fn depth_conversion_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x77);
        let b = BfpS32::new(rand_vec_i32(&mut rng, 32, 1), 0);
        let narrowed = BfpS16::from_s32(&b);
        let widened = BfpS32::from_s16(&narrowed);
        for k in 0..32 {
            let orig = value(b.data[k], b.exp);
            let back = value(widened.data[k], widened.exp);
            // One LSb of the 16-bit representation at the narrowed exponent.
            assert!((orig - back).abs() <= (widened.exp as f64).exp2() * 256.0);
        }
    }

    #[test]
    fn alloc_reserves_unpack_space() {
        let v = BfpS32::try_alloc(64).unwrap();
        assert_eq!(v.len(), 64);
        assert!(v.data.capacity() >= 66);
        assert_eq!(v.hr, 31);
    }
}
