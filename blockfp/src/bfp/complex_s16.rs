use alloc::vec::Vec;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::bfp::{BfpComplexS32, BfpS16, BfpVector};
use crate::scalar::s16::{ashr16, headroom16};
use crate::types::{Complex16, Complex32, Exponent, FloatComplexS32, FloatS16, Headroom, LeftShift};
use crate::vect::complex_s16 as vect;
use crate::vect::prepare;

/// A complex-valued BFP vector with 16-bit mantissas, real and imaginary
/// parts in two separate buffers.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BfpComplexS16 {
    pub re: Vec<i16>,
    pub im: Vec<i16>,
    pub exp: Exponent,
    pub hr: Headroom,
}

impl BfpVector for BfpComplexS16 {
    type Elem = Complex16;

    fn len(&self) -> usize {
        self.re.len()
    }
    fn exp(&self) -> Exponent {
        self.exp
    }
    fn hr(&self) -> Headroom {
        self.hr
    }
}

/// A complex scalar paired with the 16-bit vector's exponent convention.
pub type FloatComplexS16 = (Complex16, Exponent);

impl BfpComplexS16 {
    /// Wrap caller-provided real/imaginary buffers, computing the headroom.
    pub fn new(re: Vec<i16>, im: Vec<i16>, exp: Exponent) -> Self {
        assert_eq!(re.len(), im.len());
        let hr = vect::headroom(&re, &im);
        Self { re, im, exp, hr }
    }

    /// Allocate zeroed real/imaginary buffers of the given length.
    pub fn try_alloc(length: usize) -> Result<Self> {
        let mut re = Vec::new();
        let mut im = Vec::new();
        re.try_reserve_exact(length)
            .and_then(|_| im.try_reserve_exact(length))
            .map_err(|_| {
                log::warn!("BFP allocation of {length} complex elements failed");
                anyhow!("allocation of {length} complex elements failed")
            })?;
        re.resize(length, 0);
        im.resize(length, 0);
        Ok(Self {
            re,
            im,
            exp: 0,
            hr: 15,
        })
    }

    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    /// Recompute (and store) the vector's headroom.
    pub fn headroom(&mut self) -> Headroom {
        self.hr = vect::headroom(&self.re, &self.im);
        self.hr
    }

    /// Force the vector onto a caller-chosen exponent, rescaling mantissas.
    pub fn use_exponent(&mut self, exp: Exponent) {
        let delta = exp - self.exp;
        if delta == 0 {
            return;
        }
        self.hr = vect::shr_in_place(&mut self.re, &mut self.im, delta);
        self.exp = exp;
    }

    /// `self <- b * 2^shl`, keeping the exponent.
    pub fn shl(&mut self, b: &Self, shl: LeftShift) {
        debug_assert_eq!(self.len(), b.len());
        self.exp = b.exp;
        self.hr = vect::shl(&mut self.re, &mut self.im, &b.re, &b.im, shl);
    }

    /// Set every element to `value * 2^exp`.
    pub fn set(&mut self, value: Complex16, exp: Exponent) {
        self.exp = exp;
        self.hr = vect::set(&mut self.re, &mut self.im, value);
    }

    /// `self <- b + c`.
    pub fn add(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::add_sub(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::add(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.b_shr, p.c_shr,
        );
    }

    /// `self <- b - c`.
    pub fn sub(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::add_sub(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::sub(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.b_shr, p.c_shr,
        );
    }

    /// `self <- b + c` for a complex scalar `c = (mant, exp)`.
    pub fn add_scalar(&mut self, b: &Self, c: FloatComplexS16) {
        debug_assert_eq!(self.len(), b.len());
        let (c_mant, c_exp) = c;
        let c_hr = headroom16(c_mant.re).min(headroom16(c_mant.im));
        let p = prepare::add_sub(b.exp, c_exp, b.hr, c_hr);
        let shifted = Complex16 {
            re: ashr16(c_mant.re, p.c_shr),
            im: ashr16(c_mant.im, p.c_shr),
        };
        self.exp = p.exp;
        self.hr = vect::add_scalar(&mut self.re, &mut self.im, &b.re, &b.im, shifted, p.b_shr);
    }

    /// `self <- conj(b)`.
    pub fn conjugate(&mut self, b: &Self) {
        debug_assert_eq!(self.len(), b.len());
        self.exp = b.exp;
        self.hr = vect::conjugate(&mut self.re, &mut self.im, &b.re, &b.im);
    }

    /// `self <- b * c`, element-wise complex multiply.
    pub fn mul(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_mul_s16(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::mul(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.a_shr,
        );
    }

    /// `self <- b * conj(c)`, element-wise.
    pub fn conj_mul(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_mul_s16(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::conj_mul(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.a_shr,
        );
    }

    /// `self <- b * c` for a real vector `c`.
    pub fn real_mul(&mut self, b: &Self, c: &BfpS16) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::mul_s16(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::real_mul(&mut self.re, &mut self.im, &b.re, &b.im, &c.data, p.a_shr);
    }

    /// `self <- b * c` for a real scalar `c`.
    pub fn real_scale(&mut self, b: &Self, c: FloatS16) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::mul_s16(b.exp, c.exp, b.hr, headroom16(c.mant));
        self.exp = p.exp;
        self.hr = vect::real_scale(&mut self.re, &mut self.im, &b.re, &b.im, c.mant, p.a_shr);
    }

    /// `self <- b * c` for a complex scalar `c = (mant, exp)`.
    pub fn scale(&mut self, b: &Self, c: FloatComplexS16) {
        debug_assert_eq!(self.len(), b.len());
        let (c_mant, c_exp) = c;
        let c_hr = headroom16(c_mant.re).min(headroom16(c_mant.im));
        let p = prepare::complex_mul_s16(b.exp, c_exp, b.hr, c_hr);
        self.exp = p.exp;
        self.hr = vect::scale(&mut self.re, &mut self.im, &b.re, &b.im, c_mant, p.a_shr);
    }

    /// `self <- self + b * c`.
    pub fn macc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s16(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::macc(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.acc_shr, p.bc_sat,
        );
    }

    /// `self <- self - b * c`.
    pub fn nmacc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s16(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::nmacc(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.acc_shr, p.bc_sat,
        );
    }

    /// `self <- self + b * conj(c)`.
    pub fn conj_macc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s16(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::conj_macc(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.acc_shr, p.bc_sat,
        );
    }

    /// `self <- self - b * conj(c)`.
    pub fn conj_nmacc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s16(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::conj_nmacc(
            &mut self.re, &mut self.im, &b.re, &b.im, &c.re, &c.im, p.acc_shr, p.bc_sat,
        );
    }

    /// Write `|b[k]|^2` into a real output vector.
    pub fn squared_mag(&self, a: &mut BfpS16) {
        debug_assert_eq!(self.len(), a.len());
        let p = prepare::squared_mag_s16(self.exp, self.hr);
        a.exp = p.exp;
        a.hr = vect::squared_mag(&mut a.data, &self.re, &self.im, p.a_shr);
    }

    /// Write `|b[k]|` into a real output vector.
    pub fn mag(&self, a: &mut BfpS16) {
        debug_assert_eq!(self.len(), a.len());
        let p = prepare::mag_s16(self.exp, self.hr);
        a.exp = p.exp;
        a.hr = vect::mag(&mut a.data, &self.re, &self.im, p.b_shr);
    }

    /// Component-wise sum of all elements.
    pub fn sum(&self) -> FloatComplexS32 {
        FloatComplexS32 {
            mant: vect::sum(&self.re, &self.im),
            exp: self.exp,
        }
    }

    /// Widen into an interleaved complex 32-bit vector.
    pub fn to_complex_s32(&self) -> BfpComplexS32 {
        let mut data = alloc::vec![Complex32::default(); self.len()];
        let hr = vect::to_complex_s32(&mut data, &self.re, &self.im);
        BfpComplexS32 {
            data,
            exp: self.exp - 8,
            hr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(mant: i16, exp: Exponent) -> f64 {
        mant as f64 * (exp as f64).exp2()
    }

    #[test]
    fn mul_preserves_value() {
        let b = BfpComplexS16::new(alloc::vec![0x1000], alloc::vec![-0x0800], 0);
        let c = BfpComplexS16::new(alloc::vec![0x0400], alloc::vec![0x0400], 2);
        let mut a = BfpComplexS16::try_alloc(1).unwrap();
        a.mul(&b, &c);

        let (br, bi) = (value(b.re[0], b.exp), value(b.im[0], b.exp));
        let (cr, ci) = (value(c.re[0], c.exp), value(c.im[0], c.exp));
        let (ar, ai) = (value(a.re[0], a.exp), value(a.im[0], a.exp));
        let lsb = (a.exp as f64).exp2();
        assert!((ar - (br * cr - bi * ci)).abs() <= lsb);
        assert!((ai - (br * ci + bi * cr)).abs() <= lsb);
    }

    #[test]
    fn split_buffers_survive_round_trip_to_s32() {
        let b = BfpComplexS16::new(alloc::vec![100, -200], alloc::vec![300, -400], 1);
        let wide = b.to_complex_s32();
        assert_eq!(wide.data[0], Complex32::new(100 << 8, 300 << 8));
        assert_eq!(wide.exp, -7);
        let back = wide.to_complex_s16();
        for k in 0..2 {
            assert_eq!(
                value(b.re[k], b.exp),
                back.re[k] as f64 * (back.exp as f64).exp2()
            );
        }
    }

    #[test]
    fn squared_mag_16() {
        let b = BfpComplexS16::new(alloc::vec![300], alloc::vec![400], 0);
        let mut a = BfpS16::try_alloc(1).unwrap();
        b.squared_mag(&mut a);
        let got = a.data[0] as f64 * (a.exp as f64).exp2();
        assert!((got - 250_000.0).abs() / 250_000.0 < 1e-3, "{got}");
    }

    #[test]
    fn mag_16() {
        let b = BfpComplexS16::new(alloc::vec![300 << 4], alloc::vec![400 << 4], 0);
        let mut a = BfpS16::try_alloc(1).unwrap();
        b.mag(&mut a);
        let got = a.data[0] as f64 * (a.exp as f64).exp2();
        assert!((got - 8000.0).abs() <= (a.exp as f64).exp2(), "{got}");
    }

    #[test]
    fn add_reconciles_exponents() {
        let b = BfpComplexS16::new(alloc::vec![0x4000], alloc::vec![0], 0);
        let c = BfpComplexS16::new(alloc::vec![0x0100], alloc::vec![0x0100], 4);
        let mut a = BfpComplexS16::try_alloc(1).unwrap();
        a.add(&b, &c);
        let lsb = (a.exp as f64).exp2();
        let re = value(a.re[0], a.exp);
        assert!((re - (16384.0 + 4096.0)).abs() <= lsb);
    }
}
