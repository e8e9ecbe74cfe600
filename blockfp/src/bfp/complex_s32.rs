use alloc::vec::Vec;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::bfp::{BfpComplexS16, BfpS32, BfpVector};
use crate::scalar::s32::{ashr32, headroom32};
use crate::types::{
    complex_as_words, Complex32, Exponent, FloatComplexS32, FloatComplexS64, FloatS32, FloatS64,
    Headroom, LeftShift,
};
use crate::vect::complex_s32 as vect;
use crate::vect::prepare;

/// A complex-valued BFP vector with interleaved 32-bit mantissa pairs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BfpComplexS32 {
    pub data: Vec<Complex32>,
    pub exp: Exponent,
    pub hr: Headroom,
}

impl BfpVector for BfpComplexS32 {
    type Elem = Complex32;

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

impl BfpComplexS32 {
    /// Wrap a caller-provided mantissa buffer, computing its headroom.
    pub fn new(data: Vec<Complex32>, exp: Exponent) -> Self {
        let hr = vect::headroom(&data);
        Self { data, exp, hr }
    }

    /// Wrap a buffer with a caller-asserted headroom.
    pub fn with_headroom(data: Vec<Complex32>, exp: Exponent, hr: Headroom) -> Self {
        Self { data, exp, hr }
    }

    /// Allocate a zeroed vector of the given length, reserving one extra
    /// element for the mono-FFT Nyquist unpack.
    pub fn try_alloc(length: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(length + 1).map_err(|_| {
            log::warn!("BFP allocation of {} complex elements failed", length + 1);
            anyhow!("allocation of {length} complex elements failed")
        })?;
        data.resize(length, Complex32::default());
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
    pub fn set(&mut self, value: Complex32, exp: Exponent) {
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

    /// `self <- b + c` for a complex scalar `c`.
    pub fn add_scalar(&mut self, b: &Self, c: FloatComplexS32) {
        debug_assert_eq!(self.len(), b.len());
        let c_hr = headroom32(c.mant.re).min(headroom32(c.mant.im));
        let p = prepare::add_sub(b.exp, c.exp, b.hr, c_hr);
        let c_mant = Complex32 {
            re: ashr32(c.mant.re, p.c_shr),
            im: ashr32(c.mant.im, p.c_shr),
        };
        self.exp = p.exp;
        self.hr = vect::add_scalar(&mut self.data, &b.data, c_mant, p.b_shr);
    }

    /// `self <- conj(b)`.
    pub fn conjugate(&mut self, b: &Self) {
        debug_assert_eq!(self.len(), b.len());
        self.exp = b.exp;
        self.hr = vect::conjugate(&mut self.data, &b.data);
    }

    /// `self <- b * c`, element-wise complex multiply.
    pub fn mul(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_mul_s32(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::mul(&mut self.data, &b.data, &c.data, p.b_shr, p.c_shr);
    }

    /// `self <- b * conj(c)`, element-wise.
    pub fn conj_mul(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_mul_s32(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::conj_mul(&mut self.data, &b.data, &c.data, p.b_shr, p.c_shr);
    }

    /// `self <- b * c` for a real vector `c`.
    pub fn real_mul(&mut self, b: &Self, c: &BfpS32) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::mul_s32(b.exp, c.exp, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::real_mul(&mut self.data, &b.data, &c.data, p.b_shr, p.c_shr);
    }

    /// `self <- b * c` for a real scalar `c`.
    pub fn real_scale(&mut self, b: &Self, c: FloatS32) {
        debug_assert_eq!(self.len(), b.len());
        let p = prepare::mul_s32(b.exp, c.exp, b.hr, headroom32(c.mant));
        self.exp = p.exp;
        self.hr = vect::real_scale(&mut self.data, &b.data, c.mant, p.b_shr, p.c_shr);
    }

    /// `self <- b * c` for a complex scalar `c`.
    pub fn scale(&mut self, b: &Self, c: FloatComplexS32) {
        debug_assert_eq!(self.len(), b.len());
        let c_hr = headroom32(c.mant.re).min(headroom32(c.mant.im));
        let p = prepare::complex_mul_s32(b.exp, c.exp, b.hr, c_hr);
        self.exp = p.exp;
        self.hr = vect::scale(&mut self.data, &b.data, c.mant, p.b_shr, p.c_shr);
    }

    /// `self <- self + b * c`.
    pub fn macc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s32(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::macc(&mut self.data, &b.data, &c.data, p.acc_shr, p.b_shr, p.c_shr);
    }

    /// `self <- self - b * c`.
    pub fn nmacc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s32(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::nmacc(&mut self.data, &b.data, &c.data, p.acc_shr, p.b_shr, p.c_shr);
    }

    /// `self <- self + b * conj(c)`.
    pub fn conj_macc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s32(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::conj_macc(&mut self.data, &b.data, &c.data, p.acc_shr, p.b_shr, p.c_shr);
    }

    /// `self <- self - b * conj(c)`.
    pub fn conj_nmacc(&mut self, b: &Self, c: &Self) {
        debug_assert!(self.len() == b.len() && b.len() == c.len());
        let p = prepare::complex_macc_s32(self.exp, b.exp, c.exp, self.hr, b.hr, c.hr);
        self.exp = p.exp;
        self.hr = vect::conj_nmacc(&mut self.data, &b.data, &c.data, p.acc_shr, p.b_shr, p.c_shr);
    }

    /// Write `|b[k]|^2` into a real output vector.
    pub fn squared_mag(&self, a: &mut BfpS32) {
        debug_assert_eq!(self.len(), a.len());
        let p = prepare::squared_mag_s32(self.exp, self.hr);
        a.exp = p.exp;
        a.hr = vect::squared_mag(&mut a.data, &self.data, p.b_shr);
    }

    /// Write `|b[k]|` into a real output vector.
    pub fn mag(&self, a: &mut BfpS32) {
        debug_assert_eq!(self.len(), a.len());
        let p = prepare::mag_s32(self.exp, self.hr);
        a.exp = p.exp;
        a.hr = vect::mag(&mut a.data, &self.data, p.b_shr);
    }

    /// Component-wise sum of all elements.
    pub fn sum(&self) -> FloatComplexS64 {
        let p = prepare::complex_sum_s32(self.exp, self.hr, self.len());
        FloatComplexS64 {
            mant: vect::sum(&self.data, p.b_shr),
            exp: p.exp,
        }
    }

    /// Energy: the sum of squared real and imaginary components.
    pub fn energy(&self) -> FloatS64 {
        let words = complex_as_words(&self.data);
        let p = prepare::energy_s32(words.len(), self.exp, self.hr);
        FloatS64 {
            mant: crate::vect::s32::energy(words, p.b_shr),
            exp: p.exp,
        }
    }

    /// Narrow a complex 32-bit vector into split 16-bit buffers.
    pub fn to_complex_s16(&self) -> BfpComplexS16 {
        let b_shr = 16 - self.hr as i32;
        let mut re = alloc::vec![0i16; self.len()];
        let mut im = alloc::vec![0i16; self.len()];
        let hr = vect::to_complex_s16(&mut re, &mut im, &self.data, b_shr);
        BfpComplexS16 {
            re,
            im,
            exp: self.exp + b_shr,
            hr,
        }
    }
}
