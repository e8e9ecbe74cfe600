//! Kernels over interleaved complex 32-bit mantissa buffers.

use itertools::izip;
use unroll::unroll_for_loops;

use crate::scalar::s16::sat16;
use crate::scalar::s32::{ashr32, round_shr64, sat32, sat40};
use crate::types::{Complex32, Complex64, Headroom, LeftShift, RightShift};
use crate::vect::element_headroom;

#[inline]
pub(crate) fn element_hr(v: Complex32) -> Headroom {
    element_headroom(v.re).min(element_headroom(v.im))
}

/// Complex product with the fixed 30-bit rounding shift of the 32-bit path.
#[inline]
pub(crate) fn cmul_q30(b: Complex32, c: Complex32) -> Complex32 {
    let re = b.re as i64 * c.re as i64 - b.im as i64 * c.im as i64;
    let im = b.re as i64 * c.im as i64 + b.im as i64 * c.re as i64;
    Complex32 {
        re: sat32(round_shr64(re, 30)),
        im: sat32(round_shr64(im, 30)),
    }
}

/// `b * conj(c)` with the fixed 30-bit rounding shift.
#[inline]
pub(crate) fn conj_cmul_q30(b: Complex32, c: Complex32) -> Complex32 {
    let re = b.re as i64 * c.re as i64 + b.im as i64 * c.im as i64;
    let im = b.im as i64 * c.re as i64 - b.re as i64 * c.im as i64;
    Complex32 {
        re: sat32(round_shr64(re, 30)),
        im: sat32(round_shr64(im, 30)),
    }
}

#[inline]
pub(crate) fn cadd_sat(a: Complex32, b: Complex32) -> Complex32 {
    Complex32 {
        re: sat32(a.re as i64 + b.re as i64),
        im: sat32(a.im as i64 + b.im as i64),
    }
}

#[inline]
pub(crate) fn csub_sat(a: Complex32, b: Complex32) -> Complex32 {
    Complex32 {
        re: sat32(a.re as i64 - b.re as i64),
        im: sat32(a.im as i64 - b.im as i64),
    }
}

#[inline]
fn cshr(v: Complex32, shr: RightShift) -> Complex32 {
    Complex32 {
        re: ashr32(v.re, shr),
        im: ashr32(v.im, shr),
    }
}

pub fn headroom(x: &[Complex32]) -> Headroom {
    x.iter().map(|&v| element_hr(v)).min().unwrap_or(31)
}

pub fn set(a: &mut [Complex32], value: Complex32) -> Headroom {
    a.fill(value);
    element_hr(value)
}

pub fn shr(a: &mut [Complex32], b: &[Complex32], shr: RightShift) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        *a_k = cshr(b_k, shr);
    }
    headroom(a)
}

pub fn shl(a: &mut [Complex32], b: &[Complex32], shl: LeftShift) -> Headroom {
    shr(a, b, -shl)
}

pub fn shr_in_place(x: &mut [Complex32], shr: RightShift) -> Headroom {
    for x_k in x.iter_mut() {
        *x_k = cshr(*x_k, shr);
    }
    headroom(x)
}

pub fn add(
    a: &mut [Complex32],
    b: &[Complex32],
    c: &[Complex32],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert!(a.len() == b.len() && b.len() == c.len());
    for (a_k, &b_k, &c_k) in izip!(a.iter_mut(), b, c) {
        *a_k = cadd_sat(cshr(b_k, b_shr), cshr(c_k, c_shr));
    }
    headroom(a)
}

pub fn sub(
    a: &mut [Complex32],
    b: &[Complex32],
    c: &[Complex32],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert!(a.len() == b.len() && b.len() == c.len());
    for (a_k, &b_k, &c_k) in izip!(a.iter_mut(), b, c) {
        *a_k = csub_sat(cshr(b_k, b_shr), cshr(c_k, c_shr));
    }
    headroom(a)
}

/// Add a pre-shifted complex scalar to each element of `b`.
pub fn add_scalar(
    a: &mut [Complex32],
    b: &[Complex32],
    c: Complex32,
    b_shr: RightShift,
) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        *a_k = cadd_sat(cshr(b_k, b_shr), c);
    }
    headroom(a)
}

pub fn conjugate(a: &mut [Complex32], b: &[Complex32]) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        *a_k = Complex32 {
            re: b_k.re,
            im: sat32(-(b_k.im as i64)),
        };
    }
    headroom(a)
}

pub fn mul(
    a: &mut [Complex32],
    b: &[Complex32],
    c: &[Complex32],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert!(a.len() == b.len() && b.len() == c.len());
    for (a_k, &b_k, &c_k) in izip!(a.iter_mut(), b, c) {
        *a_k = cmul_q30(cshr(b_k, b_shr), cshr(c_k, c_shr));
    }
    headroom(a)
}

pub fn conj_mul(
    a: &mut [Complex32],
    b: &[Complex32],
    c: &[Complex32],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert!(a.len() == b.len() && b.len() == c.len());
    for (a_k, &b_k, &c_k) in izip!(a.iter_mut(), b, c) {
        *a_k = conj_cmul_q30(cshr(b_k, b_shr), cshr(c_k, c_shr));
    }
    headroom(a)
}

/// Multiply each complex element by the matching element of a real vector.
pub fn real_mul(
    a: &mut [Complex32],
    b: &[Complex32],
    c: &[i32],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert!(a.len() == b.len() && b.len() == c.len());
    for (a_k, &b_k, &c_k) in izip!(a.iter_mut(), b, c) {
        let b_k = cshr(b_k, b_shr);
        let c_k = ashr32(c_k, c_shr) as i64;
        *a_k = Complex32 {
            re: sat32(round_shr64(b_k.re as i64 * c_k, 30)),
            im: sat32(round_shr64(b_k.im as i64 * c_k, 30)),
        };
    }
    headroom(a)
}

/// Multiply each element by a real scalar.
pub fn real_scale(
    a: &mut [Complex32],
    b: &[Complex32],
    c: i32,
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    let c = ashr32(c, c_shr) as i64;
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        let b_k = cshr(b_k, b_shr);
        *a_k = Complex32 {
            re: sat32(round_shr64(b_k.re as i64 * c, 30)),
            im: sat32(round_shr64(b_k.im as i64 * c, 30)),
        };
    }
    headroom(a)
}

/// Multiply each element by a complex scalar.
pub fn scale(
    a: &mut [Complex32],
    b: &[Complex32],
    c: Complex32,
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    let c = cshr(c, c_shr);
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        *a_k = cmul_q30(cshr(b_k, b_shr), c);
    }
    headroom(a)
}

/// Element-wise squared magnitude into a real output vector.
pub fn squared_mag(a: &mut [i32], b: &[Complex32], b_shr: RightShift) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        let v = cshr(b_k, b_shr);
        let s = v.re as i64 * v.re as i64 + v.im as i64 * v.im as i64;
        *a_k = sat32(round_shr64(s, 30));
    }
    crate::vect::s32::headroom(a)
}

/// Element-wise magnitude into a real output vector.
pub fn mag(a: &mut [i32], b: &[Complex32], b_shr: RightShift) -> Headroom {
    debug_assert_eq!(a.len(), b.len());
    for (a_k, &b_k) in a.iter_mut().zip(b) {
        let v = cshr(b_k, b_shr);
        *a_k = crate::vect::s32::mag_element(v.re, v.im);
    }
    crate::vect::s32::headroom(a)
}

/// Component-wise sum over eight 40-bit saturating accumulator lanes.
#[unroll_for_loops]
pub fn sum(b: &[Complex32], b_shr: RightShift) -> Complex64 {
    let mut acc_re = [0i64; 8];
    let mut acc_im = [0i64; 8];
    for (i, &b_k) in b.iter().enumerate() {
        let v = cshr(b_k, b_shr);
        let lane = i & 7;
        acc_re[lane] = sat40(acc_re[lane] + v.re as i64);
        acc_im[lane] = sat40(acc_im[lane] + v.im as i64);
    }
    let mut total = Complex64 { re: 0, im: 0 };
    for lane in 0..8 {
        total.re += acc_re[lane];
        total.im += acc_im[lane];
    }
    total
}

macro_rules! complex_macc_kernel {
    ($name:ident, $product:ident, $sign:tt) => {
        pub fn $name(
            acc: &mut [Complex32],
            b: &[Complex32],
            c: &[Complex32],
            acc_shr: RightShift,
            b_shr: RightShift,
            c_shr: RightShift,
        ) -> Headroom {
            debug_assert!(acc.len() == b.len() && b.len() == c.len());
            for (a_k, &b_k, &c_k) in izip!(acc.iter_mut(), b, c) {
                let v = $product(cshr(b_k, b_shr), cshr(c_k, c_shr));
                let prev = cshr(*a_k, acc_shr);
                *a_k = Complex32 {
                    re: sat32(prev.re as i64 $sign v.re as i64),
                    im: sat32(prev.im as i64 $sign v.im as i64),
                };
            }
            headroom(acc)
        }
    };
}

complex_macc_kernel!(macc, cmul_q30, +);
complex_macc_kernel!(nmacc, cmul_q30, -);
complex_macc_kernel!(conj_macc, conj_cmul_q30, +);
complex_macc_kernel!(conj_nmacc, conj_cmul_q30, -);

/// Narrow to split 16-bit real/imaginary buffers. `b_shr` is normally `16 - b_hr`.
pub fn to_complex_s16(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b: &[Complex32],
    b_shr: RightShift,
) -> Headroom {
    debug_assert!(a_re.len() == b.len() && a_im.len() == b.len());
    for (re_k, im_k, &b_k) in izip!(a_re.iter_mut(), a_im.iter_mut(), b) {
        let v = cshr(b_k, b_shr);
        *re_k = sat16(v.re);
        *im_k = sat16(v.im);
    }
    crate::vect::s16::headroom(a_re).min(crate::vect::s16::headroom(a_im))
}
