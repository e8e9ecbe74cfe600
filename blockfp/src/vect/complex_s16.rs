//! Kernels over complex 16-bit mantissa buffers.
//!
//! Real and imaginary parts live in two separate buffers (the layout the
//! original SIMD paths require); every kernel takes the pair explicitly.

use itertools::izip;
use unroll::unroll_for_loops;

use crate::scalar::s16::{ashr16, round_shr32, sat16};
use crate::scalar::s32::{isqrt64, round_shr64, sat32};
use crate::types::{Complex16, Complex32, Headroom, LeftShift, RightShift};
use crate::vect::buffer_headroom;

pub fn headroom(re: &[i16], im: &[i16]) -> Headroom {
    buffer_headroom(re).min(buffer_headroom(im))
}

pub fn set(a_re: &mut [i16], a_im: &mut [i16], value: Complex16) -> Headroom {
    a_re.fill(value.re);
    a_im.fill(value.im);
    crate::scalar::s16::headroom16(value.re).min(crate::scalar::s16::headroom16(value.im))
}

pub fn shr(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    shr: RightShift,
) -> Headroom {
    crate::vect::s16::shr(a_re, b_re, shr).min(crate::vect::s16::shr(a_im, b_im, shr))
}

pub fn shl(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    shl: LeftShift,
) -> Headroom {
    shr(a_re, a_im, b_re, b_im, -shl)
}

pub fn shr_in_place(re: &mut [i16], im: &mut [i16], shr: RightShift) -> Headroom {
    crate::vect::s16::shr_in_place(re, shr).min(crate::vect::s16::shr_in_place(im, shr))
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c_re: &[i16],
    c_im: &[i16],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    crate::vect::s16::add(a_re, b_re, c_re, b_shr, c_shr)
        .min(crate::vect::s16::add(a_im, b_im, c_im, b_shr, c_shr))
}

#[allow(clippy::too_many_arguments)]
pub fn sub(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c_re: &[i16],
    c_im: &[i16],
    b_shr: RightShift,
    c_shr: RightShift,
) -> Headroom {
    crate::vect::s16::sub(a_re, b_re, c_re, b_shr, c_shr)
        .min(crate::vect::s16::sub(a_im, b_im, c_im, b_shr, c_shr))
}

/// Add a pre-shifted complex scalar to each element.
pub fn add_scalar(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c: Complex16,
    b_shr: RightShift,
) -> Headroom {
    crate::vect::s16::add_scalar(a_re, b_re, c.re, b_shr)
        .min(crate::vect::s16::add_scalar(a_im, b_im, c.im, b_shr))
}

pub fn conjugate(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
) -> Headroom {
    a_re.copy_from_slice(b_re);
    for (a_k, &b_k) in a_im.iter_mut().zip(b_im) {
        *a_k = sat16(-(b_k as i32));
    }
    headroom(a_re, a_im)
}

/// Element-wise complex product with a single rounding shift on the 32-bit
/// intermediate products.
#[allow(clippy::too_many_arguments)]
pub fn mul(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c_re: &[i16],
    c_im: &[i16],
    a_shr: RightShift,
) -> Headroom {
    debug_assert!(a_shr >= 0);
    for (ar, ai, &br, &bi, &cr, &ci) in izip!(
        a_re.iter_mut(),
        a_im.iter_mut(),
        b_re,
        b_im,
        c_re,
        c_im
    ) {
        // Two-product sums want 33 bits at full scale.
        let re = br as i64 * cr as i64 - bi as i64 * ci as i64;
        let im = br as i64 * ci as i64 + bi as i64 * cr as i64;
        *ar = sat16_64(round_shr64(re, a_shr as u32));
        *ai = sat16_64(round_shr64(im, a_shr as u32));
    }
    headroom(a_re, a_im)
}

#[inline]
fn sat16_64(x: i64) -> i16 {
    use crate::types::{SAT16_MAX, SAT16_MIN};
    if x > SAT16_MAX as i64 {
        SAT16_MAX
    } else if x < SAT16_MIN as i64 {
        SAT16_MIN
    } else {
        x as i16
    }
}

#[allow(clippy::too_many_arguments)]
pub fn conj_mul(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c_re: &[i16],
    c_im: &[i16],
    a_shr: RightShift,
) -> Headroom {
    debug_assert!(a_shr >= 0);
    for (ar, ai, &br, &bi, &cr, &ci) in izip!(
        a_re.iter_mut(),
        a_im.iter_mut(),
        b_re,
        b_im,
        c_re,
        c_im
    ) {
        let re = br as i64 * cr as i64 + bi as i64 * ci as i64;
        let im = bi as i64 * cr as i64 - br as i64 * ci as i64;
        *ar = sat16_64(round_shr64(re, a_shr as u32));
        *ai = sat16_64(round_shr64(im, a_shr as u32));
    }
    headroom(a_re, a_im)
}

/// Multiply each complex element by the matching element of a real vector.
#[allow(clippy::too_many_arguments)]
pub fn real_mul(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c: &[i16],
    a_shr: RightShift,
) -> Headroom {
    debug_assert!(a_shr >= 0);
    for (ar, ai, &br, &bi, &c_k) in izip!(a_re.iter_mut(), a_im.iter_mut(), b_re, b_im, c) {
        *ar = sat16(round_shr32(br as i32 * c_k as i32, a_shr as u32));
        *ai = sat16(round_shr32(bi as i32 * c_k as i32, a_shr as u32));
    }
    headroom(a_re, a_im)
}

/// Multiply each element by a real scalar.
pub fn real_scale(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c: i16,
    a_shr: RightShift,
) -> Headroom {
    crate::vect::s16::scale(a_re, b_re, c, a_shr)
        .min(crate::vect::s16::scale(a_im, b_im, c, a_shr))
}

/// Multiply each element by a complex scalar.
#[allow(clippy::too_many_arguments)]
pub fn scale(
    a_re: &mut [i16],
    a_im: &mut [i16],
    b_re: &[i16],
    b_im: &[i16],
    c: Complex16,
    a_shr: RightShift,
) -> Headroom {
    debug_assert!(a_shr >= 0);
    for (ar, ai, &br, &bi) in izip!(a_re.iter_mut(), a_im.iter_mut(), b_re, b_im) {
        let re = br as i64 * c.re as i64 - bi as i64 * c.im as i64;
        let im = br as i64 * c.im as i64 + bi as i64 * c.re as i64;
        *ar = sat16_64(round_shr64(re, a_shr as u32));
        *ai = sat16_64(round_shr64(im, a_shr as u32));
    }
    headroom(a_re, a_im)
}

/// Element-wise squared magnitude with a single output shift.
pub fn squared_mag(a: &mut [i16], b_re: &[i16], b_im: &[i16], a_shr: RightShift) -> Headroom {
    debug_assert!(a_shr >= 0);
    for (a_k, &br, &bi) in izip!(a.iter_mut(), b_re, b_im) {
        let s = br as i64 * br as i64 + bi as i64 * bi as i64;
        *a_k = sat16_64(round_shr64(s, a_shr as u32));
    }
    buffer_headroom(a)
}

/// Element-wise magnitude of input shifted by `b_shr`.
pub fn mag(a: &mut [i16], b_re: &[i16], b_im: &[i16], b_shr: RightShift) -> Headroom {
    for (a_k, &br, &bi) in izip!(a.iter_mut(), b_re, b_im) {
        let re = ashr16(br, b_shr) as i64;
        let im = ashr16(bi, b_shr) as i64;
        *a_k = isqrt64(re * re + im * im) as i16;
    }
    buffer_headroom(a)
}

/// Component-wise sum into 32-bit saturating accumulators.
#[unroll_for_loops]
pub fn sum(b_re: &[i16], b_im: &[i16]) -> Complex32 {
    debug_assert_eq!(b_re.len(), b_im.len());
    let mut acc_re = [0i32; 16];
    let mut acc_im = [0i32; 16];
    for (i, (&re_k, &im_k)) in b_re.iter().zip(b_im).enumerate() {
        let lane = i & 15;
        acc_re[lane] = sat32(acc_re[lane] as i64 + re_k as i64);
        acc_im[lane] = sat32(acc_im[lane] as i64 + im_k as i64);
    }
    let mut re = 0i64;
    let mut im = 0i64;
    for lane in 0..16 {
        re += acc_re[lane] as i64;
        im += acc_im[lane] as i64;
    }
    Complex32 {
        re: sat32(re),
        im: sat32(im),
    }
}

macro_rules! complex_s16_macc_kernel {
    ($name:ident, $conj:expr, $sign:tt) => {
        #[allow(clippy::too_many_arguments)]
        pub fn $name(
            acc_re: &mut [i16],
            acc_im: &mut [i16],
            b_re: &[i16],
            b_im: &[i16],
            c_re: &[i16],
            c_im: &[i16],
            acc_shr: RightShift,
            bc_sat: RightShift,
        ) -> Headroom {
            debug_assert!(bc_sat >= 0);
            for (ar, ai, &br, &bi, &cr, &ci) in izip!(
                acc_re.iter_mut(),
                acc_im.iter_mut(),
                b_re,
                b_im,
                c_re,
                c_im
            ) {
                let (re, im) = if $conj {
                    (
                        br as i64 * cr as i64 + bi as i64 * ci as i64,
                        bi as i64 * cr as i64 - br as i64 * ci as i64,
                    )
                } else {
                    (
                        br as i64 * cr as i64 - bi as i64 * ci as i64,
                        br as i64 * ci as i64 + bi as i64 * cr as i64,
                    )
                };
                let v_re = sat16_64(round_shr64(re, bc_sat as u32));
                let v_im = sat16_64(round_shr64(im, bc_sat as u32));
                *ar = sat16(ashr16(*ar, acc_shr) as i32 $sign v_re as i32);
                *ai = sat16(ashr16(*ai, acc_shr) as i32 $sign v_im as i32);
            }
            headroom(acc_re, acc_im)
        }
    };
}

complex_s16_macc_kernel!(macc, false, +);
complex_s16_macc_kernel!(nmacc, false, -);
complex_s16_macc_kernel!(conj_macc, true, +);
complex_s16_macc_kernel!(conj_nmacc, true, -);

/// Widen to interleaved 32-bit complex mantissas; mantissas shift up 8 bits.
pub fn to_complex_s32(a: &mut [Complex32], b_re: &[i16], b_im: &[i16]) -> Headroom {
    debug_assert!(a.len() == b_re.len() && a.len() == b_im.len());
    for (a_k, &re_k, &im_k) in izip!(a.iter_mut(), b_re, b_im) {
        *a_k = Complex32 {
            re: (re_k as i32) << 8,
            im: (im_k as i32) << 8,
        };
    }
    crate::vect::complex_s32::headroom(a)
}
