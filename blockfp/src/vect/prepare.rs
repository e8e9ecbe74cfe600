//! Shift-selection ("prepare") routines.
//!
//! Each routine maps operand metadata (exponents, headrooms, sometimes the
//! length or the data itself) to the output exponent and the per-operand
//! shifts that keep every intermediate inside its saturation bounds while
//! losing as little precision as possible.
//!
//! Every routine here has the same adjustability property: a caller needing a
//! specific output exponent `e` may add `e - out.exp` to each input shift and
//! use `e` instead, provided `hr + shr >= 0` still holds per operand.

use anyhow::{ensure, Result};
use blockfp_util::log2_ceil;

use crate::scalar::s16::headroom16;
use crate::scalar::s32::{ashr32, headroom32};
use crate::types::{Exponent, Headroom, RightShift, SAT32_MAX, SAT32_MIN};

/// Output exponent plus one shift per input operand.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BinaryShifts {
    pub exp: Exponent,
    pub b_shr: RightShift,
    pub c_shr: RightShift,
}

/// Output exponent plus a single input shift.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnaryShift {
    pub exp: Exponent,
    pub b_shr: RightShift,
}

/// Output exponent plus a single shift applied to the wide products.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OutputShift {
    pub exp: Exponent,
    pub a_shr: RightShift,
}

/// Prepared shifts for a 32-bit multiply-accumulate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MaccShifts {
    pub exp: Exponent,
    pub acc_shr: RightShift,
    pub b_shr: RightShift,
    pub c_shr: RightShift,
}

/// Prepared shifts for a 16-bit multiply-accumulate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MaccShiftsS16 {
    pub exp: Exponent,
    pub acc_shr: RightShift,
    pub bc_sat: RightShift,
}

/// Prepared output exponent and scale for an element-wise inverse.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InverseScale {
    pub exp: Exponent,
    pub scale: u32,
}

/// Outcome of clip preparation. The degenerate variants replace the sentinel
/// bound values the kernel cannot distinguish from real bounds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClipPlan<T> {
    /// Every input is at or below the lower bound; the output is constant.
    ForceLower { mant: T, exp: Exponent },
    /// Every input is at or above the upper bound; the output is constant.
    ForceUpper { mant: T, exp: Exponent },
    /// The bounds collapse to one representable value.
    Collapsed { mant: T, exp: Exponent },
    /// General case: rescale the input and clamp to the rescaled bounds.
    Rescale {
        exp: Exponent,
        b_shr: RightShift,
        lower: T,
        upper: T,
    },
}

/// Shared addition/subtraction prepare for all widths, real and complex.
///
/// The output exponent is the smallest at which a single post-shift add
/// cannot overflow: one above the larger of the operands' minimal exponents.
pub fn add_sub(b_exp: Exponent, c_exp: Exponent, b_hr: Headroom, c_hr: Headroom) -> BinaryShifts {
    let b_min_exp = b_exp - b_hr as i32;
    let c_min_exp = c_exp - c_hr as i32;
    let exp = b_min_exp.max(c_min_exp) + 1;
    BinaryShifts {
        exp,
        b_shr: exp - b_exp,
        c_shr: exp - c_exp,
    }
}

/// 32-bit element-wise multiply / scale prepare.
///
/// Products take a fixed 30-bit shift; one extra bit of total input shift
/// beyond the headroom-cancelling shifts makes the worst-case product fit.
pub fn mul_s32(b_exp: Exponent, c_exp: Exponent, b_hr: Headroom, c_hr: Headroom) -> BinaryShifts {
    let b_shr = 1 - b_hr as i32;
    let c_shr = -(c_hr as i32);
    BinaryShifts {
        exp: b_exp + c_exp + b_shr + c_shr + 30,
        b_shr,
        c_shr,
    }
}

/// 32-bit complex multiply prepare. The two-product component sums cost one
/// bit more than the real case.
pub fn complex_mul_s32(
    b_exp: Exponent,
    c_exp: Exponent,
    b_hr: Headroom,
    c_hr: Headroom,
) -> BinaryShifts {
    let b_shr = 1 - b_hr as i32;
    let c_shr = 1 - c_hr as i32;
    BinaryShifts {
        exp: b_exp + c_exp + b_shr + c_shr + 30,
        b_shr,
        c_shr,
    }
}

/// 16-bit element-wise multiply / scale prepare: a single rounding shift on
/// the 32-bit products.
pub fn mul_s16(b_exp: Exponent, c_exp: Exponent, b_hr: Headroom, c_hr: Headroom) -> OutputShift {
    let a_shr = (15 - b_hr as i32 - c_hr as i32).max(0);
    OutputShift {
        exp: b_exp + c_exp + a_shr,
        a_shr,
    }
}

/// 16-bit complex multiply prepare.
pub fn complex_mul_s16(
    b_exp: Exponent,
    c_exp: Exponent,
    b_hr: Headroom,
    c_hr: Headroom,
) -> OutputShift {
    let a_shr = (16 - b_hr as i32 - c_hr as i32).max(0);
    OutputShift {
        exp: b_exp + c_exp + a_shr,
        a_shr,
    }
}

/// 32-bit inner-product prepare. The extra shift keeps all eight 40-bit
/// accumulator lanes inside their bounds for the given length.
pub fn dot_s32(
    b_exp: Exponent,
    c_exp: Exponent,
    b_hr: Headroom,
    c_hr: Headroom,
    length: usize,
) -> BinaryShifts {
    let extra = (log2_ceil(length) as i32 - 7).max(0);
    let t_b = extra / 2 + (extra & 1);
    let t_c = extra / 2;
    let b_shr = t_b - b_hr as i32;
    let c_shr = t_c - c_hr as i32;
    BinaryShifts {
        exp: b_exp + c_exp + b_shr + c_shr + 30,
        b_shr,
        c_shr,
    }
}

/// 16-bit inner-product prepare for the sixteen 32-bit accumulator lanes.
pub fn dot_s16(
    b_exp: Exponent,
    c_exp: Exponent,
    b_hr: Headroom,
    c_hr: Headroom,
    length: usize,
) -> BinaryShifts {
    let extra = (log2_ceil(length) as i32 - 1).max(0);
    let t_b = extra / 2 + (extra & 1);
    let t_c = extra / 2;
    let b_shr = t_b - b_hr as i32;
    let c_shr = t_c - c_hr as i32;
    BinaryShifts {
        exp: b_exp + c_exp + b_shr + c_shr,
        b_shr,
        c_shr,
    }
}

/// 32-bit energy prepare.
pub fn energy_s32(length: usize, b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let extra = (log2_ceil(length) as i32 - 7).max(0);
    let b_shr = (extra + 1) / 2 - b_hr as i32;
    UnaryShift {
        exp: 30 + 2 * (b_exp + b_shr),
        b_shr,
    }
}

/// 16-bit energy prepare.
pub fn energy_s16(length: usize, b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let extra = (log2_ceil(length) as i32 - 1).max(0);
    let b_shr = (extra + 1) / 2 - b_hr as i32;
    UnaryShift {
        exp: 2 * (b_exp + b_shr),
        b_shr,
    }
}

/// 32-bit complex component sum prepare for the 40-bit accumulator lanes.
pub fn complex_sum_s32(b_exp: Exponent, b_hr: Headroom, length: usize) -> UnaryShift {
    let b_shr = (log2_ceil(length) as i32 - 8).max(0) - b_hr as i32;
    UnaryShift {
        exp: b_exp + b_shr,
        b_shr,
    }
}

/// Square-root prepare: left-justify the input and force `b_exp + b_shr` even.
pub fn sqrt_s32(b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let mut b_shr = -(b_hr as i32);
    if (b_exp + b_shr) & 1 != 0 {
        b_shr += 1;
    }
    UnaryShift {
        exp: (b_exp + b_shr - 30) >> 1,
        b_shr,
    }
}

pub fn sqrt_s16(b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let mut b_shr = -(b_hr as i32);
    if (b_exp + b_shr) & 1 != 0 {
        b_shr += 1;
    }
    UnaryShift {
        exp: (b_exp + b_shr - 14) >> 1,
        b_shr,
    }
}

/// Inverse prepare: pick the scale from the smallest-magnitude element so the
/// largest reciprocal cannot overflow. A zero element is a domain error.
pub fn inverse_s32(b: &[i32], b_exp: Exponent) -> Result<InverseScale> {
    let mut min_mag = i32::MAX;
    for &b_k in b {
        ensure!(b_k != 0, "inverse of a vector with a zero element");
        min_mag = min_mag.min(b_k.saturating_abs());
    }
    let scale = (60 - headroom32(min_mag) as i32) as u32;
    Ok(InverseScale {
        exp: -(scale as i32) - b_exp,
        scale,
    })
}

pub fn inverse_s16(b: &[i16], b_exp: Exponent) -> Result<InverseScale> {
    let mut min_mag = i16::MAX;
    for &b_k in b {
        ensure!(b_k != 0, "inverse of a vector with a zero element");
        min_mag = min_mag.min(b_k.saturating_abs());
    }
    let scale = (28 - headroom16(min_mag) as i32) as u32;
    Ok(InverseScale {
        exp: -(scale as i32) - b_exp,
        scale,
    })
}

/// 32-bit squared-magnitude prepare.
pub fn squared_mag_s32(b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let b_shr = 1 - b_hr as i32;
    UnaryShift {
        exp: 2 * (b_exp + b_shr) + 30,
        b_shr,
    }
}

/// 16-bit squared-magnitude prepare (single output shift).
pub fn squared_mag_s16(b_exp: Exponent, b_hr: Headroom) -> OutputShift {
    let a_shr = (16 - 2 * b_hr as i32).max(0);
    OutputShift {
        exp: 2 * b_exp + a_shr,
        a_shr,
    }
}

/// 32-bit magnitude prepare.
pub fn mag_s32(b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let b_shr = 1 - b_hr as i32;
    UnaryShift {
        exp: b_exp + b_shr,
        b_shr,
    }
}

/// 16-bit magnitude prepare.
pub fn mag_s16(b_exp: Exponent, b_hr: Headroom) -> UnaryShift {
    let b_shr = 1 - b_hr as i32;
    UnaryShift {
        exp: b_exp + b_shr,
        b_shr,
    }
}

/// 32-bit multiply-accumulate prepare.
///
/// Reconciles three exponents so that
/// `exp == acc_exp + acc_shr == b_exp + c_exp + b_shr + c_shr + 30`
/// and neither the rescaled accumulator nor the shifted product can overflow
/// in the final add.
pub fn macc_s32(
    acc_exp: Exponent,
    b_exp: Exponent,
    c_exp: Exponent,
    acc_hr: Headroom,
    b_hr: Headroom,
    c_hr: Headroom,
) -> MaccShifts {
    let p = mul_s32(b_exp, c_exp, b_hr, c_hr);
    let exp = (acc_exp - acc_hr as i32).max(p.exp) + 1;
    MaccShifts {
        exp,
        acc_shr: exp - acc_exp,
        b_shr: p.b_shr + (exp - p.exp),
        c_shr: p.c_shr,
    }
}

/// 32-bit complex multiply-accumulate prepare.
pub fn complex_macc_s32(
    acc_exp: Exponent,
    b_exp: Exponent,
    c_exp: Exponent,
    acc_hr: Headroom,
    b_hr: Headroom,
    c_hr: Headroom,
) -> MaccShifts {
    let p = complex_mul_s32(b_exp, c_exp, b_hr, c_hr);
    let exp = (acc_exp - acc_hr as i32).max(p.exp) + 1;
    MaccShifts {
        exp,
        acc_shr: exp - acc_exp,
        b_shr: p.b_shr + (exp - p.exp),
        c_shr: p.c_shr,
    }
}

/// 16-bit multiply-accumulate prepare.
pub fn macc_s16(
    acc_exp: Exponent,
    b_exp: Exponent,
    c_exp: Exponent,
    acc_hr: Headroom,
    b_hr: Headroom,
    c_hr: Headroom,
) -> MaccShiftsS16 {
    let bc_sat0 = (15 - b_hr as i32 - c_hr as i32).max(0);
    let exp = (acc_exp - acc_hr as i32).max(b_exp + c_exp + bc_sat0) + 1;
    MaccShiftsS16 {
        exp,
        acc_shr: exp - acc_exp,
        bc_sat: exp - b_exp - c_exp,
    }
}

/// 16-bit complex multiply-accumulate prepare.
pub fn complex_macc_s16(
    acc_exp: Exponent,
    b_exp: Exponent,
    c_exp: Exponent,
    acc_hr: Headroom,
    b_hr: Headroom,
    c_hr: Headroom,
) -> MaccShiftsS16 {
    let bc_sat0 = (16 - b_hr as i32 - c_hr as i32).max(0);
    let exp = (acc_exp - acc_hr as i32).max(b_exp + c_exp + bc_sat0) + 1;
    MaccShiftsS16 {
        exp,
        acc_shr: exp - acc_exp,
        bc_sat: exp - b_exp - c_exp,
    }
}

/// 32-bit clip prepare: rescale the bounds to the output exponent, detecting
/// the three degenerate cases.
pub fn clip_s32(
    b_exp: Exponent,
    bound_exp: Exponent,
    b_hr: Headroom,
    lower: i32,
    upper: i32,
) -> ClipPlan<i32> {
    debug_assert!(lower <= upper);
    // Left-justify the input; in-range elements keep full precision there.
    let exp = b_exp - b_hr as i32;
    let bound_shr = exp - bound_exp;
    let lo = ashr32(lower, bound_shr);
    let hi = ashr32(upper, bound_shr);

    if hi == SAT32_MIN {
        // Upper bound is below anything representable at `exp`, so it is below
        // every element of the input.
        ClipPlan::ForceUpper {
            mant: upper,
            exp: bound_exp,
        }
    } else if lo == SAT32_MAX {
        ClipPlan::ForceLower {
            mant: lower,
            exp: bound_exp,
        }
    } else if lo == hi {
        ClipPlan::Collapsed { mant: lo, exp }
    } else {
        ClipPlan::Rescale {
            exp,
            b_shr: exp - b_exp,
            lower: lo,
            upper: hi,
        }
    }
}

/// 16-bit clip prepare.
pub fn clip_s16(
    b_exp: Exponent,
    bound_exp: Exponent,
    b_hr: Headroom,
    lower: i16,
    upper: i16,
) -> ClipPlan<i16> {
    use crate::scalar::s16::ashr16;
    use crate::types::{SAT16_MAX, SAT16_MIN};

    debug_assert!(lower <= upper);
    let exp = b_exp - b_hr as i32;
    let bound_shr = exp - bound_exp;
    let lo = ashr16(lower, bound_shr);
    let hi = ashr16(upper, bound_shr);

    if hi == SAT16_MIN {
        ClipPlan::ForceUpper {
            mant: upper,
            exp: bound_exp,
        }
    } else if lo == SAT16_MAX {
        ClipPlan::ForceLower {
            mant: lower,
            exp: bound_exp,
        }
    } else if lo == hi {
        ClipPlan::Collapsed { mant: lo, exp }
    } else {
        ClipPlan::Rescale {
            exp,
            b_shr: exp - b_exp,
            lower: lo,
            upper: hi,
        }
    }
}
