//! Radix-2 complex FFT over 32-bit fixed-point samples with headroom
//! tracking across stages.
//!
//! The decimation-in-time passes expect bit-reversed input and produce
//! natural order; decimation-in-frequency is the converse. Each pass measures
//! the buffer's headroom and applies a conditional scaling right-shift so
//! that every pass starts with at least two bits of headroom, which makes
//! butterfly saturation impossible; the net shift count is added to the
//! exponent. Inverse transforms use conjugated twiddles and fold the `1/N`
//! normalisation into the output exponent.

pub mod tables;

use blockfp_util::{log2_strict, reverse_index_bits_in_place};
pub use tables::MAX_FFT_LOG2;

use crate::scalar::s32::{round_shr64, sat32};
use crate::types::{Complex32, Exponent, Headroom};
use crate::vect::complex_s32::{cadd_sat, cmul_q30, csub_sat};
use crate::vect::complex_s32 as vect_c32;

/// Headroom each butterfly pass must start with to rule out saturation.
const PASS_HR_TARGET: i32 = 2;

/// In-place index bit-reversal permutation of a complex vector.
pub fn index_bit_reversal(x: &mut [Complex32]) {
    reverse_index_bits_in_place(x);
}

#[inline]
fn conj(t: Complex32) -> Complex32 {
    Complex32 {
        re: t.re,
        im: -t.im,
    }
}

/// Rounding one-or-two-bit scaling shift of the whole buffer, when needed.
fn scale_pass(x: &mut [Complex32], exp: &mut Exponent) {
    let hr = vect_c32::headroom(x) as i32;
    let shr = PASS_HR_TARGET - hr;
    if shr > 0 {
        for v in x.iter_mut() {
            v.re = sat32(round_shr64(v.re as i64, shr as u32));
            v.im = sat32(round_shr64(v.im as i64, shr as u32));
        }
        *exp += shr;
    }
}

#[inline]
fn butterfly_unit(x: &mut [Complex32], i: usize, j: usize) {
    let u = x[i];
    let v = x[j];
    x[i] = cadd_sat(u, v);
    x[j] = csub_sat(u, v);
}

/// Butterfly with twiddle -j (forward) or +j (inverse).
#[inline]
fn butterfly_quarter_dit(x: &mut [Complex32], i: usize, j: usize, inverse: bool) {
    let u = x[i];
    let v = x[j];
    let tv = if inverse {
        Complex32 { re: -v.im, im: v.re }
    } else {
        Complex32 { re: v.im, im: -v.re }
    };
    x[i] = cadd_sat(u, tv);
    x[j] = csub_sat(u, tv);
}

fn dit_passes(x: &mut [Complex32], exp: &mut Exponent, inverse: bool) {
    let n = x.len();
    let lg_n = log2_strict(n);
    assert!(
        lg_n <= MAX_FFT_LOG2,
        "FFT length {n} exceeds the supported maximum"
    );

    for lg_half_m in 0..lg_n {
        scale_pass(x, exp);
        let half_m = 1usize << lg_half_m;
        let m = half_m * 2;
        match half_m {
            1 => {
                for k in (0..n).step_by(2) {
                    butterfly_unit(x, k, k + 1);
                }
            }
            2 => {
                for k in (0..n).step_by(4) {
                    butterfly_unit(x, k, k + 2);
                    butterfly_quarter_dit(x, k + 1, k + 3, inverse);
                }
            }
            _ => {
                let tw = tables::dit_stage(m);
                for k in (0..n).step_by(m) {
                    for j in 0..half_m {
                        let t = if inverse { conj(tw[j]) } else { tw[j] };
                        let tv = cmul_q30(t, x[k + half_m + j]);
                        let u = x[k + j];
                        x[k + j] = cadd_sat(u, tv);
                        x[k + half_m + j] = csub_sat(u, tv);
                    }
                }
            }
        }
    }
}

fn dif_passes(x: &mut [Complex32], exp: &mut Exponent, inverse: bool) {
    let n = x.len();
    let lg_n = log2_strict(n);
    assert!(
        lg_n <= MAX_FFT_LOG2,
        "FFT length {n} exceeds the supported maximum"
    );

    for lg_half_m in (0..lg_n).rev() {
        scale_pass(x, exp);
        let half_m = 1usize << lg_half_m;
        let m = half_m * 2;
        match half_m {
            1 => {
                for k in (0..n).step_by(2) {
                    butterfly_unit(x, k, k + 1);
                }
            }
            2 => {
                for k in (0..n).step_by(4) {
                    butterfly_unit(x, k, k + 2);
                    // (u, v) -> (u + v, t*(u - v)) with t = -+j
                    let u = x[k + 1];
                    let v = x[k + 3];
                    let d = csub_sat(u, v);
                    x[k + 1] = cadd_sat(u, v);
                    x[k + 3] = if inverse {
                        Complex32 { re: -d.im, im: d.re }
                    } else {
                        Complex32 { re: d.im, im: -d.re }
                    };
                }
            }
            _ => {
                let tw = tables::dif_stage(m);
                for k in (0..n).step_by(m) {
                    for j in 0..half_m {
                        let t = if inverse { conj(tw[j]) } else { tw[j] };
                        let u = x[k + j];
                        let v = x[k + half_m + j];
                        x[k + j] = cadd_sat(u, v);
                        x[k + half_m + j] = cmul_q30(t, csub_sat(u, v));
                    }
                }
            }
        }
    }
}

/// Forward DFT, decimation-in-time. Expects bit-reversed input.
pub fn dit_forward(x: &mut [Complex32], hr: &mut Headroom, exp: &mut Exponent) {
    dit_passes(x, exp, false);
    *hr = vect_c32::headroom(x);
}

/// Inverse DFT, decimation-in-time. Expects bit-reversed input.
pub fn dit_inverse(x: &mut [Complex32], hr: &mut Headroom, exp: &mut Exponent) {
    let lg_n = log2_strict(x.len()) as i32;
    dit_passes(x, exp, true);
    *exp -= lg_n;
    *hr = vect_c32::headroom(x);
}

/// Forward DFT, decimation-in-frequency. Produces bit-reversed output.
pub fn dif_forward(x: &mut [Complex32], hr: &mut Headroom, exp: &mut Exponent) {
    dif_passes(x, exp, false);
    *hr = vect_c32::headroom(x);
}

/// Inverse DFT, decimation-in-frequency. Produces bit-reversed output.
pub fn dif_inverse(x: &mut [Complex32], hr: &mut Headroom, exp: &mut Exponent) {
    let lg_n = log2_strict(x.len()) as i32;
    dif_passes(x, exp, true);
    *exp -= lg_n;
    *hr = vect_c32::headroom(x);
}

#[inline]
fn half(v: i64) -> i32 {
    (v >> 1) as i32
}

#[inline]
fn half_round(v: i64) -> i32 {
    ((v + 1) >> 1) as i32
}

/// Untangle the `N/2`-point complex spectrum of an even/odd-packed real
/// signal into the true half-spectrum (forward), or re-tangle it for an
/// `N/2`-point inverse transform (inverse).
///
/// `x` holds `N/2` complex bins of an `N`-point real DFT; the real part of
/// the Nyquist bin is packed into `x[0].im`.
pub fn mono_adjust(x: &mut [Complex32], inverse: bool) {
    let n2 = x.len();
    debug_assert!(n2.is_power_of_two());

    // DC and Nyquist share bin 0.
    let s = x[0];
    if !inverse {
        x[0] = Complex32 {
            re: sat32(s.re as i64 + s.im as i64),
            im: sat32(s.re as i64 - s.im as i64),
        };
    } else {
        x[0] = Complex32 {
            re: half_round(s.re as i64 + s.im as i64),
            im: half_round(s.re as i64 - s.im as i64),
        };
    }

    // The middle bin only conjugates.
    if n2 >= 2 {
        let mid = n2 / 2;
        x[mid].im = sat32(-(x[mid].im as i64));
    }

    if n2 < 4 {
        return;
    }
    let tw = tables::dit_stage(2 * n2);
    for k in 1..n2 / 2 {
        let t = tw[k];
        let s = x[k];
        let r = x[n2 - k];
        let a_re = half(s.re as i64 + r.re as i64);
        let a_im = half(s.im as i64 - r.im as i64);
        if !inverse {
            let d = Complex32 {
                re: half(s.re as i64 - r.re as i64),
                im: half(s.im as i64 + r.im as i64),
            };
            let e = cmul_q30(t, d);
            x[k] = Complex32 {
                re: sat32(a_re as i64 + e.im as i64),
                im: sat32(a_im as i64 - e.re as i64),
            };
            x[n2 - k] = Complex32 {
                re: sat32(a_re as i64 - e.im as i64),
                im: sat32(-(a_im as i64) - e.re as i64),
            };
        } else {
            let f = Complex32 {
                re: half(s.re as i64 - r.re as i64),
                im: half(s.im as i64 + r.im as i64),
            };
            let jf = Complex32 { re: -f.im, im: f.re };
            let d = cmul_q30(conj(t), jf);
            x[k] = Complex32 {
                re: sat32(a_re as i64 + d.re as i64),
                im: sat32(a_im as i64 + d.im as i64),
            };
            x[n2 - k] = Complex32 {
                re: sat32(a_re as i64 - d.re as i64),
                im: sat32(d.im as i64 - a_im as i64),
            };
        }
    }
}

/// Split the merged spectrum of two simultaneously-transformed real signals.
///
/// On return the first half of `x` holds channel A's half-spectrum and the
/// second half holds channel B's, each packing its Nyquist bin's real part
/// into its bin 0 imaginary part. Returns the minimum of the two halves'
/// headroom.
pub fn spectra_split(x: &mut [Complex32]) -> Headroom {
    let n = x.len();
    debug_assert!(n.is_power_of_two() && n >= 2);
    let n2 = n / 2;
    let n4 = n / 4;

    let y0 = x[0];
    let yn2 = x[n2];
    x[0] = Complex32 { re: y0.re, im: yn2.re };
    x[n2] = Complex32 { re: y0.im, im: yn2.im };

    if n >= 4 {
        let yf = x[n4];
        let yr = x[3 * n4];
        x[n4] = Complex32 {
            re: half(yf.re as i64 + yr.re as i64),
            im: half(yf.im as i64 - yr.im as i64),
        };
        x[3 * n4] = Complex32 {
            re: half(yf.im as i64 + yr.im as i64),
            im: half(yr.re as i64 - yf.re as i64),
        };
    }

    for f in 1..n4 {
        let yf = x[f];
        let yr = x[n - f];
        let yf2 = x[n2 - f];
        let yr2 = x[n2 + f];

        // A[f] = (Y[f] + conj(Y[N-f])) / 2, B[f] = -j (Y[f] - conj(Y[N-f])) / 2
        x[f] = Complex32 {
            re: half(yf.re as i64 + yr.re as i64),
            im: half(yf.im as i64 - yr.im as i64),
        };
        x[n2 + f] = Complex32 {
            re: half(yf.im as i64 + yr.im as i64),
            im: half(yr.re as i64 - yf.re as i64),
        };
        // Same relations for the partner pair (n2 - f, n2 + f).
        x[n2 - f] = Complex32 {
            re: half(yf2.re as i64 + yr2.re as i64),
            im: half(yf2.im as i64 - yr2.im as i64),
        };
        x[n - f] = Complex32 {
            re: half(yf2.im as i64 + yr2.im as i64),
            im: half(yr2.re as i64 - yf2.re as i64),
        };
    }

    vect_c32::headroom(x)
}

/// Merge two packed real-signal half-spectra for a simultaneous inverse
/// transform. Algebraic inverse of [`spectra_split`].
pub fn spectra_merge(x: &mut [Complex32]) -> Headroom {
    let n = x.len();
    debug_assert!(n.is_power_of_two() && n >= 2);
    let n2 = n / 2;
    let n4 = n / 4;

    let a0 = x[0];
    let b0 = x[n2];
    x[0] = Complex32 { re: a0.re, im: b0.re };
    x[n2] = Complex32 { re: a0.im, im: b0.im };

    if n >= 4 {
        let a = x[n4];
        let b = x[3 * n4];
        x[n4] = Complex32 {
            re: sat32(a.re as i64 - b.im as i64),
            im: sat32(a.im as i64 + b.re as i64),
        };
        x[3 * n4] = Complex32 {
            re: sat32(a.re as i64 + b.im as i64),
            im: sat32(b.re as i64 - a.im as i64),
        };
    }

    for f in 1..n4 {
        let a1 = x[f];
        let b1 = x[n2 + f];
        let a2 = x[n2 - f];
        let b2 = x[n - f];

        // Y[f] = A[f] + j B[f], Y[N-f] = conj(A[f] - j B[f])
        x[f] = Complex32 {
            re: sat32(a1.re as i64 - b1.im as i64),
            im: sat32(a1.im as i64 + b1.re as i64),
        };
        x[n - f] = Complex32 {
            re: sat32(a1.re as i64 + b1.im as i64),
            im: sat32(b1.re as i64 - a1.im as i64),
        };
        x[n2 - f] = Complex32 {
            re: sat32(a2.re as i64 - b2.im as i64),
            im: sat32(a2.im as i64 + b2.re as i64),
        };
        x[n2 + f] = Complex32 {
            re: sat32(a2.re as i64 + b2.im as i64),
            im: sat32(b2.re as i64 - a2.im as i64),
        };
    }

    vect_c32::headroom(x)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::testing::{
        abs_diff_lsb, naive_dft, rand_complex_vec, to_f64_complex, Cf64,
    };

    fn forward(x: &mut [Complex32], exp: &mut Exponent) -> Headroom {
        let mut hr = vect_c32::headroom(x);
        index_bit_reversal(x);
        dit_forward(x, &mut hr, exp);
        hr
    }

    #[test]
    fn dit_forward_matches_naive_dft() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xF00D);
        for lg_n in 1..=MAX_FFT_LOG2 {
            let n = 1 << lg_n;
            let mut x = rand_complex_vec(&mut rng, n, 3);
            let reference = naive_dft(&to_f64_complex(&x, 0), false);

            let mut exp = 0;
            let hr = forward(&mut x, &mut exp);

            let worst = abs_diff_lsb(&x, exp, &reference);
            assert!(worst <= lg_n as i64 + 4, "N={n}: {worst} LSb off");
            assert_eq!(hr, vect_c32::headroom(&x), "N={n}: headroom wrong");
        }
    }

    #[test]
    fn dif_forward_matches_naive_dft() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xBEEF);
        for lg_n in 1..=MAX_FFT_LOG2 {
            let n = 1 << lg_n;
            let mut x = rand_complex_vec(&mut rng, n, 3);
            let reference = naive_dft(&to_f64_complex(&x, 0), false);

            let mut exp = 0;
            let mut hr = vect_c32::headroom(&x);
            dif_forward(&mut x, &mut hr, &mut exp);
            index_bit_reversal(&mut x);

            let worst = abs_diff_lsb(&x, exp, &reference);
            assert!(worst <= lg_n as i64 + 4, "N={n}: {worst} LSb off");
        }
    }

    #[test]
    fn forward_then_inverse_recovers_input() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xABCD);
        for lg_n in 1..=MAX_FFT_LOG2 {
            let n = 1 << lg_n;
            let original = rand_complex_vec(&mut rng, n, 3);
            let reference: Vec<Cf64> = to_f64_complex(&original, 0);

            let mut x = original.clone();
            let mut exp = 0;
            forward(&mut x, &mut exp);

            let mut hr = 0;
            index_bit_reversal(&mut x);
            dit_inverse(&mut x, &mut hr, &mut exp);

            let worst = abs_diff_lsb(&x, exp, &reference);
            // Abstract values must match the input to within a few LSb of the
            // final exponent.
            assert!(worst <= 2 * lg_n as i64 + 4, "N={n}: {worst} LSb off");
        }
    }

    #[test]
    fn dc_input_concentrates_in_bin_zero() {
        // 1024-point FFT of a pure DC signal.
        let n = 1 << MAX_FFT_LOG2;
        let mut x = alloc::vec![Complex32::new(0x0100_0000, 0); n];
        let mut exp = 0;
        forward(&mut x, &mut exp);

        // Bin 0 carries n * 0x0100_0000, scaled by the net shifts.
        let expected = (n as f64) * (0x0100_0000 as f64);
        let got = (x[0].re as f64) * (exp as f64).exp2();
        assert!((got - expected).abs() / expected < 1e-6);
        let lsb = (exp as f64).exp2();
        for (k, bin) in x.iter().enumerate().skip(1) {
            let mag = ((bin.re as f64).powi(2) + (bin.im as f64).powi(2)).sqrt() * lsb;
            assert!(mag < 2.0 * lsb, "bin {k} leaked: {mag}");
        }
    }

    #[test]
    fn headroom_is_exact_after_every_transform() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
        let mut x = rand_complex_vec(&mut rng, 256, 5);
        let mut exp = 0;
        let mut hr = vect_c32::headroom(&x);
        index_bit_reversal(&mut x);
        dit_forward(&mut x, &mut hr, &mut exp);
        assert_eq!(hr, vect_c32::headroom(&x));

        dif_inverse(&mut x, &mut hr, &mut exp);
        assert_eq!(hr, vect_c32::headroom(&x));
    }

    #[test]
    fn split_then_merge_round_trips() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x717);
        for lg_n in 1..=9 {
            let n = 1 << lg_n;
            let original = rand_complex_vec(&mut rng, n, 3);
            let mut x = original.clone();
            spectra_split(&mut x);
            spectra_merge(&mut x);
            for (got, want) in x.iter().zip(&original) {
                assert!(
                    (got.re - want.re).abs() <= 1 && (got.im - want.im).abs() <= 1,
                    "N={n}: {got:?} vs {want:?}"
                );
            }
        }
    }

    #[test]
    fn mono_adjust_round_trips() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x424242);
        for lg_n2 in 1..=9 {
            let n2 = 1 << lg_n2;
            let original = rand_complex_vec(&mut rng, n2, 3);
            let mut x = original.clone();
            mono_adjust(&mut x, false);
            mono_adjust(&mut x, true);
            for (got, want) in x.iter().zip(&original) {
                assert!(
                    (got.re - want.re).abs() <= 2 && (got.im - want.im).abs() <= 2,
                    "N/2={n2}: {got:?} vs {want:?}"
                );
            }
        }
    }
}
