//! Shared helpers for the crate's tests: seeded random vectors, wide-integer
//! and floating-point references, and LSb-difference measurement.

use alloc::vec::Vec;

use rand::Rng;

use crate::types::{Complex32, Exponent};

/// A complex double, for reference transforms.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Cf64 {
    pub re: f64,
    pub im: f64,
}

/// Random 32-bit mantissa with at least `hr` bits of headroom.
pub fn rand_i32_hr<R: Rng>(rng: &mut R, hr: u32) -> i32 {
    let v: i32 = rng.gen();
    v >> hr
}

pub fn rand_vec_i32<R: Rng>(rng: &mut R, n: usize, hr: u32) -> Vec<i32> {
    (0..n).map(|_| rand_i32_hr(rng, hr)).collect()
}

pub fn rand_complex_vec<R: Rng>(rng: &mut R, n: usize, hr: u32) -> Vec<Complex32> {
    (0..n)
        .map(|_| Complex32 {
            re: rand_i32_hr(rng, hr),
            im: rand_i32_hr(rng, hr),
        })
        .collect()
}

/// Abstract values of a complex mantissa vector at the given exponent.
pub fn to_f64_complex(x: &[Complex32], exp: Exponent) -> Vec<Cf64> {
    let s = (exp as f64).exp2();
    x.iter()
        .map(|v| Cf64 {
            re: v.re as f64 * s,
            im: v.im as f64 * s,
        })
        .collect()
}

/// O(N^2) reference DFT. The inverse includes the 1/N normalisation.
pub fn naive_dft(x: &[Cf64], inverse: bool) -> Vec<Cf64> {
    let n = x.len();
    let sign = if inverse { 1.0 } else { -1.0 };
    let mut out = Vec::with_capacity(n);
    for k in 0..n {
        let mut acc = Cf64 { re: 0.0, im: 0.0 };
        for (j, v) in x.iter().enumerate() {
            let theta = sign * core::f64::consts::TAU * (k as f64) * (j as f64) / (n as f64);
            let (s, c) = theta.sin_cos();
            acc.re += v.re * c - v.im * s;
            acc.im += v.re * s + v.im * c;
        }
        if inverse {
            acc.re /= n as f64;
            acc.im /= n as f64;
        }
        out.push(acc);
    }
    out
}

/// Worst-case difference between a mantissa vector at `exp` and a reference,
/// in units of one LSb at `exp` (rounded up).
pub fn abs_diff_lsb(x: &[Complex32], exp: Exponent, reference: &[Cf64]) -> i64 {
    assert_eq!(x.len(), reference.len());
    let lsb = (exp as f64).exp2();
    let mut worst = 0f64;
    for (v, r) in x.iter().zip(reference) {
        let dre = (v.re as f64 * lsb - r.re).abs();
        let dim = (v.im as f64 * lsb - r.im).abs();
        worst = worst.max(dre.max(dim));
    }
    (worst / lsb).ceil() as i64
}
