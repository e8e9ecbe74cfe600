//! FFT entry points on BFP vectors.
//!
//! The mono transforms reinterpret a real vector of length `N` as `N/2`
//! complex samples (even samples real, odd samples imaginary), transform in
//! place, and untangle the result into the true half-spectrum with the DC and
//! Nyquist bins packed together in bin 0.

use alloc::vec::Vec;

use anyhow::{ensure, Result};
use blockfp_util::log2_strict;
use log::trace;

use crate::bfp::{BfpChPairS32, BfpComplexS32, BfpS32, StereoSpectra};
use crate::fft;
use crate::scalar::f32::{f32_max_exponent, f32_to_s32, s32_to_f32};
use crate::types::{
    complex_view_mut, floats_as_words_mut, pairs_as_complex_mut, words_as_complex_f32_mut,
    Complex32, ComplexF32,
};
use crate::vect::complex_s32 as vect_c32;
use crate::vect::s32 as vect_s32;

impl BfpS32 {
    /// Forward real DFT via an `N/2`-point complex FFT.
    ///
    /// Consumes the time-domain vector and returns its packed half-spectrum:
    /// bin `f` of the result is `X[f]` for `1 <= f < N/2`, and bin 0 holds
    /// `X[0] + j*X[N/2]` (both are purely real for a real input).
    pub fn fft_forward_mono(mut self) -> BfpComplexS32 {
        let n = self.len();
        let lg_n = log2_strict(n);
        assert!(lg_n >= 1 && lg_n <= fft::MAX_FFT_LOG2);

        // Normalise to exactly two bits of headroom for the butterfly passes.
        let x_shr = 2 - self.hr as i32;
        if x_shr != 0 {
            vect_s32::shr_in_place(&mut self.data, x_shr);
            self.exp += x_shr;
        }

        let mut exp = self.exp;
        let mut hr = self.hr;
        let view = complex_view_mut(&mut self.data);
        fft::index_bit_reversal(view);
        fft::dit_forward(view, &mut hr, &mut exp);
        fft::mono_adjust(view, false);

        let mut data: Vec<Complex32> = Vec::with_capacity(n / 2 + 1);
        data.extend_from_slice(view);
        let hr = vect_c32::headroom(&data);
        trace!("mono FFT: N={n}, exp {} -> {exp}", self.exp);
        BfpComplexS32 { data, exp, hr }
    }
}

impl BfpComplexS32 {
    /// Inverse of [`BfpS32::fft_forward_mono`]: consumes a packed
    /// half-spectrum of `N/2` bins and returns the length-`N` real signal.
    pub fn fft_inverse_mono(mut self) -> BfpS32 {
        let n2 = self.len();
        let lg = log2_strict(n2);
        assert!(lg + 1 <= fft::MAX_FFT_LOG2);

        let x_shr = 2 - self.hr as i32;
        if x_shr != 0 {
            vect_c32::shr_in_place(&mut self.data, x_shr);
            self.exp += x_shr;
        }

        let mut exp = self.exp;
        let mut hr = self.hr;
        fft::mono_adjust(&mut self.data, true);
        fft::index_bit_reversal(&mut self.data);
        fft::dit_inverse(&mut self.data, &mut hr, &mut exp);

        let mut data: Vec<i32> = Vec::with_capacity(2 * n2 + 2);
        for v in &self.data {
            data.push(v.re);
            data.push(v.im);
        }
        let hr = vect_s32::headroom(&data);
        trace!("mono IFFT: N={}, exp {} -> {exp}", 2 * n2, self.exp);
        BfpS32 { data, exp, hr }
    }

    /// In-place forward complex DFT. The result replaces the input, in
    /// natural bin order.
    pub fn fft_forward(&mut self) {
        let n = self.len();
        let lg_n = log2_strict(n);
        assert!(lg_n <= fft::MAX_FFT_LOG2);

        // The butterfly passes need two bits of headroom; extra headroom is
        // left in place.
        if self.hr < 2 {
            let shr = 2 - self.hr as i32;
            vect_c32::shr_in_place(&mut self.data, shr);
            self.exp += shr;
        }

        let mut exp = self.exp;
        let mut hr = self.hr;
        fft::index_bit_reversal(&mut self.data);
        fft::dit_forward(&mut self.data, &mut hr, &mut exp);
        trace!("complex FFT: N={n}, exp {} -> {exp}", self.exp);
        self.exp = exp;
        self.hr = hr;
    }

    /// In-place inverse complex DFT, including the `1/N` normalisation in
    /// the output exponent.
    pub fn fft_inverse(&mut self) {
        let n = self.len();
        let lg_n = log2_strict(n);
        assert!(lg_n <= fft::MAX_FFT_LOG2);

        if self.hr < 2 {
            let shr = 2 - self.hr as i32;
            vect_c32::shr_in_place(&mut self.data, shr);
            self.exp += shr;
        }

        let mut exp = self.exp;
        let mut hr = self.hr;
        fft::index_bit_reversal(&mut self.data);
        fft::dit_inverse(&mut self.data, &mut hr, &mut exp);
        trace!("complex IFFT: N={n}, exp {} -> {exp}", self.exp);
        self.exp = exp;
        self.hr = hr;
    }

    /// Expose the Nyquist bin packed into bin 0 by the mono forward FFT.
    ///
    /// The vector grows by one bin; the buffer capacity reserved by the mono
    /// FFT (or by `try_alloc`) makes this allocation-free.
    pub fn fft_unpack_mono(&mut self) {
        let n2 = self.len();
        debug_assert!(n2.is_power_of_two());
        let nyquist = self.data[0].im;
        self.data[0].im = 0;
        self.data.push(Complex32 {
            re: nyquist,
            im: 0,
        });
        self.hr = vect_c32::headroom(&self.data);
    }

    /// Undo [`BfpComplexS32::fft_unpack_mono`], restoring the packed layout
    /// the mono inverse FFT expects.
    pub fn fft_pack_mono(&mut self) {
        let n2 = self.len() - 1;
        debug_assert!(n2.is_power_of_two());
        let nyquist = self.data[n2].re;
        self.data.truncate(n2);
        self.data[0].im = nyquist;
        self.hr = vect_c32::headroom(&self.data);
    }
}

impl BfpChPairS32 {
    /// Forward DFT of both channels at once via one complex FFT.
    ///
    /// Channel A rides in the real slots and channel B in the imaginary
    /// slots; the merged spectrum is split into the two packed half-spectra.
    pub fn fft_forward_stereo(mut self) -> StereoSpectra {
        let n = self.len();
        let lg_n = log2_strict(n);
        assert!(lg_n >= 1 && lg_n <= fft::MAX_FFT_LOG2);

        let input_shr = 2 - self.hr as i32;
        let mut exp = self.exp;
        let view = pairs_as_complex_mut(&mut self.data);
        if input_shr != 0 {
            vect_c32::shr_in_place(view, input_shr);
            exp += input_shr;
        }

        let mut hr = self.hr;
        fft::index_bit_reversal(view);
        fft::dit_forward(view, &mut hr, &mut exp);
        let hr = fft::spectra_split(view);

        let data: Vec<Complex32> = view.to_vec();
        trace!("stereo FFT: N={n}, exp {} -> {exp}", self.exp);
        StereoSpectra { data, exp, hr }
    }
}

impl StereoSpectra {
    /// Inverse of [`BfpChPairS32::fft_forward_stereo`]: merge the two packed
    /// half-spectra and inverse-transform back to a channel-pair signal.
    pub fn fft_inverse_stereo(mut self) -> BfpChPairS32 {
        let n = self.data.len();
        let lg_n = log2_strict(n);
        assert!(lg_n >= 1 && lg_n <= fft::MAX_FFT_LOG2);

        let shr = 2 - self.hr as i32;
        if shr != 0 {
            vect_c32::shr_in_place(&mut self.data, shr);
            self.exp += shr;
        }

        let mut exp = self.exp;
        let mut hr = fft::spectra_merge(&mut self.data);
        fft::index_bit_reversal(&mut self.data);
        fft::dit_inverse(&mut self.data, &mut hr, &mut exp);

        let data: Vec<_> = self
            .data
            .iter()
            .map(|v| crate::types::ChannelPair32 {
                ch_a: v.re,
                ch_b: v.im,
            })
            .collect();
        BfpChPairS32 { data, exp, hr }
    }
}

/// Forward real FFT over an IEEE-754 float buffer.
///
/// The floats are quantised onto a common block exponent with two bits of
/// headroom, transformed with the fixed-point mono path, and converted back.
/// On return the buffer holds `N/2` interleaved complex bins (the Nyquist
/// real part packed into bin 0's imaginary part, as in the mono FFT).
pub fn fft_f32_forward(x: &mut [f32]) -> Result<&mut [ComplexF32]> {
    let n = x.len();
    ensure!(
        n.is_power_of_two() && n >= 2 && log2_strict(n) <= fft::MAX_FFT_LOG2,
        "unsupported FFT length {n}"
    );
    let exp = f32_max_exponent(x)? + 2;

    {
        let words = floats_as_words_mut(x);
        for w in words.iter_mut() {
            *w = f32_to_s32(f32::from_bits(*w as u32), exp);
        }
        let view = complex_view_mut(words);
        let mut hr = 2;
        let mut e = exp;
        fft::index_bit_reversal(view);
        fft::dit_forward(view, &mut hr, &mut e);
        fft::mono_adjust(view, false);
        for w in words.iter_mut() {
            *w = s32_to_f32(*w, e).to_bits() as i32;
        }
    }
    Ok(words_as_complex_f32_mut(x))
}

/// Inverse real FFT over an IEEE-754 float buffer holding `N/2` packed
/// complex bins; on return the buffer holds the `N` real samples.
pub fn fft_f32_inverse(x: &mut [f32]) -> Result<()> {
    let n = x.len();
    ensure!(
        n.is_power_of_two() && n >= 2 && log2_strict(n) <= fft::MAX_FFT_LOG2,
        "unsupported FFT length {n}"
    );
    let exp = f32_max_exponent(x)? + 2;

    let words = floats_as_words_mut(x);
    for w in words.iter_mut() {
        *w = f32_to_s32(f32::from_bits(*w as u32), exp);
    }
    let view = complex_view_mut(words);
    let mut hr = 2;
    let mut e = exp;
    fft::mono_adjust(view, true);
    fft::index_bit_reversal(view);
    fft::dit_inverse(view, &mut hr, &mut e);
    for w in words.iter_mut() {
        *w = s32_to_f32(*w, e).to_bits() as i32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::testing::{naive_dft, Cf64};

    fn real_naive_dft(x: &[f64]) -> alloc::vec::Vec<Cf64> {
        let cplx: alloc::vec::Vec<Cf64> =
            x.iter().map(|&re| Cf64 { re, im: 0.0 }).collect();
        naive_dft(&cplx, false)
    }

    #[test]
    fn mono_impulse_spectrum_is_flat() {
        // Unit impulse of length 64: every bin is 1, and bin 0's imaginary
        // part carries the (real) Nyquist bin.
        let n = 64;
        let mut data = alloc::vec![0i32; n];
        data[0] = 1 << 20;
        let x = BfpS32::new(data, 0);
        let spectrum = x.fft_forward_mono();

        assert_eq!(spectrum.len(), n / 2);
        let lsb = (spectrum.exp as f64).exp2();
        let expect = (1 << 20) as f64;
        for (f, bin) in spectrum.data.iter().enumerate() {
            let re = bin.re as f64 * lsb;
            let im = bin.im as f64 * lsb;
            if f == 0 {
                assert!((re - expect).abs() <= 4.0 * lsb, "DC: {re}");
                assert!((im - expect).abs() <= 4.0 * lsb, "Nyquist: {im}");
            } else {
                assert!((re - expect).abs() <= 4.0 * lsb, "bin {f}: {re}");
                assert!(im.abs() <= 4.0 * lsb, "bin {f}: {im}");
            }
        }
    }

    #[test]
    fn mono_forward_matches_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xF1F1);
        let n = 256;
        let data: alloc::vec::Vec<i32> =
            (0..n).map(|_| rng.gen::<i32>() >> 3).collect();
        let reference = real_naive_dft(
            &data.iter().map(|&v| v as f64).collect::<alloc::vec::Vec<_>>(),
        );

        let spectrum = BfpS32::new(data, 0).fft_forward_mono();
        let lsb = (spectrum.exp as f64).exp2();
        let tol = 64.0 * lsb;
        for f in 1..n / 2 {
            let got_re = spectrum.data[f].re as f64 * lsb;
            let got_im = spectrum.data[f].im as f64 * lsb;
            assert!((got_re - reference[f].re).abs() <= tol, "bin {f}");
            assert!((got_im - reference[f].im).abs() <= tol, "bin {f}");
        }
        // Packed DC and Nyquist bins.
        assert!((spectrum.data[0].re as f64 * lsb - reference[0].re).abs() <= tol);
        assert!((spectrum.data[0].im as f64 * lsb - reference[n / 2].re).abs() <= tol);
    }

    #[test]
    fn mono_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xAA55);
        for lg_n in 1..=fft::MAX_FFT_LOG2 {
            let n = 1usize << lg_n;
            let data: alloc::vec::Vec<i32> =
                (0..n).map(|_| rng.gen::<i32>() >> 2).collect();
            let original = BfpS32::new(data, 0);
            let reference = original.clone();

            let x = original.fft_forward_mono().fft_inverse_mono();
            assert_eq!(x.len(), n);
            let lsb = (x.exp as f64).exp2();
            let tol = (2 * lg_n as i64 + 4) as f64 * lsb;
            for k in 0..n {
                let got = x.data[k] as f64 * lsb;
                let want = reference.data[k] as f64;
                assert!((got - want).abs() <= tol, "N={n} k={k}: {got} vs {want}");
            }
            assert_eq!(x.hr, vect_s32::headroom(&x.data));
        }
    }

    #[test]
    fn complex_round_trip_min_and_max_lengths() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5A5A);
        for lg_n in [1usize, fft::MAX_FFT_LOG2] {
            let n = 1 << lg_n;
            let data: alloc::vec::Vec<Complex32> = (0..n)
                .map(|_| Complex32::new(rng.gen::<i32>() >> 2, rng.gen::<i32>() >> 2))
                .collect();
            let original = BfpComplexS32::new(data, 0);
            let mut x = original.clone();

            x.fft_forward();
            x.fft_inverse();

            let scale = (x.exp as f64).exp2();
            let tol = (2 * lg_n as i64 + 4) as f64 * scale;
            for k in 0..n {
                let gr = x.data[k].re as f64 * scale;
                let gi = x.data[k].im as f64 * scale;
                assert!((gr - original.data[k].re as f64).abs() <= tol);
                assert!((gi - original.data[k].im as f64).abs() <= tol);
            }
        }
    }

    #[test]
    fn pack_unpack_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x66);
        let n = 128;
        let data: alloc::vec::Vec<i32> = (0..n).map(|_| rng.gen::<i32>() >> 4).collect();
        let mut spectrum = BfpS32::new(data, 0).fft_forward_mono();
        let packed = spectrum.clone();

        spectrum.fft_unpack_mono();
        assert_eq!(spectrum.len(), n / 2 + 1);
        assert_eq!(spectrum.data[0].im, 0);
        assert_eq!(spectrum.data[n / 2].re, packed.data[0].im);

        spectrum.fft_pack_mono();
        assert_eq!(spectrum, packed);
    }

    #[test]
    fn stereo_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x3131);
        let n = 256;
        let ch_a: alloc::vec::Vec<i32> = (0..n).map(|_| rng.gen::<i32>() >> 3).collect();
        let ch_b: alloc::vec::Vec<i32> = (0..n).map(|_| rng.gen::<i32>() >> 3).collect();
        let input = BfpChPairS32::from_channels(&ch_a, &ch_b, 0);

        let spectra = input.fft_forward_stereo();
        assert_eq!(spectra.bins(), n / 2);
        let out = spectra.fft_inverse_stereo();

        let lsb = (out.exp as f64).exp2();
        let tol = 40.0 * lsb;
        for k in 0..n {
            let ga = out.data[k].ch_a as f64 * lsb;
            let gb = out.data[k].ch_b as f64 * lsb;
            assert!((ga - ch_a[k] as f64).abs() <= tol, "k={k}");
            assert!((gb - ch_b[k] as f64).abs() <= tol, "k={k}");
        }
    }

    #[test]
    fn stereo_spectra_match_mono_spectra() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x8888);
        let n = 64;
        let ch_a: alloc::vec::Vec<i32> = (0..n).map(|_| rng.gen::<i32>() >> 3).collect();
        let ch_b: alloc::vec::Vec<i32> = (0..n).map(|_| rng.gen::<i32>() >> 3).collect();

        let spectra = BfpChPairS32::from_channels(&ch_a, &ch_b, 0).fft_forward_stereo();
        let mono_a = BfpS32::new(ch_a.clone(), 0).fft_forward_mono();
        let mono_b = BfpS32::new(ch_b.clone(), 0).fft_forward_mono();

        let a = spectra.channel_a();
        let b = spectra.channel_b();
        let sa = (a.exp as f64).exp2();
        let ma = (mono_a.exp as f64).exp2();
        let tol = 16.0 * sa.max(ma);
        for f in 0..n / 2 {
            assert!(
                (a.data[f].re as f64 * sa - mono_a.data[f].re as f64 * ma).abs() <= tol,
                "A bin {f}"
            );
            assert!(
                (b.data[f].im as f64 * sa - mono_b.data[f].im as f64
                    * (mono_b.exp as f64).exp2())
                .abs()
                    <= tol,
                "B bin {f}"
            );
        }
    }

    #[test]
    fn f32_wrapper_round_trip() {
        let n = 512;
        let mut rng = ChaCha8Rng::seed_from_u64(0x4242);
        let original: alloc::vec::Vec<f32> =
            (0..n).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect();
        let mut x = original.clone();

        {
            let spectrum = fft_f32_forward(&mut x).unwrap();
            assert_eq!(spectrum.len(), n / 2);
        }
        fft_f32_inverse(&mut x).unwrap();

        for k in 0..n {
            assert!(
                (x[k] - original[k]).abs() < 1e-3,
                "k={k}: {} vs {}",
                x[k],
                original[k]
            );
        }
    }

    #[test]
    fn f32_wrapper_dc_bin() {
        let n = 64;
        let mut x = alloc::vec![1.0f32; n];
        let spectrum = fft_f32_forward(&mut x).unwrap();
        // DC bin = N, Nyquist (packed into bin 0 imag) = 0.
        assert!((spectrum[0].re - n as f32).abs() < 1e-3);
        assert!(spectrum[0].im.abs() < 1e-3);
        for bin in &spectrum[1..] {
            assert!(bin.re.abs() < 1e-3 && bin.im.abs() < 1e-3);
        }
    }
}
