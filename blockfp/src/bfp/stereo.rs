use alloc::vec::Vec;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::bfp::{BfpComplexRef, BfpComplexS32, BfpVector};
use crate::types::{ChannelPair32, Complex32, Exponent, Headroom};
use crate::vect::complex_s32 as vect_c32;

/// A vector of channel pairs: two real signals sharing one exponent.
///
/// Layout convenience for transforming two real signals with a single
/// complex FFT; channel A rides in the real slots, channel B in the
/// imaginary slots.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BfpChPairS32 {
    pub data: Vec<ChannelPair32>,
    pub exp: Exponent,
    pub hr: Headroom,
}

impl BfpVector for BfpChPairS32 {
    type Elem = ChannelPair32;

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

impl BfpChPairS32 {
    /// Wrap a caller-provided channel-pair buffer, computing its headroom.
    pub fn new(data: Vec<ChannelPair32>, exp: Exponent) -> Self {
        let hr = data
            .iter()
            .map(|p| {
                crate::vect::element_headroom(p.ch_a).min(crate::vect::element_headroom(p.ch_b))
            })
            .min()
            .unwrap_or(31);
        Self { data, exp, hr }
    }

    /// Build from two equal-length channel slices.
    pub fn from_channels(ch_a: &[i32], ch_b: &[i32], exp: Exponent) -> Self {
        assert_eq!(ch_a.len(), ch_b.len());
        let data = ch_a
            .iter()
            .zip(ch_b)
            .map(|(&a, &b)| ChannelPair32 { ch_a: a, ch_b: b })
            .collect();
        Self::new(data, exp)
    }

    /// Allocate a zeroed vector of the given length.
    pub fn try_alloc(length: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(length + 2).map_err(|_| {
            log::warn!("BFP allocation of {} channel pairs failed", length + 2);
            anyhow!("allocation of {length} channel pairs failed")
        })?;
        data.resize(length, ChannelPair32::default());
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
}

/// The two packed half-spectra produced by a stereo forward FFT.
///
/// Channel A occupies the first half of the buffer and channel B the second;
/// channel B's aliasing of the shared buffer is internal to this type, which
/// replaces the original's second-channel descriptor flag. Both channels
/// share one exponent and the lesser of the two headrooms.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StereoSpectra {
    pub(crate) data: Vec<Complex32>,
    pub exp: Exponent,
    pub hr: Headroom,
}

impl StereoSpectra {
    /// Number of bins per channel.
    pub fn bins(&self) -> usize {
        self.data.len() / 2
    }

    /// Borrow channel A's packed half-spectrum.
    pub fn channel_a(&self) -> BfpComplexRef<'_> {
        BfpComplexRef {
            data: &self.data[..self.bins()],
            exp: self.exp,
            hr: self.hr,
        }
    }

    /// Borrow channel B's packed half-spectrum. Its buffer is the second half
    /// of channel A's allocation.
    pub fn channel_b(&self) -> BfpComplexRef<'_> {
        BfpComplexRef {
            data: &self.data[self.bins()..],
            exp: self.exp,
            hr: self.hr,
        }
    }

    /// Copy the two half-spectra out into independently-owned vectors, each
    /// with its true headroom.
    pub fn into_channels(self) -> (BfpComplexS32, BfpComplexS32) {
        let bins = self.bins();
        let mut a = self.data;
        let b = a.split_off(bins);
        (
            BfpComplexS32::new(a, self.exp),
            BfpComplexS32::new(b, self.exp),
        )
    }

    /// Reassemble a spectra pair from two owned half-spectra (the inverse of
    /// [`StereoSpectra::into_channels`]). The channels must share a length.
    pub fn from_channels(a: &BfpComplexS32, b: &BfpComplexS32) -> Self {
        assert_eq!(a.len(), b.len());
        let p = crate::vect::prepare::add_sub(a.exp, b.exp, a.hr, b.hr);
        // One common exponent for both halves, chosen like an add so neither
        // channel can saturate in the rescale.
        let exp = p.exp - 1;
        let mut data = Vec::with_capacity(2 * a.len());
        data.extend(a.data.iter().map(|&v| shifted(v, exp - a.exp)));
        data.extend(b.data.iter().map(|&v| shifted(v, exp - b.exp)));
        let hr = vect_c32::headroom(&data);
        Self { data, exp, hr }
    }
}

fn shifted(v: Complex32, shr: i32) -> Complex32 {
    Complex32 {
        re: crate::scalar::s32::ashr32(v.re, shr),
        im: crate::scalar::s32::ashr32(v.im, shr),
    }
}
