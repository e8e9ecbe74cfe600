//! Block floating-point vectors: a mantissa buffer paired with a shared
//! exponent and tracked headroom.
//!
//! Every operation follows the same pattern: a prepare routine picks the
//! output exponent and input shifts from the operands' metadata, the matching
//! kernel produces the mantissas, and the vector's exponent and headroom are
//! updated together. After any method returns, `hr` is the true minimum
//! headroom of the buffer.
//!
//! Buffers are owned `Vec`s; ownership replaces the original's allocation
//! flag bits, and `Drop` replaces explicit deallocation.

pub mod complex_s16;
pub mod complex_s32;
pub mod fft;
pub mod s16;
pub mod s32;
pub mod stereo;

pub use complex_s16::BfpComplexS16;
pub use complex_s32::BfpComplexS32;
pub use s16::BfpS16;
pub use s32::BfpS32;
pub use stereo::{BfpChPairS32, StereoSpectra};

use crate::types::{Complex32, Exponent, Headroom};

/// Read-only surface shared by the BFP vector types.
pub trait BfpVector {
    type Elem;

    fn len(&self) -> usize;
    fn exp(&self) -> Exponent;
    fn hr(&self) -> Headroom;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed view of a complex 32-bit BFP vector, e.g. one channel of a
/// stereo spectra pair. The view's lifetime ties it to the owning buffer.
#[derive(Copy, Clone, Debug)]
pub struct BfpComplexRef<'a> {
    pub data: &'a [Complex32],
    pub exp: Exponent,
    pub hr: Headroom,
}
