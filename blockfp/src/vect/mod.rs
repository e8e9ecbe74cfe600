pub mod complex_s16;
pub mod complex_s32;
pub mod prepare;
pub mod s16;
pub mod s32;

use num::PrimInt;

use crate::types::Headroom;

/// Headroom of a single signed mantissa of any primitive width.
#[inline]
pub(crate) fn element_headroom<T: PrimInt>(x: T) -> Headroom {
    let bits = T::zero().count_zeros();
    (x ^ x.signed_shr(bits - 1)).leading_zeros() - 1
}

/// Minimum headroom over a mantissa buffer.
pub(crate) fn buffer_headroom<T: PrimInt>(x: &[T]) -> Headroom {
    let bits = T::zero().count_zeros();
    x.iter()
        .map(|&v| element_headroom(v))
        .min()
        .unwrap_or(bits - 1)
}
