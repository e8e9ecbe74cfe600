//! Precomputed Q30 twiddle tables.
//!
//! Both tables hold one row per butterfly stage size `m` in {8, 16, ..., 1024},
//! where the row for stage `m` is `e^(-j*2*pi*k/m)` for `k < m/2`. The
//! decimation-in-time table stores rows smallest-stage-first (row for stage
//! `m` begins at complex offset `m/2 - 4`); the decimation-in-frequency table
//! stores the same rows largest-stage-first (offset `2^10 - m`). Stages of
//! size 2 and 4 use trivial twiddles (1 and -j) and have no table rows.

use static_assertions::const_assert_eq;

use crate::types::Complex32;

/// Maximum supported FFT length, as a log2.
pub const MAX_FFT_LOG2: usize = 10;

/// Entries in each twiddle table.
pub const TWIDDLE_TABLE_LEN: usize = (1 << MAX_FFT_LOG2) - 4;

const_assert_eq!(TWIDDLE_TABLE_LEN, 1020);

include!(concat!(env!("OUT_DIR"), "/twiddle_tables.rs"));

/// Twiddle row for a decimation-in-time stage of size `m` (`8 <= m <= 1024`).
pub(crate) fn dit_stage(m: usize) -> &'static [Complex32] {
    debug_assert!(m.is_power_of_two() && (8..=1 << MAX_FFT_LOG2).contains(&m));
    let half_m = m / 2;
    &DIT_TWIDDLES[half_m - 4..][..half_m]
}

/// Twiddle row for a decimation-in-frequency stage of size `m`.
pub(crate) fn dif_stage(m: usize) -> &'static [Complex32] {
    debug_assert!(m.is_power_of_two() && (8..=1 << MAX_FFT_LOG2).contains(&m));
    &DIF_TWIDDLES[(1 << MAX_FFT_LOG2) - m..][..m / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q30: i32 = 1 << 30;

    #[test]
    fn tables_have_expected_size() {
        assert_eq!(DIT_TWIDDLES.len(), TWIDDLE_TABLE_LEN);
        assert_eq!(DIF_TWIDDLES.len(), TWIDDLE_TABLE_LEN);
    }

    #[test]
    fn stage_rows_agree_between_tables() {
        for lg in 3..=MAX_FFT_LOG2 {
            let m = 1 << lg;
            assert_eq!(dit_stage(m), dif_stage(m));
        }
    }

    #[test]
    fn known_twiddle_values() {
        // Row for stage 8: k=0 is 1, k=2 is -j.
        let row = dit_stage(8);
        assert_eq!(row[0], Complex32::new(Q30, 0));
        assert_eq!(row[2], Complex32::new(0, -Q30));
        // k=1 is (1 - j)/sqrt(2): components of equal magnitude.
        assert_eq!(row[1].re, -row[1].im);

        // Every entry has magnitude ~1.0 in Q30.
        for &t in dit_stage(1 << MAX_FFT_LOG2) {
            let mag2 = t.re as i64 * t.re as i64 + t.im as i64 * t.im as i64;
            let err = mag2 - (1i64 << 60);
            assert!(err.abs() < 1i64 << 32, "twiddle off unit circle: {t:?}");
        }
    }

    #[test]
    fn rows_are_half_turn_symmetric() {
        // w^(k + m/4) = -j * w^k within the row for stage m.
        let m = 64;
        let row = dit_stage(m);
        for k in 0..m / 4 {
            let a = row[k + m / 4];
            let b = row[k];
            assert!((a.re - b.im).abs() <= 1);
            assert!((a.im + b.re).abs() <= 1);
        }
    }
}
