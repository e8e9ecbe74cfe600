use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::Path;
use std::{env, fs};

const MAX_FFT_LOG2: u32 = 10;
const Q30_ONE: f64 = (1i64 << 30) as f64;

fn q30(x: f64) -> i32 {
    let v = (x * Q30_ONE).round() as i64;
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Twiddles for one butterfly stage of size `m`: e^(-j*2*pi*k/m) for k < m/2, in Q30.
fn stage_row(m: usize) -> Vec<(i32, i32)> {
    (0..m / 2)
        .map(|k| {
            let theta = 2.0 * PI * (k as f64) / (m as f64);
            (q30(theta.cos()), q30(-theta.sin()))
        })
        .collect()
}

fn emit_table(src: &mut String, name: &str, rows: impl Iterator<Item = usize>) {
    let entries: Vec<(i32, i32)> = rows.flat_map(stage_row).collect();
    writeln!(
        src,
        "pub(crate) static {}: [Complex32; {}] = [",
        name,
        entries.len()
    )
    .unwrap();
    for (re, im) in entries {
        writeln!(src, "    Complex32 {{ re: {re}, im: {im} }},").unwrap();
    }
    writeln!(src, "];").unwrap();
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("twiddle_tables.rs");

    let mut src = String::new();
    // Decimation-in-time reads stages smallest-first, decimation-in-frequency
    // largest-first; each table is laid out in its own reading order.
    emit_table(&mut src, "DIT_TWIDDLES", (3..=MAX_FFT_LOG2).map(|lg| 1 << lg));
    emit_table(
        &mut src,
        "DIF_TWIDDLES",
        (3..=MAX_FFT_LOG2).rev().map(|lg| 1 << lg),
    );

    fs::write(&dest, src).unwrap();
    println!("cargo:rerun-if-changed=build.rs");
}
