//! Forward and inverse 8x8 DCT.
//!
//! The encoder uses a separable floating-point DCT-II. The decoder uses the
//! 13-bit fixed-point inverse transform (the Loeffler-Ligtenberg-Moschytz
//! factorization used by libjpeg's accurate path), which keeps results within
//! one ULP of the reference transform.

use std::sync::OnceLock;

/// cos((2n + 1) * k * pi / 16) for the separable forward transform.
fn cos_table() -> &'static [[f32; 8]; 8] {
    static TABLE: OnceLock<[[f32; 8]; 8]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0.0f32; 8]; 8];
        for (n, row) in table.iter_mut().enumerate() {
            for (k, entry) in row.iter_mut().enumerate() {
                *entry =
                    ((2.0 * n as f64 + 1.0) * k as f64 * std::f64::consts::PI / 16.0).cos() as f32;
            }
        }
        table
    })
}

const INV_SQRT2: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[inline]
fn dct_1d(input: &[f32; 8]) -> [f32; 8] {
    let table = cos_table();
    let mut out = [0.0f32; 8];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (n, &x) in input.iter().enumerate() {
            sum += x * table[n][k];
        }
        let scale = if k == 0 { INV_SQRT2 } else { 1.0 };
        *slot = 0.5 * scale * sum;
    }
    out
}

/// Forward 2D DCT of a level-shifted 8x8 block in natural order.
pub fn forward_dct(block: &[f32; 64]) -> [f32; 64] {
    let mut rows = [0.0f32; 64];
    for r in 0..8 {
        let mut input = [0.0f32; 8];
        input.copy_from_slice(&block[r * 8..r * 8 + 8]);
        rows[r * 8..r * 8 + 8].copy_from_slice(&dct_1d(&input));
    }

    let mut out = [0.0f32; 64];
    for c in 0..8 {
        let mut input = [0.0f32; 8];
        for r in 0..8 {
            input[r] = rows[r * 8 + c];
        }
        let transformed = dct_1d(&input);
        for r in 0..8 {
            out[r * 8 + c] = transformed[r];
        }
    }
    out
}

// 13-bit fixed-point constants: round(x * 8192).
const CONST_BITS: i64 = 13;
const PASS1_BITS: i64 = 2;
const FIX_0_298631336: i64 = 2446;
const FIX_0_390180644: i64 = 3196;
const FIX_0_541196100: i64 = 4433;
const FIX_0_765366865: i64 = 6270;
const FIX_0_899976223: i64 = 7373;
const FIX_1_175875602: i64 = 9633;
const FIX_1_501321110: i64 = 12299;
const FIX_1_847759065: i64 = 15137;
const FIX_1_961570560: i64 = 16069;
const FIX_2_053119869: i64 = 16819;
const FIX_2_562915447: i64 = 20995;
const FIX_3_072711026: i64 = 25172;

#[inline]
fn descale(value: i64, shift: i64) -> i64 {
    (value + (1 << (shift - 1))) >> shift
}

/// One-dimensional pass over (s0..s7); returns the butterfly outputs before
/// descaling.
#[inline]
#[allow(clippy::too_many_arguments)]
fn idct_1d(
    s0: i64,
    s1: i64,
    s2: i64,
    s3: i64,
    s4: i64,
    s5: i64,
    s6: i64,
    s7: i64,
) -> [i64; 8] {
    // Even part.
    let z1 = (s2 + s6) * FIX_0_541196100;
    let tmp2 = z1 - s6 * FIX_1_847759065;
    let tmp3 = z1 + s2 * FIX_0_765366865;

    let tmp0 = (s0 + s4) << CONST_BITS;
    let tmp1 = (s0 - s4) << CONST_BITS;

    let t10 = tmp0 + tmp3;
    let t13 = tmp0 - tmp3;
    let t11 = tmp1 + tmp2;
    let t12 = tmp1 - tmp2;

    // Odd part.
    let (mut o0, mut o1, mut o2, mut o3) = (s7, s5, s3, s1);
    let z1 = o0 + o3;
    let z2 = o1 + o2;
    let z3 = o0 + o2;
    let z4 = o1 + o3;
    let z5 = (z3 + z4) * FIX_1_175875602;

    o0 *= FIX_0_298631336;
    o1 *= FIX_2_053119869;
    o2 *= FIX_3_072711026;
    o3 *= FIX_1_501321110;
    let z1 = -z1 * FIX_0_899976223;
    let z2 = -z2 * FIX_2_562915447;
    let z3 = -z3 * FIX_1_961570560 + z5;
    let z4 = -z4 * FIX_0_390180644 + z5;

    let o0 = o0 + z1 + z3;
    let o1 = o1 + z2 + z4;
    let o2 = o2 + z2 + z3;
    let o3 = o3 + z1 + z4;

    [
        t10 + o3,
        t11 + o2,
        t12 + o1,
        t13 + o0,
        t13 - o0,
        t12 - o1,
        t11 - o2,
        t10 - o3,
    ]
}

/// Inverse 2D DCT of a dequantized block in natural order, with level shift:
/// output samples are `clamp(pixel + 128, 0, 255)`.
pub fn idct_8x8(coeffs: &[i32; 64]) -> [u8; 64] {
    let mut workspace = [0i64; 64];

    // Columns first.
    for col in 0..8 {
        let s: [i64; 8] = std::array::from_fn(|row| coeffs[row * 8 + col] as i64);
        if s[1..].iter().all(|&v| v == 0) {
            let dc = s[0] << PASS1_BITS;
            for row in 0..8 {
                workspace[row * 8 + col] = dc;
            }
            continue;
        }
        let out = idct_1d(s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]);
        for (row, &value) in out.iter().enumerate() {
            workspace[row * 8 + col] = descale(value, CONST_BITS - PASS1_BITS);
        }
    }

    // Then rows, with the final descale and level shift.
    let mut pixels = [0u8; 64];
    for row in 0..8 {
        let s: [i64; 8] = std::array::from_fn(|col| workspace[row * 8 + col]);
        if s[1..].iter().all(|&v| v == 0) {
            let value = (descale(s[0], PASS1_BITS + 3) + 128).clamp(0, 255) as u8;
            pixels[row * 8..row * 8 + 8].fill(value);
            continue;
        }
        let out = idct_1d(s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7]);
        for (col, &value) in out.iter().enumerate() {
            let sample = descale(value, CONST_BITS + PASS1_BITS + 3) + 128;
            pixels[row * 8 + col] = sample.clamp(0, 255) as u8;
        }
    }

    pixels
}
