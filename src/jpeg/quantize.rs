//! Quantization tables, quality scaling, and the zig-zag permutation.

/// Natural (raster) index for each position of the zig-zag scan.
///
/// Quantization tables and entropy-coded coefficients travel in this order;
/// `ZIGZAG[k]` is where coefficient `k` of the stream lives in an 8x8 block.
pub const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, //
    17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, //
    27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, //
    29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, //
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Reorder a block from natural order into zig-zag order.
#[inline]
pub fn zigzag_reorder(block: &[i16; 64]) -> [i16; 64] {
    let mut out = [0i16; 64];
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = block[ZIGZAG[k]];
    }
    out
}

/// Reorder a block from zig-zag order back to natural order.
#[inline]
pub fn inverse_zigzag(zz: &[i32; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (k, &value) in zz.iter().enumerate() {
        out[ZIGZAG[k]] = value;
    }
    out
}

/// Annex K luminance quantization table, natural order.
const BASE_LUMA: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Annex K chrominance quantization table, natural order.
const BASE_CHROMA: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, //
    18, 21, 26, 66, 99, 99, 99, 99, //
    24, 26, 56, 99, 99, 99, 99, 99, //
    47, 66, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Encoder quantization tables scaled for a quality setting.
///
/// Stored in zig-zag order, the order both the DQT payload and the
/// post-zig-zag quantization step want.
pub struct QuantTables {
    pub luma: [u8; 64],
    pub chroma: [u8; 64],
}

impl QuantTables {
    /// Scale the Annex K tables for `quality`, clamped to 1..=100.
    ///
    /// quality 50 keeps the base tables; lower is coarser, 100 sets every
    /// divisor to 1.
    pub fn with_quality(quality: u8) -> Self {
        let quality = quality.clamp(1, 100) as u32;
        let scale = if quality < 50 {
            5000 / quality
        } else {
            200 - 2 * quality
        };

        let scaled = |base: &[u16; 64]| {
            let mut out = [0u8; 64];
            for (k, slot) in out.iter_mut().enumerate() {
                let value = (base[ZIGZAG[k]] as u32 * scale + 50) / 100;
                *slot = value.clamp(1, 255) as u8;
            }
            out
        };

        QuantTables {
            luma: scaled(&BASE_LUMA),
            chroma: scaled(&BASE_CHROMA),
        }
    }
}

/// Quantize a zig-zag-ordered DCT block: round-half-away integer division by
/// the matching table entry.
#[inline]
pub fn quantize_block(zz: &[f32; 64], table: &[u8; 64]) -> [i16; 64] {
    let mut out = [0i16; 64];
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = (zz[k] / table[k] as f32).round() as i16;
    }
    out
}
