//! Forward DCT and quantization
//!
//! The 2-D transform is the separable orthonormal DCT-II scaled the way
//! JPEG expects (`F(0,0) = 8 * mean`): a 1-D pass over rows followed by a
//! 1-D pass over columns, both through a precomputed cosine matrix.

use crate::block::{Block8x8, Block8x8F};
use crate::consts::{DCTSIZE, DCTSIZE2, LEVEL_SHIFT, ZIGZAG_TO_NATURAL};
use crate::quant::QuantTable;

/// `COS[u * 8 + x] = C(u)/2 * cos((2x + 1) u π / 16)`, `C(0) = 1/√2`, else 1
#[rustfmt::skip]
const COS: [f32; DCTSIZE2] = [
    0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391, 0.353553391,
    0.490392640, 0.415734806, 0.277785117, 0.097545161, -0.097545161, -0.277785117, -0.415734806, -0.490392640,
    0.461939766, 0.191341716, -0.191341716, -0.461939766, -0.461939766, -0.191341716, 0.191341716, 0.461939766,
    0.415734806, -0.097545161, -0.490392640, -0.277785117, 0.277785117, 0.490392640, 0.097545161, -0.415734806,
    0.353553391, -0.353553391, -0.353553391, 0.353553391, 0.353553391, -0.353553391, -0.353553391, 0.353553391,
    0.277785117, -0.490392640, 0.097545161, 0.415734806, -0.415734806, -0.097545161, 0.490392640, -0.277785117,
    0.191341716, -0.461939766, 0.461939766, -0.191341716, -0.191341716, 0.461939766, -0.461939766, 0.191341716,
    0.097545161, -0.277785117, 0.415734806, -0.490392640, 0.490392640, -0.415734806, 0.277785117, -0.097545161,
];

/// Largest magnitude a quantized DC coefficient may take
pub const MAX_DC: i16 = 2047;

/// Largest magnitude a quantized AC coefficient may take (category 10)
pub const MAX_AC: i16 = 1023;

/// Subtract the 8-bit level shift from every sample
#[inline]
pub fn level_shift(block: &mut Block8x8F) {
    block.add_scalar(-LEVEL_SHIFT);
}

/// In-place forward 8x8 DCT of a level-shifted block (natural order)
pub fn forward_dct(block: &mut Block8x8F) {
    let mut tmp = [0.0f32; DCTSIZE2];

    // rows: tmp[y][u] = sum_x COS[u][x] * in[y][x]
    for y in 0..DCTSIZE {
        let row = &block.0[y * DCTSIZE..(y + 1) * DCTSIZE];
        for u in 0..DCTSIZE {
            let basis = &COS[u * DCTSIZE..(u + 1) * DCTSIZE];
            let mut sum = 0.0f32;
            for x in 0..DCTSIZE {
                sum += basis[x] * row[x];
            }
            tmp[y * DCTSIZE + u] = sum;
        }
    }

    // columns: out[v][u] = sum_y COS[v][y] * tmp[y][u]
    for v in 0..DCTSIZE {
        let basis = &COS[v * DCTSIZE..(v + 1) * DCTSIZE];
        for u in 0..DCTSIZE {
            let mut sum = 0.0f32;
            for y in 0..DCTSIZE {
                sum += basis[y] * tmp[y * DCTSIZE + u];
            }
            block.0[v * DCTSIZE + u] = sum;
        }
    }
}

/// Quantize natural-order DCT coefficients and emit them in zigzag order.
///
/// Rounds half away from zero, then clamps to what the baseline Huffman
/// categories can represent.
pub fn quantize(coeffs: &Block8x8F, table: &QuantTable) -> Block8x8 {
    let mut out = Block8x8::default();
    for (zz, v) in out.0.iter_mut().enumerate() {
        let n = ZIGZAG_TO_NATURAL[zz];
        let q = (coeffs.0[n] / table.values[n] as f32).round();
        let limit = if zz == 0 { MAX_DC } else { MAX_AC } as f32;
        *v = q.clamp(-limit, limit) as i16;
    }
    out
}

/// Level shift, transform and quantize one tile of 8-bit-range samples
pub fn transform_block(tile: &mut Block8x8F, table: &QuantTable) -> Block8x8 {
    level_shift(tile);
    forward_dct(tile);
    quantize(tile, table)
}
