//! Fixed-size 8x8 coefficient blocks.

use std::ops::{Index, IndexMut};

use crate::consts::{DCTSIZE, DCTSIZE2, ZIGZAG_TO_NATURAL};

/// 64 floats in natural (row-major) order: a level-shifted tile or its
/// DCT coefficients before quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block8x8F(pub [f32; DCTSIZE2]);

impl Default for Block8x8F {
    fn default() -> Self {
        Self([0.0; DCTSIZE2])
    }
}

impl Block8x8F {
    /// Copy an 8x8 tile out of a planar buffer whose rows are `stride` floats apart.
    pub fn load_from(&mut self, plane: &[f32], stride: usize, x: usize, y: usize) {
        for row in 0..DCTSIZE {
            let start = (y + row) * stride + x;
            self.0[row * DCTSIZE..(row + 1) * DCTSIZE]
                .copy_from_slice(&plane[start..start + DCTSIZE]);
        }
    }

    /// Add `value` to every sample
    pub fn add_scalar(&mut self, value: f32) {
        for v in self.0.iter_mut() {
            *v += value;
        }
    }
}

impl Index<usize> for Block8x8F {
    type Output = f32;

    #[inline]
    fn index(&self, i: usize) -> &f32 {
        &self.0[i]
    }
}

impl IndexMut<usize> for Block8x8F {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.0[i]
    }
}

/// 64 quantized coefficients. Blocks stored in a spectral buffer are in
/// zigzag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block8x8(pub [i16; DCTSIZE2]);

impl Default for Block8x8 {
    fn default() -> Self {
        Self([0; DCTSIZE2])
    }
}

impl Block8x8 {
    /// DC coefficient (index 0 in both orders)
    #[inline]
    pub fn dc(&self) -> i16 {
        self.0[0]
    }

    /// Index of the last nonzero coefficient at or after `start`, scanning
    /// up to (but excluding) `end`. `None` when the range is all zero.
    #[inline]
    pub fn last_nonzero_in(&self, start: usize, end: usize) -> Option<usize> {
        (start..end).rev().find(|&i| self.0[i] != 0)
    }

    /// Reorder a natural-order block into zigzag order
    pub fn natural_to_zigzag(natural: &[i16; DCTSIZE2]) -> Self {
        let mut out = [0i16; DCTSIZE2];
        for (zz, v) in out.iter_mut().enumerate() {
            *v = natural[ZIGZAG_TO_NATURAL[zz]];
        }
        Self(out)
    }

    /// Back to natural order, for inspection and tests
    pub fn to_natural(&self) -> [i16; DCTSIZE2] {
        let mut out = [0i16; DCTSIZE2];
        for (zz, &v) in self.0.iter().enumerate() {
            out[ZIGZAG_TO_NATURAL[zz]] = v;
        }
        out
    }
}

impl Index<usize> for Block8x8 {
    type Output = i16;

    #[inline]
    fn index(&self, i: usize) -> &i16 {
        &self.0[i]
    }
}

impl IndexMut<usize> for Block8x8 {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut i16 {
        &mut self.0[i]
    }
}
