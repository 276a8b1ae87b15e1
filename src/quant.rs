//! Quantization table handling
//!
//! Tables are built by linearly scaling a base table with the IJG quality
//! formula and are immutable afterwards.

use crate::consts::{DCTSIZE2, NATURAL_TO_ZIGZAG, STD_CHROMA_QUANT, STD_LUMA_QUANT};
use crate::types::QuantTableConfig;

/// Quality scale factor in percent
///
/// `quality < 50` → `5000 / quality`, otherwise `200 - 2 * quality`.
/// Quality is clamped to 1..=100 first.
#[must_use]
pub fn quality_scale(quality: u8) -> u32 {
    let quality = quality.clamp(1, 100) as u32;
    if quality < 50 {
        5000 / quality
    } else {
        200 - 2 * quality
    }
}

/// Quantization table for one destination slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantTable {
    /// Quantization values in natural order
    pub values: [u16; DCTSIZE2],
    /// Table slot (0-3)
    pub destination: u8,
}

impl QuantTable {
    /// Create a quantization table from an array
    pub fn new(values: [u16; DCTSIZE2], destination: u8) -> Self {
        Self {
            values,
            destination,
        }
    }

    /// Scale a base quantization table by quality factor
    pub fn from_quality(base: &[u16; DCTSIZE2], quality: u8, destination: u8) -> Self {
        let scale = quality_scale(quality);

        let mut values = [0u16; DCTSIZE2];
        for (v, &b) in values.iter_mut().zip(base.iter()) {
            // rounded integer division
            let val = (b as u32 * scale + 50) / 100;
            *v = val.clamp(1, 255) as u16;
        }

        Self {
            values,
            destination,
        }
    }

    /// Standard luminance table at given quality
    pub fn luma_standard(quality: u8) -> Self {
        Self::from_quality(&STD_LUMA_QUANT, quality, 0)
    }

    /// Standard chrominance table at given quality
    pub fn chroma_standard(quality: u8) -> Self {
        Self::from_quality(&STD_CHROMA_QUANT, quality, 1)
    }

    /// Build the table a frame configuration asks for
    pub fn from_config(config: &QuantTableConfig, quality: u8) -> Self {
        Self::from_quality(&config.base, quality, config.destination)
    }

    /// Values in zigzag order, the layout a DQT segment carries
    pub fn zigzag_values(&self) -> [u16; DCTSIZE2] {
        let mut out = [0u16; DCTSIZE2];
        for (n, &v) in self.values.iter().enumerate() {
            out[NATURAL_TO_ZIGZAG[n]] = v;
        }
        out
    }
}
