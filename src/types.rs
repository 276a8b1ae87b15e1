//! Core types for zenjpeg-scan

use crate::consts::{
    AC_CHROMINANCE_COUNTS, AC_CHROMINANCE_VALUES, AC_LUMINANCE_COUNTS, AC_LUMINANCE_VALUES,
    DC_CHROMINANCE_COUNTS, DC_CHROMINANCE_VALUES, DC_LUMINANCE_COUNTS, DC_LUMINANCE_VALUES,
    STD_CHROMA_QUANT, STD_LUMA_QUANT,
};
use crate::huffman::HuffmanSpec;

/// Color space the frame is encoded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Single luma channel
    Luminance,
    /// JFIF YCbCr (BT.601 full range)
    #[default]
    YCbCr,
    /// RGB stored as-is, no transform
    Rgb,
    /// Adobe-style inverted CMYK
    Cmyk,
    /// Adobe-style YCbCr plus inverted K
    Ycck,
}

impl ColorSpace {
    /// Number of encoded channels
    #[must_use]
    pub const fn channel_count(self) -> usize {
        match self {
            ColorSpace::Luminance => 1,
            ColorSpace::YCbCr | ColorSpace::Rgb => 3,
            ColorSpace::Cmyk | ColorSpace::Ycck => 4,
        }
    }
}

/// Huffman table class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableClass {
    /// DC difference categories (symbols 0..=15)
    Dc,
    /// AC run/size pairs
    Ac,
}

impl TableClass {
    /// Class id as written in a DHT segment
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            TableClass::Dc => 0,
            TableClass::Ac => 1,
        }
    }
}

/// Chroma subsampling mode, expressed as the luma sampling factors
/// (chroma is always 1x1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsampling {
    /// No subsampling (4:4:4) - highest quality
    S444,
    /// Horizontal subsampling only (4:2:2)
    S422,
    /// Both horizontal and vertical (4:2:0)
    #[default]
    S420,
    /// Quarter horizontal resolution (4:1:1)
    S411,
    /// Quarter horizontal, half vertical (4:1:0)
    S410,
}

impl Subsampling {
    /// Horizontal sampling factor of the luma component
    #[must_use]
    pub const fn h_factor(self) -> u8 {
        match self {
            Subsampling::S444 => 1,
            Subsampling::S422 | Subsampling::S420 => 2,
            Subsampling::S411 | Subsampling::S410 => 4,
        }
    }

    /// Vertical sampling factor of the luma component
    #[must_use]
    pub const fn v_factor(self) -> u8 {
        match self {
            Subsampling::S444 | Subsampling::S422 | Subsampling::S411 => 1,
            Subsampling::S420 | Subsampling::S410 => 2,
        }
    }
}

/// Per-channel configuration record a [`Component`](crate::Component) is
/// built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentConfig {
    /// Component identifier written in frame and scan headers
    pub id: u8,
    pub h_factor: u8,
    pub v_factor: u8,
    /// Quantization table destination
    pub quant_index: u8,
    /// DC Huffman table destination
    pub dc_table: u8,
    /// AC Huffman table destination
    pub ac_table: u8,
}

impl ComponentConfig {
    pub const fn new(id: u8, h_factor: u8, v_factor: u8, table: u8) -> Self {
        Self {
            id,
            h_factor,
            v_factor,
            quant_index: table,
            dc_table: table,
            ac_table: table,
        }
    }
}

/// A Huffman table to register with the scan encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTableConfig {
    pub class: TableClass,
    pub destination: u8,
    pub spec: HuffmanSpec,
}

/// A quantization base table to scale by quality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTableConfig {
    pub destination: u8,
    /// Base table in natural order
    pub base: [u16; 64],
}

/// Full description of how a frame is laid out: components, their
/// sampling factors and the tables they reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    pub color_space: ColorSpace,
    pub components: Vec<ComponentConfig>,
    pub huffman_tables: Vec<HuffmanTableConfig>,
    pub quant_tables: Vec<QuantTableConfig>,
}

impl FrameConfig {
    /// Single-channel grayscale frame
    pub fn luminance() -> Self {
        Self {
            color_space: ColorSpace::Luminance,
            components: vec![ComponentConfig::new(1, 1, 1, 0)],
            huffman_tables: luma_huffman_tables(),
            quant_tables: vec![QuantTableConfig {
                destination: 0,
                base: STD_LUMA_QUANT,
            }],
        }
    }

    /// JFIF YCbCr frame with the given chroma subsampling
    pub fn ycbcr(subsampling: Subsampling) -> Self {
        let mut huffman_tables = luma_huffman_tables();
        huffman_tables.extend(chroma_huffman_tables());
        Self {
            color_space: ColorSpace::YCbCr,
            components: vec![
                ComponentConfig::new(1, subsampling.h_factor(), subsampling.v_factor(), 0),
                ComponentConfig::new(2, 1, 1, 1),
                ComponentConfig::new(3, 1, 1, 1),
            ],
            huffman_tables,
            quant_tables: both_quant_tables(),
        }
    }

    /// Untransformed RGB, component ids 'R', 'G', 'B'
    pub fn rgb() -> Self {
        Self {
            color_space: ColorSpace::Rgb,
            components: vec![
                ComponentConfig::new(b'R', 1, 1, 0),
                ComponentConfig::new(b'G', 1, 1, 0),
                ComponentConfig::new(b'B', 1, 1, 0),
            ],
            huffman_tables: luma_huffman_tables(),
            quant_tables: vec![QuantTableConfig {
                destination: 0,
                base: STD_LUMA_QUANT,
            }],
        }
    }

    /// Adobe inverted CMYK
    pub fn cmyk() -> Self {
        Self {
            color_space: ColorSpace::Cmyk,
            components: (1..=4).map(|id| ComponentConfig::new(id, 1, 1, 0)).collect(),
            huffman_tables: luma_huffman_tables(),
            quant_tables: vec![QuantTableConfig {
                destination: 0,
                base: STD_LUMA_QUANT,
            }],
        }
    }

    /// Adobe YCCK: luma tables for Y and K, chroma tables for Cb/Cr
    pub fn ycck() -> Self {
        let mut huffman_tables = luma_huffman_tables();
        huffman_tables.extend(chroma_huffman_tables());
        Self {
            color_space: ColorSpace::Ycck,
            components: vec![
                ComponentConfig::new(1, 1, 1, 0),
                ComponentConfig::new(2, 1, 1, 1),
                ComponentConfig::new(3, 1, 1, 1),
                ComponentConfig::new(4, 1, 1, 0),
            ],
            huffman_tables,
            quant_tables: both_quant_tables(),
        }
    }

    /// Default frame layout for a color space. YCbCr uses 4:2:0.
    pub fn for_color_space(color_space: ColorSpace) -> Self {
        match color_space {
            ColorSpace::Luminance => Self::luminance(),
            ColorSpace::YCbCr => Self::ycbcr(Subsampling::default()),
            ColorSpace::Rgb => Self::rgb(),
            ColorSpace::Cmyk => Self::cmyk(),
            ColorSpace::Ycck => Self::ycck(),
        }
    }

    /// Largest horizontal and vertical sampling factors over all components
    #[must_use]
    pub fn max_sampling_factors(&self) -> (u8, u8) {
        self.components.iter().fold((1, 1), |(h, v), c| {
            (h.max(c.h_factor), v.max(c.v_factor))
        })
    }
}

fn luma_huffman_tables() -> Vec<HuffmanTableConfig> {
    vec![
        HuffmanTableConfig {
            class: TableClass::Dc,
            destination: 0,
            spec: HuffmanSpec::new(DC_LUMINANCE_COUNTS, DC_LUMINANCE_VALUES.to_vec()),
        },
        HuffmanTableConfig {
            class: TableClass::Ac,
            destination: 0,
            spec: HuffmanSpec::new(AC_LUMINANCE_COUNTS, AC_LUMINANCE_VALUES.to_vec()),
        },
    ]
}

fn chroma_huffman_tables() -> Vec<HuffmanTableConfig> {
    vec![
        HuffmanTableConfig {
            class: TableClass::Dc,
            destination: 1,
            spec: HuffmanSpec::new(DC_CHROMINANCE_COUNTS, DC_CHROMINANCE_VALUES.to_vec()),
        },
        HuffmanTableConfig {
            class: TableClass::Ac,
            destination: 1,
            spec: HuffmanSpec::new(AC_CHROMINANCE_COUNTS, AC_CHROMINANCE_VALUES.to_vec()),
        },
    ]
}

fn both_quant_tables() -> Vec<QuantTableConfig> {
    vec![
        QuantTableConfig {
            destination: 0,
            base: STD_LUMA_QUANT,
        },
        QuantTableConfig {
            destination: 1,
            base: STD_CHROMA_QUANT,
        },
    ]
}

/// Progressive scan script.
///
/// Only spectral selection is supported; every scan is coded at full
/// precision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanScript {
    /// DC scan followed by one full AC scan (1-63) per component
    #[default]
    Minimal,

    /// DC scan, then AC bands 1-5 and 6-63 per component
    Simple,

    /// Custom scan script
    Custom(Vec<crate::progressive::ScanInfo>),
}
