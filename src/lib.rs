//! # zenjpeg-scan - JPEG pixel-to-bitstream core
//!
//! Turns pixel rows into the entropy-coded scans of a baseline or
//! spectral-selection progressive JPEG frame: color conversion and chroma
//! subsampling, forward DCT and quantization, then Huffman coding with
//! byte stuffing and restart markers.
//!
//! Container framing (SOI, DQT, DHT, SOF, SOS, EOI) is left to the caller;
//! [`EncodedImage`] carries the tables and component layout needed to
//! write those segments around its scans.
//!
//! ## Usage
//!
//! ```rust
//! use imgref::ImgVec;
//! use rgb::RGB8;
//! use zenjpeg_scan::{CancellationToken, Encoder, Subsampling};
//!
//! let img = ImgVec::new(vec![RGB8::new(200, 80, 40); 32 * 16], 32, 16);
//! let image = Encoder::new()
//!     .quality(90)
//!     .subsampling(Subsampling::S422)
//!     .restart_interval(4)
//!     .encode(img.as_ref(), &CancellationToken::new())?;
//! assert_eq!(image.scans.len(), 1);
//! # Ok::<(), zenjpeg_scan::Error>(())
//! ```
//!
//! ## Lower-level pieces
//!
//! [`Frame`], [`SpectralConverter`] and [`ScanEncoder`] are the stages
//! [`Encoder`] drives. They can be used directly to control buffering,
//! for example to convert the whole image once and emit several scans
//! from it.

// Core modules
mod consts;
mod error;
mod types;

// Frame model and pixel input
mod block;
mod cancel;
mod color;
mod frame;
mod source;

// Spectral transform
mod convert;
mod dct;
mod quant;

// Entropy coding
mod bitstream;
mod entropy;
mod huffman;

// Orchestration
mod encode;
mod progressive;

// Public API
pub use bitstream::BitWriter;
pub use block::{Block8x8, Block8x8F};
pub use cancel::CancellationToken;
pub use color::{ColorConverter, PlanarPixel};
pub use consts::{
    marker, AC_CHROMINANCE_COUNTS, AC_CHROMINANCE_VALUES, AC_LUMINANCE_COUNTS,
    AC_LUMINANCE_VALUES, DCTSIZE, DCTSIZE2, DC_CHROMINANCE_COUNTS, DC_CHROMINANCE_VALUES,
    DC_LUMINANCE_COUNTS, DC_LUMINANCE_VALUES, NATURAL_TO_ZIGZAG, STD_CHROMA_QUANT,
    STD_LUMA_QUANT, ZIGZAG_TO_NATURAL,
};
pub use convert::{subsample_plane, SpectralConverter};
pub use dct::{forward_dct, level_shift, quantize, transform_block};
pub use encode::{EncodedImage, EncodedScan, Encoder, DEFAULT_QUALITY};
pub use entropy::ScanEncoder;
pub use error::{Error, Result};
pub use frame::{Component, Frame, FrameGeometry, SpectralBuffer};
pub use huffman::{category, HuffmanLut, HuffmanSpec};
pub use progressive::{
    generate_minimal_progressive_scans, generate_simple_progressive_scans, validate_scan_script,
    ScanInfo,
};
pub use quant::{quality_scale, QuantTable};
pub use source::PixelRows;
pub use types::{
    ColorSpace, ComponentConfig, FrameConfig, HuffmanTableConfig, QuantTableConfig, ScanScript,
    Subsampling, TableClass,
};
