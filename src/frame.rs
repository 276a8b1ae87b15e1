//! Frame and component geometry, and per-component spectral storage.
//!
//! A [`Frame`] is built once per image from a [`FrameConfig`]. Building it
//! runs [`Component::init`] on every component, which derives the block
//! grid from the frame's MCU layout. Spectral buffers are allocated in a
//! second step ([`Frame::allocate_spectral`]) so callers can choose
//! between a whole-image buffer and a one-MCU-row strip.

use crate::block::Block8x8;
use crate::consts::{DCTSIZE, MAX_DIMENSION, MAX_SAMPLING_FACTOR};
use crate::error::{Error, Result};
use crate::types::{ColorSpace, ComponentConfig, FrameConfig};

/// Most blocks an interleaved MCU may hold
pub const MAX_BLOCKS_PER_MCU: usize = 10;

/// Blocks of one component in a 2-D grid, row-major.
#[derive(Debug, Clone)]
pub struct SpectralBuffer {
    width: usize,
    height: usize,
    blocks: Vec<Block8x8>,
}

impl SpectralBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            blocks: vec![Block8x8::default(); width * height],
        }
    }

    /// Blocks per row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Block rows
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> &[Block8x8] {
        &self.blocks[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [Block8x8] {
        &mut self.blocks[y * self.width..(y + 1) * self.width]
    }

    pub fn block(&self, x: usize, y: usize) -> &Block8x8 {
        &self.blocks[y * self.width + x]
    }
}

/// Pixel size and MCU layout shared by all components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
    pub mcus_per_line: usize,
    pub mcus_per_column: usize,
}

/// One color channel's encoding state.
#[derive(Debug, Clone)]
pub struct Component {
    /// Position in the frame's component list
    pub index: usize,
    pub id: u8,
    pub h_factor: u8,
    pub v_factor: u8,
    pub quant_index: u8,
    pub dc_table: u8,
    pub ac_table: u8,
    /// Last DC value emitted for this component in the current scan
    pub dc_predictor: i32,
    /// Blocks that cover the component's pixels, per row
    pub width_in_blocks: usize,
    /// Blocks that cover the component's pixels, per column
    pub height_in_blocks: usize,
    /// Block grid padded to whole MCUs: (columns, rows)
    pub size_in_blocks: (usize, usize),
    /// (max_h / h, max_v / v)
    pub subsampling_divisors: (usize, usize),
    spectral: Option<SpectralBuffer>,
}

impl Component {
    pub fn new(index: usize, config: &ComponentConfig) -> Self {
        Self {
            index,
            id: config.id,
            h_factor: config.h_factor,
            v_factor: config.v_factor,
            quant_index: config.quant_index,
            dc_table: config.dc_table,
            ac_table: config.ac_table,
            dc_predictor: 0,
            width_in_blocks: 0,
            height_in_blocks: 0,
            size_in_blocks: (0, 0),
            subsampling_divisors: (0, 0),
            spectral: None,
        }
    }

    /// Derive block geometry against the frame's maximum sampling factors.
    pub fn init(&mut self, geometry: &FrameGeometry, max_h: u8, max_v: u8) -> Result<()> {
        let (h, v) = (self.h_factor, self.v_factor);
        let invalid = |reason| Error::InvalidSamplingFactors {
            component: self.index,
            horizontal: h,
            vertical: v,
            reason,
        };

        if !(1..=MAX_SAMPLING_FACTOR).contains(&h) || !(1..=MAX_SAMPLING_FACTOR).contains(&v) {
            return Err(invalid("sampling factors must be in 1..=4"));
        }

        let div_h = (max_h / h) as usize;
        let div_v = (max_v / v) as usize;
        if div_h == 0 || div_v == 0 {
            return Err(invalid("subsampling divisor is zero"));
        }
        if max_h % h != 0 || max_v % v != 0 {
            return Err(invalid("sampling factors must divide the frame maximum"));
        }

        let (h, v) = (h as usize, v as usize);
        self.width_in_blocks = (geometry.width.div_ceil(DCTSIZE) * h).div_ceil(max_h as usize);
        self.height_in_blocks = (geometry.height.div_ceil(DCTSIZE) * v).div_ceil(max_v as usize);
        self.size_in_blocks = (geometry.mcus_per_line * h, geometry.mcus_per_column * v);
        self.subsampling_divisors = (div_h, div_v);
        Ok(())
    }

    /// Allocate the block buffer: the whole padded grid, or a strip one
    /// MCU row tall.
    pub fn allocate_spectral(&mut self, full_scan: bool) {
        let rows = if full_scan {
            self.size_in_blocks.1
        } else {
            self.v_factor as usize
        };
        self.spectral = Some(SpectralBuffer::new(self.size_in_blocks.0, rows));
    }

    /// Drop the block buffer
    pub fn release_spectral(&mut self) {
        self.spectral = None;
    }

    pub fn spectral(&self) -> Result<&SpectralBuffer> {
        self.spectral
            .as_ref()
            .ok_or(Error::SpectralNotAllocated {
                component: self.index,
            })
    }

    pub fn spectral_mut(&mut self) -> Result<&mut SpectralBuffer> {
        let index = self.index;
        self.spectral
            .as_mut()
            .ok_or(Error::SpectralNotAllocated { component: index })
    }

    /// The buffer, checked to cover the whole padded grid
    pub(crate) fn full_spectral(&self) -> Result<&SpectralBuffer> {
        let buf = self.spectral()?;
        if buf.height() < self.size_in_blocks.1 {
            return Err(Error::SpectralTooSmall {
                component: self.index,
                rows: buf.height(),
                needed: self.size_in_blocks.1,
            });
        }
        Ok(buf)
    }

    /// Blocks of this component in one MCU
    #[inline]
    pub fn blocks_per_mcu(&self) -> usize {
        self.h_factor as usize * self.v_factor as usize
    }
}

/// The whole image's encoding context.
#[derive(Debug, Clone)]
pub struct Frame {
    pub color_space: ColorSpace,
    /// All components coded in one scan, block groups per MCU
    pub interleaved: bool,
    geometry: FrameGeometry,
    max_h: u8,
    max_v: u8,
    pub components: Vec<Component>,
}

impl Frame {
    /// Build the frame and initialize every component's geometry.
    pub fn new(width: usize, height: usize, config: &FrameConfig, interleaved: bool) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions {
                width,
                height,
                reason: "dimensions must be non-zero",
            });
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::InvalidDimensions {
                width,
                height,
                reason: "dimensions must not exceed 65535",
            });
        }
        if config.components.is_empty() || config.components.len() > 4 {
            return Err(Error::InvalidConfig(format!(
                "a frame needs 1 to 4 components, got {}",
                config.components.len()
            )));
        }

        if config.components.len() != config.color_space.channel_count() {
            return Err(Error::InvalidConfig(format!(
                "{:?} has {} channels, frame lists {} components",
                config.color_space,
                config.color_space.channel_count(),
                config.components.len()
            )));
        }

        let (max_h, max_v) = config.max_sampling_factors();
        let geometry = FrameGeometry {
            width,
            height,
            mcus_per_line: width.div_ceil(DCTSIZE * max_h as usize),
            mcus_per_column: height.div_ceil(DCTSIZE * max_v as usize),
        };

        let mut components = Vec::with_capacity(config.components.len());
        for (index, cfg) in config.components.iter().enumerate() {
            let mut component = Component::new(index, cfg);
            component.init(&geometry, max_h, max_v)?;
            components.push(component);
        }

        let frame = Self {
            color_space: config.color_space,
            interleaved,
            geometry,
            max_h,
            max_v,
            components,
        };

        if interleaved {
            frame.check_interleavable()?;
        }
        Ok(frame)
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn mcus_per_line(&self) -> usize {
        self.geometry.mcus_per_line
    }

    pub fn mcus_per_column(&self) -> usize {
        self.geometry.mcus_per_column
    }

    pub fn max_sampling_factors(&self) -> (u8, u8) {
        (self.max_h, self.max_v)
    }

    /// Pixel rows covered by one MCU row
    pub fn mcu_height(&self) -> usize {
        self.max_v as usize * DCTSIZE
    }

    /// Pixel columns covered by all MCUs of a row
    pub fn padded_width(&self) -> usize {
        self.geometry.mcus_per_line * self.max_h as usize * DCTSIZE
    }

    /// Total blocks in one interleaved MCU
    pub fn blocks_per_mcu(&self) -> usize {
        self.components.iter().map(Component::blocks_per_mcu).sum()
    }

    /// `InvalidConfig` if an interleaved MCU would exceed
    /// [`MAX_BLOCKS_PER_MCU`]
    pub fn check_interleavable(&self) -> Result<()> {
        if self.components.len() > 1 && self.blocks_per_mcu() > MAX_BLOCKS_PER_MCU {
            return Err(Error::InvalidConfig(format!(
                "interleaved MCU holds {} blocks, at most {} allowed",
                self.blocks_per_mcu(),
                MAX_BLOCKS_PER_MCU
            )));
        }
        Ok(())
    }

    pub fn allocate_spectral(&mut self, full_scan: bool) {
        for c in &mut self.components {
            c.allocate_spectral(full_scan);
        }
    }

    pub fn release_spectral(&mut self) {
        for c in &mut self.components {
            c.release_spectral();
        }
    }

    pub fn reset_dc_predictors(&mut self) {
        for c in &mut self.components {
            c.dc_predictor = 0;
        }
    }
}
