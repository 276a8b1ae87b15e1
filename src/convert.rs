//! Pixel rows to quantized spectral blocks.
//!
//! Works one MCU row (a strip `8 * max_v` pixels tall) at a time:
//! 1. unpack each source row into R, G, B lanes padded to the MCU-aligned
//!    width by repeating the last pixel; rows past the bottom edge repeat
//!    the last row,
//! 2. mix the lanes into full-resolution channel planes,
//! 3. per component, average the plane down by its subsampling divisors
//!    (rows summed first, then columns, then one multiply by
//!    `1 / (dw * dh)`),
//! 4. cut the reduced plane into 8x8 tiles, transform and quantize each
//!    into the component's spectral buffer.
//!
//! Components with divisors (1, 1) skip step 3 and tile the plane directly.

use log::trace;

use crate::block::Block8x8F;
use crate::cancel::CancellationToken;
use crate::color::{self, ColorConverter, PlanarPixel};
use crate::consts::DCTSIZE;
use crate::dct::transform_block;
use crate::error::{Error, Result};
use crate::frame::{Component, Frame, SpectralBuffer};
use crate::quant::QuantTable;
use crate::source::PixelRows;
use crate::types::ColorSpace;

/// Full-resolution channel planes for one MCU row
#[derive(Debug)]
struct ColorPlanes {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl ColorPlanes {
    fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    fn plane(&self, channel: usize) -> &[f32] {
        let len = self.width * self.height;
        &self.data[channel * len..(channel + 1) * len]
    }

    /// Row `y` of every channel, unused slots empty
    fn row_set_mut(&mut self, y: usize) -> [&mut [f32]; 4] {
        let plane_len = self.width * self.height;
        let start = y * self.width;
        let end = start + self.width;
        let mut rest: &mut [f32] = &mut self.data;
        let mut out: [&mut [f32]; 4] = Default::default();
        for slot in out.iter_mut().take(self.channels) {
            let (plane, tail) = std::mem::take(&mut rest).split_at_mut(plane_len);
            *slot = &mut plane[start..end];
            rest = tail;
        }
        out
    }
}

/// Average `src` (`src_width` wide) down by `dw x dh` into `dst`
/// (`dst_width` wide, `dst.len() / dst_width` rows).
///
/// `scratch` must hold at least `src_width` floats.
pub fn subsample_plane(
    src: &[f32],
    src_width: usize,
    dw: usize,
    dh: usize,
    dst: &mut [f32],
    dst_width: usize,
    scratch: &mut [f32],
) {
    let scale = 1.0 / (dw * dh) as f32;
    let acc = &mut scratch[..src_width];
    for (oy, out) in dst.chunks_exact_mut(dst_width).enumerate() {
        let first = oy * dh * src_width;
        acc.copy_from_slice(&src[first..first + src_width]);
        for k in 1..dh {
            let row = first + k * src_width;
            color::add_row(acc, &src[row..row + src_width]);
        }
        for (ox, o) in out.iter_mut().enumerate() {
            let group = &acc[ox * dw..ox * dw + dw];
            let mut sum = group[0];
            for &v in &group[1..] {
                sum += v;
            }
            *o = sum;
        }
        color::scale_row(out, scale);
    }
}

/// Turns one component's color plane into quantized blocks.
#[derive(Debug)]
struct ComponentProcessor<'q> {
    quant: &'q QuantTable,
    divisors: (usize, usize),
    blocks_per_row: usize,
    block_rows: usize,
    reduced: Vec<f32>,
    scratch: Vec<f32>,
}

impl<'q> ComponentProcessor<'q> {
    fn new(component: &Component, quant: &'q QuantTable, plane_width: usize) -> Self {
        let blocks_per_row = component.size_in_blocks.0;
        let block_rows = component.v_factor as usize;
        let subsampled = component.subsampling_divisors != (1, 1);
        let reduced_len = if subsampled {
            blocks_per_row * DCTSIZE * block_rows * DCTSIZE
        } else {
            0
        };
        Self {
            quant,
            divisors: component.subsampling_divisors,
            blocks_per_row,
            block_rows,
            reduced: vec![0.0; reduced_len],
            scratch: vec![0.0; if subsampled { plane_width } else { 0 }],
        }
    }

    fn process(
        &mut self,
        plane: &[f32],
        plane_width: usize,
        spectral: &mut SpectralBuffer,
        first_row: usize,
    ) {
        let (dw, dh) = self.divisors;
        let tile_width = self.blocks_per_row * DCTSIZE;
        let tiles: &[f32] = if (dw, dh) == (1, 1) {
            plane
        } else {
            subsample_plane(
                plane,
                plane_width,
                dw,
                dh,
                &mut self.reduced,
                tile_width,
                &mut self.scratch,
            );
            &self.reduced
        };

        let mut tile = Block8x8F::default();
        for by in 0..self.block_rows {
            let row = spectral.row_mut(first_row + by);
            for (bx, block) in row.iter_mut().enumerate() {
                tile.load_from(tiles, tile_width, bx * DCTSIZE, by * DCTSIZE);
                *block = transform_block(&mut tile, self.quant);
            }
        }
    }
}

/// What a converter was built for; checked against the frame it is
/// handed on every conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameLayout {
    color_space: ColorSpace,
    width: usize,
    height: usize,
    /// (h, v, quant index) per component
    components: Vec<(u8, u8, u8)>,
}

impl FrameLayout {
    fn of(frame: &Frame) -> Self {
        Self {
            color_space: frame.color_space,
            width: frame.width(),
            height: frame.height(),
            components: frame
                .components
                .iter()
                .map(|c| (c.h_factor, c.v_factor, c.quant_index))
                .collect(),
        }
    }
}

/// Drives color conversion and the spectral transform for a frame,
/// reading pixels from its source.
pub struct SpectralConverter<'q, S: PixelRows> {
    source: S,
    layout: FrameLayout,
    color: ColorConverter,
    planes: ColorPlanes,
    lanes: [Vec<f32>; 3],
    processors: Vec<ComponentProcessor<'q>>,
}

impl<'q, S: PixelRows> SpectralConverter<'q, S> {
    /// Prepare scratch buffers for `frame`.
    ///
    /// The source must match the frame's size, and every component's
    /// quantization table must be present in `tables`.
    pub fn new(frame: &Frame, tables: &'q [QuantTable], source: S) -> Result<Self> {
        if source.width() != frame.width() || source.height() != frame.height() {
            return Err(Error::InvalidDimensions {
                width: source.width(),
                height: source.height(),
                reason: "source size does not match the frame",
            });
        }

        let plane_width = frame.padded_width();
        let mut processors = Vec::with_capacity(frame.components.len());
        for component in &frame.components {
            let quant = tables
                .iter()
                .find(|t| t.destination == component.quant_index)
                .ok_or(Error::InvalidQuantTable {
                    index: component.quant_index,
                    reason: "table not provided",
                })?;
            processors.push(ComponentProcessor::new(component, quant, plane_width));
        }

        Ok(Self {
            source,
            layout: FrameLayout::of(frame),
            color: ColorConverter::new(frame.color_space, <S::Pixel as PlanarPixel>::IS_GRAY),
            planes: ColorPlanes::new(plane_width, frame.mcu_height(), frame.components.len()),
            lanes: [
                vec![0.0; plane_width],
                vec![0.0; plane_width],
                vec![0.0; plane_width],
            ],
            processors,
        })
    }

    /// Convert MCU row `mcu_row` into strip-sized spectral buffers
    /// (block row 0 of each buffer holds the strip's first block row).
    pub fn convert_strided_baseline(&mut self, frame: &mut Frame, mcu_row: usize) -> Result<()> {
        self.check_frame(frame)?;
        self.convert_rows(mcu_row)?;
        for (component, processor) in frame.components.iter_mut().zip(&mut self.processors) {
            let plane = self.planes.plane(component.index);
            processor.process(plane, self.planes.width, component.spectral_mut()?, 0);
        }
        Ok(())
    }

    /// Convert every MCU row into whole-image spectral buffers, polling
    /// `cancel` once per MCU row.
    pub fn convert_full(&mut self, frame: &mut Frame, cancel: &CancellationToken) -> Result<()> {
        self.check_frame(frame)?;
        for component in &frame.components {
            component.full_spectral()?;
        }
        for mcu_row in 0..frame.mcus_per_column() {
            cancel.check()?;
            self.convert_rows(mcu_row)?;
            for (component, processor) in frame.components.iter_mut().zip(&mut self.processors) {
                let first_row = mcu_row * component.v_factor as usize;
                let plane = self.planes.plane(component.index);
                processor.process(
                    plane,
                    self.planes.width,
                    component.spectral_mut()?,
                    first_row,
                );
            }
        }
        trace!(
            "converted {} MCU rows into full spectral buffers",
            frame.mcus_per_column()
        );
        Ok(())
    }

    /// `InvalidConfig` unless `frame` has the layout this converter was
    /// built for
    pub fn check_frame(&self, frame: &Frame) -> Result<()> {
        let layout = FrameLayout::of(frame);
        if layout != self.layout {
            return Err(Error::InvalidConfig(format!(
                "converter built for {:?} {}x{} with factors/tables {:?}, frame is {:?} {}x{} with {:?}",
                self.layout.color_space,
                self.layout.width,
                self.layout.height,
                self.layout.components,
                layout.color_space,
                layout.width,
                layout.height,
                layout.components
            )));
        }
        Ok(())
    }

    /// Fill the color planes from the source rows of one MCU row
    fn convert_rows(&mut self, mcu_row: usize) -> Result<()> {
        let width = self.source.width();
        let strip = self.planes.height;
        let [r, g, b] = &mut self.lanes;
        for y in 0..strip {
            let row = self.source.row_clamped(mcu_row * strip + y)?;
            let row = row.get(..width).ok_or(Error::InvalidDimensions {
                width,
                height: self.source.height(),
                reason: "source row is shorter than the image width",
            })?;
            <S::Pixel as PlanarPixel>::unpack_row(row, r, g, b);
            pad_lane(r, width);
            pad_lane(g, width);
            pad_lane(b, width);

            let mut out = self.planes.row_set_mut(y);
            self.color.convert_row(r, g, b, &mut out);
        }
        Ok(())
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Repeat the last valid sample across the padding columns
#[inline]
fn pad_lane(lane: &mut [f32], width: usize) {
    let last = lane[width - 1];
    lane[width..].fill(last);
}
