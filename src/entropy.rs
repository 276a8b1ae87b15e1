//! Huffman scan encoding.
//!
//! [`ScanEncoder`] owns the registered Huffman tables, the restart state
//! and the [`BitWriter`] for one output sink. Each entry point encodes one
//! complete scan: DC predictors start at zero, the final byte is padded
//! with 1-bits and everything is flushed to the sink before it returns.
//!
//! Restart intervals count MCUs in interleaved scans and blocks in
//! single-component scans. The interval check runs before each unit, so
//! no marker precedes the first unit or follows the last.

use std::io::Write;

use log::debug;

use crate::bitstream::BitWriter;
use crate::block::Block8x8;
use crate::cancel::CancellationToken;
use crate::consts::{DCTSIZE2, EOB, NUM_TABLE_SLOTS, ZRL};
use crate::convert::SpectralConverter;
use crate::error::{Error, Result};
use crate::frame::{Component, Frame};
use crate::huffman::{category, HuffmanLut, HuffmanSpec};
use crate::source::PixelRows;
use crate::types::TableClass;

type Tables = [Option<HuffmanLut>; NUM_TABLE_SLOTS];

#[derive(Debug, Default, Clone, Copy)]
struct RestartState {
    interval: u32,
    to_go: u32,
    next_index: u32,
}

impl RestartState {
    fn start_scan(&mut self) {
        self.to_go = self.interval;
        self.next_index = 0;
    }

    /// Emit a marker and reset predictors if the interval elapsed, then
    /// count the unit about to be encoded.
    fn before_unit<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        components: &mut [Component],
    ) -> Result<()> {
        if self.interval == 0 {
            return Ok(());
        }
        if self.to_go == 0 {
            writer.write_restart(self.next_index)?;
            self.next_index = self.next_index.wrapping_add(1);
            for c in components.iter_mut() {
                c.dc_predictor = 0;
            }
            self.to_go = self.interval;
        }
        self.to_go -= 1;
        Ok(())
    }
}

fn lookup(tables: &Tables, class: TableClass, index: u8) -> Result<&HuffmanLut> {
    tables
        .get(index as usize)
        .and_then(Option::as_ref)
        .ok_or(Error::MissingHuffmanTable { class, index })
}

/// Entropy coder writing scans to `W`.
pub struct ScanEncoder<W: Write> {
    writer: BitWriter<W>,
    dc_tables: Tables,
    ac_tables: Tables,
    restart: RestartState,
}

impl<W: Write> ScanEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: BitWriter::new(sink),
            dc_tables: Default::default(),
            ac_tables: Default::default(),
            restart: RestartState::default(),
        }
    }

    /// Build and register a canonical table at `destination` (0-3).
    pub fn build_huffman_table(
        &mut self,
        class: TableClass,
        destination: u8,
        spec: &HuffmanSpec,
    ) -> Result<()> {
        if destination as usize >= NUM_TABLE_SLOTS {
            return Err(Error::huffman(class, destination, "destination must be 0-3"));
        }
        let lut = HuffmanLut::build(class, destination, spec)?;
        let slot = match class {
            TableClass::Dc => &mut self.dc_tables[destination as usize],
            TableClass::Ac => &mut self.ac_tables[destination as usize],
        };
        *slot = Some(lut);
        Ok(())
    }

    /// Units between restart markers; 0 disables them
    pub fn set_restart_interval(&mut self, interval: u16) {
        self.restart.interval = interval as u32;
    }

    pub fn restart_interval(&self) -> u16 {
        self.restart.interval as u16
    }

    /// Bytes written to the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.writer.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// One interleaved baseline scan over all components, converting the
    /// image one MCU row at a time into strip-sized spectral buffers.
    ///
    /// The color space comes from `frame`; the converter must have been
    /// built for the same frame.
    pub fn encode_scan_baseline_interleaved<S: PixelRows>(
        &mut self,
        frame: &mut Frame,
        converter: &mut SpectralConverter<'_, S>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.interleaved_inner(frame, converter, cancel);
        self.finish_scan(result)
    }

    fn interleaved_inner<S: PixelRows>(
        &mut self,
        frame: &mut Frame,
        converter: &mut SpectralConverter<'_, S>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        frame.check_interleavable()?;
        converter.check_frame(frame)?;
        debug!(
            "interleaved baseline scan: {:?} {}x{}, {}x{} MCUs of {} blocks",
            frame.color_space,
            frame.width(),
            frame.height(),
            frame.mcus_per_line(),
            frame.mcus_per_column(),
            frame.blocks_per_mcu()
        );
        let luts = resolve_tables(&self.dc_tables, &self.ac_tables, &frame.components, true)?;
        begin_scan(&mut self.restart, frame);

        for mcu_row in 0..frame.mcus_per_column() {
            cancel.check()?;
            converter.convert_strided_baseline(frame, mcu_row)?;

            for mcu_x in 0..frame.mcus_per_line() {
                self.restart
                    .before_unit(&mut self.writer, &mut frame.components)?;
                for (component, &(dc, ac)) in frame.components.iter_mut().zip(&luts) {
                    let (h, v) = (component.h_factor as usize, component.v_factor as usize);
                    for y in 0..v {
                        for x in 0..h {
                            let block = *component.spectral()?.block(mcu_x * h + x, y);
                            self.writer.flush_if_needed()?;
                            write_block(&mut self.writer, &block, &mut component.dc_predictor, dc, ac)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Baseline scan of a single-component frame, converted and encoded
    /// one strip at a time.
    pub fn encode_scan_baseline_single_component<S: PixelRows>(
        &mut self,
        frame: &mut Frame,
        converter: &mut SpectralConverter<'_, S>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.single_component_inner(frame, converter, cancel);
        self.finish_scan(result)
    }

    fn single_component_inner<S: PixelRows>(
        &mut self,
        frame: &mut Frame,
        converter: &mut SpectralConverter<'_, S>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if frame.components.len() != 1 {
            return Err(Error::InvalidConfig(format!(
                "single-component scan over a frame with {} components",
                frame.components.len()
            )));
        }
        converter.check_frame(frame)?;
        let (dc, ac) = resolve_tables(&self.dc_tables, &self.ac_tables, &frame.components, true)?[0];
        begin_scan(&mut self.restart, frame);

        let (width, height, v) = {
            let c = &frame.components[0];
            (c.width_in_blocks, c.height_in_blocks, c.v_factor as usize)
        };
        debug!("single-component baseline scan: {}x{} blocks", width, height);

        for mcu_row in 0..frame.mcus_per_column() {
            cancel.check()?;
            converter.convert_strided_baseline(frame, mcu_row)?;

            for y in 0..v {
                if mcu_row * v + y >= height {
                    break;
                }
                for x in 0..width {
                    self.restart
                        .before_unit(&mut self.writer, &mut frame.components)?;
                    let component = &mut frame.components[0];
                    let block = *component.spectral()?.block(x, y);
                    self.writer.flush_if_needed()?;
                    write_block(&mut self.writer, &block, &mut component.dc_predictor, dc, ac)?;
                }
            }
        }
        Ok(())
    }

    /// Non-interleaved baseline scan of one component whose spectral
    /// buffer already holds the whole image.
    pub fn encode_scan_baseline(
        &mut self,
        frame: &mut Frame,
        component: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.baseline_inner(frame, component, cancel);
        self.finish_scan(result)
    }

    fn baseline_inner(
        &mut self,
        frame: &mut Frame,
        component: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let selected = component_at(frame, component)?;
        let (dc, ac) = resolve_tables(
            &self.dc_tables,
            &self.ac_tables,
            std::slice::from_ref(selected),
            true,
        )?[0];
        let (width, height) = (selected.width_in_blocks, selected.height_in_blocks);
        selected.full_spectral()?;
        begin_scan(&mut self.restart, frame);
        debug!(
            "baseline scan of component {}: {}x{} blocks",
            component, width, height
        );

        for y in 0..height {
            cancel.check()?;
            for x in 0..width {
                self.restart
                    .before_unit(&mut self.writer, &mut frame.components)?;
                let c = &mut frame.components[component];
                let block = *c.spectral()?.block(x, y);
                self.writer.flush_if_needed()?;
                write_block(&mut self.writer, &block, &mut c.dc_predictor, dc, ac)?;
            }
        }
        Ok(())
    }

    /// DC-only scan (spectral selection 0..=0) over all components of a
    /// frame whose spectral buffers hold the whole image. Interleaved per
    /// MCU when the frame has several components.
    pub fn encode_dc_scan(&mut self, frame: &mut Frame, cancel: &CancellationToken) -> Result<()> {
        let result = self.dc_inner(frame, cancel);
        self.finish_scan(result)
    }

    fn dc_inner(&mut self, frame: &mut Frame, cancel: &CancellationToken) -> Result<()> {
        let luts = resolve_tables(&self.dc_tables, &self.ac_tables, &frame.components, false)?;
        for c in &frame.components {
            c.full_spectral()?;
        }
        begin_scan(&mut self.restart, frame);

        if frame.components.len() == 1 {
            let (width, height) = {
                let c = &frame.components[0];
                (c.width_in_blocks, c.height_in_blocks)
            };
            debug!("DC scan, single component: {}x{} blocks", width, height);
            let dc = luts[0].0;
            for y in 0..height {
                cancel.check()?;
                for x in 0..width {
                    self.restart
                        .before_unit(&mut self.writer, &mut frame.components)?;
                    let c = &mut frame.components[0];
                    let block = *c.spectral()?.block(x, y);
                    self.writer.flush_if_needed()?;
                    write_dc(&mut self.writer, &block, &mut c.dc_predictor, dc)?;
                }
            }
            return Ok(());
        }

        debug!(
            "DC scan, {} components interleaved: {}x{} MCUs",
            frame.components.len(),
            frame.mcus_per_line(),
            frame.mcus_per_column()
        );
        for mcu_y in 0..frame.mcus_per_column() {
            cancel.check()?;
            for mcu_x in 0..frame.mcus_per_line() {
                self.restart
                    .before_unit(&mut self.writer, &mut frame.components)?;
                for (c, &(dc, _)) in frame.components.iter_mut().zip(&luts) {
                    let (h, v) = (c.h_factor as usize, c.v_factor as usize);
                    for y in 0..v {
                        for x in 0..h {
                            let block = *c.spectral()?.block(mcu_x * h + x, mcu_y * v + y);
                            self.writer.flush_if_needed()?;
                            write_dc(&mut self.writer, &block, &mut c.dc_predictor, dc)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// AC-only scan of one component over zigzag indices `[start, end)`,
    /// `1 <= start < end <= 64`.
    pub fn encode_ac_scan(
        &mut self,
        frame: &mut Frame,
        component: usize,
        start: usize,
        end: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.ac_inner(frame, component, start, end, cancel);
        self.finish_scan(result)
    }

    fn ac_inner(
        &mut self,
        frame: &mut Frame,
        component: usize,
        start: usize,
        end: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if start == 0 || start >= end || end > DCTSIZE2 {
            return Err(Error::InvalidSpectralSelection { start, end });
        }
        let selected = component_at(frame, component)?;
        let ac = lookup(&self.ac_tables, TableClass::Ac, selected.ac_table)?;
        let (width, height) = (selected.width_in_blocks, selected.height_in_blocks);
        selected.full_spectral()?;
        begin_scan(&mut self.restart, frame);
        debug!(
            "AC scan of component {} over [{}, {}): {}x{} blocks",
            component, start, end, width, height
        );

        for y in 0..height {
            cancel.check()?;
            for x in 0..width {
                self.restart
                    .before_unit(&mut self.writer, &mut frame.components)?;
                let block = *frame.components[component].spectral()?.block(x, y);
                self.writer.flush_if_needed()?;
                write_ac_range(&mut self.writer, &block, start, end, ac)?;
            }
        }
        Ok(())
    }

    /// Pad and flush on success; drop unflushed data on failure or
    /// cancellation so the sink only ever holds whole flushes.
    fn finish_scan(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.writer.pad_and_flush()?;
                debug!("scan done, {} bytes written", self.writer.bytes_written());
                Ok(())
            }
            Err(e) => {
                self.writer.discard();
                if e.is_cancelled() {
                    debug!("scan cancelled after {} bytes", self.writer.bytes_written());
                }
                Err(e)
            }
        }
    }
}

/// Resolve (DC, AC) tables per component; AC only when `with_ac`.
fn resolve_tables<'t>(
    dc_tables: &'t Tables,
    ac_tables: &'t Tables,
    components: &[Component],
    with_ac: bool,
) -> Result<Vec<(&'t HuffmanLut, &'t HuffmanLut)>> {
    components
        .iter()
        .map(|c| {
            let dc = lookup(dc_tables, TableClass::Dc, c.dc_table)?;
            let ac = if with_ac {
                lookup(ac_tables, TableClass::Ac, c.ac_table)?
            } else {
                dc
            };
            Ok((dc, ac))
        })
        .collect()
}

fn begin_scan(restart: &mut RestartState, frame: &mut Frame) {
    frame.reset_dc_predictors();
    restart.start_scan();
}

fn component_at(frame: &Frame, index: usize) -> Result<&Component> {
    frame.components.get(index).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "component {} requested, frame has {}",
            index,
            frame.components.len()
        ))
    })
}

/// DC difference against `predictor`, then the block's AC run-lengths
fn write_block<W: Write>(
    writer: &mut BitWriter<W>,
    block: &Block8x8,
    predictor: &mut i32,
    dc: &HuffmanLut,
    ac: &HuffmanLut,
) -> Result<()> {
    write_dc(writer, block, predictor, dc)?;
    write_ac_range(writer, block, 1, DCTSIZE2, ac)
}

fn write_dc<W: Write>(
    writer: &mut BitWriter<W>,
    block: &Block8x8,
    predictor: &mut i32,
    dc: &HuffmanLut,
) -> Result<()> {
    let value = block.dc() as i32;
    let diff = value - *predictor;
    *predictor = value;
    let bits = category(diff);
    writer.emit_huffman(dc, bits as u8, diff, bits)
}

/// Run-length code zigzag coefficients `[start, end)`
fn write_ac_range<W: Write>(
    writer: &mut BitWriter<W>,
    block: &Block8x8,
    start: usize,
    end: usize,
    ac: &HuffmanLut,
) -> Result<()> {
    let Some(last) = block.last_nonzero_in(start, end) else {
        return writer.emit_huffman(ac, EOB, 0, 0);
    };

    let mut run = 0u32;
    for zz in start..=last {
        let value = block[zz] as i32;
        if value == 0 {
            run += 1;
            continue;
        }
        while run > 15 {
            writer.emit_huffman(ac, ZRL, 0, 0)?;
            run -= 16;
        }
        let bits = category(value);
        writer.emit_huffman(ac, ((run << 4) | bits) as u8, value, bits)?;
        run = 0;
    }

    if last + 1 < end {
        writer.emit_huffman(ac, EOB, 0, 0)?;
    }
    Ok(())
}
