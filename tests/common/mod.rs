//! Common test utilities for zenjpeg-scan tests.
//!
//! - [`frame_jpeg`] wraps an [`EncodedImage`]'s scans in the marker
//!   segments a decoder needs, so `jpeg-decoder` can read the result.
//! - [`split_restarts`] and [`RefTable`] form a small reference decoder
//!   used to check scans coefficient by coefficient.
//! - Image generators and logger setup.

#![allow(dead_code)]

use std::collections::HashMap;

use imgref::ImgVec;
use rgb::RGB8;
use zenjpeg_scan::{marker, ColorSpace, EncodedImage, HuffmanSpec, TableClass, DCTSIZE2};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Horizontal/vertical gradient with a diagonal blue ramp
pub fn gradient_rgb(width: usize, height: usize) -> ImgVec<RGB8> {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(2).saturating_sub(1).max(1)).min(255) as u8;
            let g = (y * 255 / height.max(2).saturating_sub(1).max(1)).min(255) as u8;
            let b = ((x + y) * 255 / (width + height)) as u8;
            pixels.push(RGB8::new(r, g, b));
        }
    }
    ImgVec::new(pixels, width, height)
}

pub fn uniform_rgb(width: usize, height: usize, color: RGB8) -> ImgVec<RGB8> {
    ImgVec::new(vec![color; width * height], width, height)
}

/// Deterministic noisy gray image (xorshift)
pub fn noise_gray(width: usize, height: usize, seed: u32) -> ImgVec<u8> {
    let mut state = seed.max(1);
    let pixels = (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    ImgVec::new(pixels, width, height)
}

fn segment(out: &mut Vec<u8>, code: u8, payload: &[u8]) {
    out.extend_from_slice(&[marker::PREFIX, code]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
}

/// Frame the scans of `image` into a complete JPEG stream.
pub fn frame_jpeg(image: &EncodedImage) -> Vec<u8> {
    let mut out = vec![marker::PREFIX, marker::SOI];

    match image.color_space {
        ColorSpace::Luminance | ColorSpace::YCbCr => {
            segment(&mut out, marker::APP0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
        }
        ColorSpace::Rgb | ColorSpace::Cmyk | ColorSpace::Ycck => {
            let transform = if image.color_space == ColorSpace::Ycck { 2 } else { 0 };
            segment(
                &mut out,
                marker::APP14,
                &[b'A', b'd', b'o', b'b', b'e', 0, 100, 0, 0, 0, 0, transform],
            );
        }
    }

    for table in &image.quant_tables {
        let mut payload = vec![table.destination];
        payload.extend(table.zigzag_values().iter().map(|&v| v as u8));
        segment(&mut out, marker::DQT, &payload);
    }

    let mut sof = vec![8];
    sof.extend_from_slice(&(image.height as u16).to_be_bytes());
    sof.extend_from_slice(&(image.width as u16).to_be_bytes());
    sof.push(image.components.len() as u8);
    for c in &image.components {
        sof.extend_from_slice(&[c.id, (c.h_factor << 4) | c.v_factor, c.quant_index]);
    }
    let sof_marker = if image.progressive {
        marker::SOF2
    } else {
        marker::SOF0
    };
    segment(&mut out, sof_marker, &sof);

    for table in &image.huffman_tables {
        let mut payload = vec![(table.class.id() << 4) | table.destination];
        payload.extend_from_slice(&table.spec.counts);
        payload.extend_from_slice(&table.spec.values);
        segment(&mut out, marker::DHT, &payload);
    }

    if image.restart_interval > 0 {
        segment(&mut out, marker::DRI, &image.restart_interval.to_be_bytes());
    }

    for scan in &image.scans {
        let comps = scan.info.components();
        let mut sos = vec![comps.len() as u8];
        for &index in comps {
            let c = &image.components[index as usize];
            let ac = if scan.info.is_dc_scan() { 0 } else { c.ac_table };
            sos.extend_from_slice(&[c.id, (c.dc_table << 4) | ac]);
        }
        sos.extend_from_slice(&[scan.info.ss, scan.info.se, 0]);
        segment(&mut out, marker::SOS, &sos);
        out.extend_from_slice(&scan.data);
    }

    out.extend_from_slice(&[marker::PREFIX, marker::EOI]);
    out
}

/// Split entropy-coded data at restart markers and remove byte stuffing.
///
/// Returns the unstuffed segments and the restart marker codes in order.
/// Panics on a 0xFF that is neither stuffed nor a restart marker.
pub fn split_restarts(data: &[u8]) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut segments = vec![Vec::new()];
    let mut markers = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        if byte == 0xFF {
            let next = *data.get(i + 1).expect("0xFF at end of data");
            match next {
                0x00 => segments.last_mut().unwrap().push(0xFF),
                0xD0..=0xD7 => {
                    markers.push(next);
                    segments.push(Vec::new());
                }
                other => panic!("unexpected marker 0xFF{:02X} at {}", other, i),
            }
            i += 2;
        } else {
            segments.last_mut().unwrap().push(byte);
            i += 1;
        }
    }
    (segments, markers)
}

/// MSB-first reader over one unstuffed segment
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn bit(&mut self) -> u32 {
        let byte = self.data[self.pos / 8];
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        bit as u32
    }

    pub fn bits(&mut self, count: u32) -> u32 {
        (0..count).fold(0, |acc, _| (acc << 1) | self.bit())
    }

    /// Receive-and-extend a magnitude of `size` bits
    pub fn extend(&mut self, size: u32) -> i32 {
        if size == 0 {
            return 0;
        }
        let v = self.bits(size) as i32;
        if v < 1 << (size - 1) {
            v - (1 << size) + 1
        } else {
            v
        }
    }

    /// Assert the segment ends here, with at most 7 padding 1-bits
    pub fn finish(&mut self) {
        let total = self.data.len() * 8;
        assert!(total - self.pos < 8, "{} unread bits", total - self.pos);
        while self.pos < total {
            assert_eq!(self.bit(), 1, "padding bit is not 1");
        }
    }
}

/// Canonical decoding table built the same way Annex C assigns codes
pub struct RefTable {
    codes: HashMap<(u32, u32), u8>,
}

impl RefTable {
    pub fn new(spec: &HuffmanSpec) -> Self {
        let mut codes = HashMap::new();
        let mut code = 0u32;
        let mut values = spec.values.iter();
        for (i, &count) in spec.counts.iter().enumerate() {
            for _ in 0..count {
                codes.insert(((i + 1) as u32, code), *values.next().unwrap());
                code += 1;
            }
            code <<= 1;
        }
        Self { codes }
    }

    pub fn decode(&self, reader: &mut BitReader<'_>) -> u8 {
        let mut code = 0;
        for len in 1..=16 {
            code = (code << 1) | reader.bit();
            if let Some(&symbol) = self.codes.get(&(len, code)) {
                return symbol;
            }
        }
        panic!("no code matched");
    }
}

pub fn table_spec(image: &EncodedImage, class: TableClass, destination: u8) -> &HuffmanSpec {
    &image
        .huffman_tables
        .iter()
        .find(|t| t.class == class && t.destination == destination)
        .expect("table registered")
        .spec
}

/// Decode DC into `block[0]`, updating `predictor`
pub fn decode_dc(reader: &mut BitReader<'_>, table: &RefTable, predictor: &mut i32, block: &mut [i16; DCTSIZE2]) {
    let size = table.decode(reader) as u32;
    *predictor += reader.extend(size);
    block[0] = *predictor as i16;
}

/// Decode the zigzag band `[start, end)` into `block`
pub fn decode_ac_band(
    reader: &mut BitReader<'_>,
    table: &RefTable,
    block: &mut [i16; DCTSIZE2],
    start: usize,
    end: usize,
) {
    let mut k = start;
    while k < end {
        let rs = table.decode(reader);
        let (run, size) = ((rs >> 4) as usize, (rs & 0x0F) as u32);
        if size == 0 {
            if run == 15 {
                k += 16;
                continue;
            }
            break;
        }
        k += run;
        assert!(k < end, "run past end of band");
        block[k] = reader.extend(size) as i16;
        k += 1;
    }
}

/// Per-component decoding layout for interleaved scans
pub struct RefComponent<'t> {
    pub h: usize,
    pub v: usize,
    pub dc: &'t RefTable,
    pub ac: Option<&'t RefTable>,
}

/// Decode an interleaved scan of `mcus` MCUs, band `[start, end)`.
///
/// Returns each component's blocks in MCU order.
pub fn decode_interleaved(
    data: &[u8],
    components: &[RefComponent<'_>],
    mcus: usize,
    restart_interval: usize,
    end: usize,
) -> Vec<Vec<[i16; DCTSIZE2]>> {
    let (segments, markers) = split_restarts(data);
    let per_segment = if restart_interval == 0 { mcus } else { restart_interval };
    assert_eq!(segments.len(), mcus.div_ceil(per_segment).max(1));
    for (i, &m) in markers.iter().enumerate() {
        assert_eq!(m, 0xD0 + (i % 8) as u8);
    }

    let mut out = vec![Vec::new(); components.len()];
    let mut remaining = mcus;
    for segment in &segments {
        let mut reader = BitReader::new(segment);
        let mut predictors = vec![0i32; components.len()];
        for _ in 0..per_segment.min(remaining) {
            for (ci, c) in components.iter().enumerate() {
                for _ in 0..c.h * c.v {
                    let mut block = [0i16; DCTSIZE2];
                    decode_dc(&mut reader, c.dc, &mut predictors[ci], &mut block);
                    if let Some(ac) = c.ac {
                        decode_ac_band(&mut reader, ac, &mut block, 1, end);
                    }
                    out[ci].push(block);
                }
            }
        }
        remaining -= per_segment.min(remaining);
        reader.finish();
    }
    out
}

/// Decode a single-component scan of `blocks` blocks over `[start, end)`.
/// `start == 0` decodes DC first.
pub fn decode_single(
    data: &[u8],
    dc: Option<&RefTable>,
    ac: Option<&RefTable>,
    blocks: usize,
    restart_interval: usize,
    start: usize,
    end: usize,
) -> Vec<[i16; DCTSIZE2]> {
    let (segments, _) = split_restarts(data);
    let per_segment = if restart_interval == 0 { blocks } else { restart_interval };
    assert_eq!(segments.len(), blocks.div_ceil(per_segment).max(1));

    let mut out = Vec::with_capacity(blocks);
    for segment in &segments {
        let mut reader = BitReader::new(segment);
        let mut predictor = 0;
        for _ in 0..per_segment.min(blocks - out.len()) {
            let mut block = [0i16; DCTSIZE2];
            if start == 0 {
                decode_dc(&mut reader, dc.expect("DC table"), &mut predictor, &mut block);
            }
            if end > 1 {
                decode_ac_band(&mut reader, ac.expect("AC table"), &mut block, start.max(1), end);
            }
            out.push(block);
        }
        reader.finish();
    }
    out
}

/// Mean absolute difference between two byte buffers
pub fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    assert_eq!(a.len(), b.len());
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs() as u64)
        .sum();
    total as f64 / a.len() as f64
}
