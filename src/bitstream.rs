//! Bit packing for entropy-coded segments.
//!
//! Bits are collected MSB-first in a 32-bit accumulator. Full accumulator
//! words go to a staging buffer; flushing turns staged words into bytes
//! (stuffing a `0x00` after every `0xFF`) and hands them to the sink in one
//! write. Callers check [`BitWriter::flush_if_needed`] before every block so
//! the staging buffer never has to grow.

use std::io::Write;

use log::trace;

use crate::consts::marker;
use crate::error::{Error, Result};
use crate::huffman::HuffmanLut;

/// Staged words. A worst-case block (16 + 11 DC bits, 63 * (16 + 10) AC
/// bits) needs 53 words, so flushing at half capacity always leaves room.
pub const EMIT_BUFFER_WORDS: usize = 128;

/// Byte buffer for one flush: every byte of every staged word may be stuffed
pub const OUTPUT_BUFFER_BYTES: usize = EMIT_BUFFER_WORDS * 4 * 2;

/// Staged-word count above which the next block flushes first
const FLUSH_THRESHOLD_WORDS: usize = EMIT_BUFFER_WORDS / 2;

/// Entropy-coded segment writer
pub struct BitWriter<W: Write> {
    sink: W,
    acc: u32,
    bit_count: u32,
    words: Vec<u32>,
    bytes: Vec<u8>,
    bytes_written: u64,
    failed: bool,
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            acc: 0,
            bit_count: 0,
            words: Vec::with_capacity(EMIT_BUFFER_WORDS),
            bytes: Vec::with_capacity(OUTPUT_BUFFER_BYTES),
            bytes_written: 0,
            failed: false,
        }
    }

    /// Append the top `count` bits of `bits` (`count <= 32`, lower bits zero).
    #[inline]
    pub fn emit(&mut self, bits: u32, count: u32) {
        self.acc |= bits >> self.bit_count;
        let total = self.bit_count + count;
        if total >= 32 {
            self.words.push(self.acc);
            self.acc = bits.checked_shl(32 - self.bit_count).unwrap_or(0);
            self.bit_count = total - 32;
        } else {
            self.bit_count = total;
        }
    }

    /// Emit `symbol`'s code followed by the low `bits` bits of `value` in
    /// JPEG magnitude form (negative values as `value - 1`).
    #[inline]
    pub fn emit_huffman(&mut self, lut: &HuffmanLut, symbol: u8, value: i32, bits: u32) -> Result<()> {
        let entry = lut.entry(symbol);
        let len = entry & 0xFF;
        if len == 0 {
            return Err(Error::MissingHuffmanCode { symbol });
        }
        let mut packed = entry & !0xFF;
        if bits > 0 {
            let signed = if value < 0 { value - 1 } else { value };
            let magnitude = signed as u32 & ((1 << bits) - 1);
            packed |= magnitude << (32 - len - bits);
        }
        self.emit(packed, len + bits);
        Ok(())
    }

    /// True once the staging buffer is more than half full
    #[inline]
    pub fn is_flush_needed(&self) -> bool {
        self.words.len() > FLUSH_THRESHOLD_WORDS
    }

    /// Flush staged words if the next block might not fit
    #[inline]
    pub fn flush_if_needed(&mut self) -> Result<()> {
        if self.is_flush_needed() {
            self.flush_words()?;
        }
        Ok(())
    }

    /// Write every complete staged word to the sink
    pub fn flush_words(&mut self) -> Result<()> {
        for &word in &self.words {
            for byte in word.to_be_bytes() {
                push_stuffed(&mut self.bytes, byte);
            }
        }
        self.words.clear();
        self.write_bytes()
    }

    /// Pad the pending bits to a byte boundary with 1-bits and write
    /// everything out.
    pub fn pad_and_flush(&mut self) -> Result<()> {
        let valuable = self.bit_count.div_ceil(8) as usize;
        let packed = self.acc | (u32::MAX >> self.bit_count);
        self.acc = 0;
        self.bit_count = 0;

        for &word in &self.words {
            for byte in word.to_be_bytes() {
                push_stuffed(&mut self.bytes, byte);
            }
        }
        self.words.clear();
        for &byte in &packed.to_be_bytes()[..valuable] {
            push_stuffed(&mut self.bytes, byte);
        }
        self.write_bytes()
    }

    /// Pad, flush, then write restart marker `RST(index % 8)`
    pub fn write_restart(&mut self, index: u32) -> Result<()> {
        self.pad_and_flush()?;
        let rst = marker::RST0 + (index % 8) as u8;
        trace!("restart marker {:#04x} at byte {}", rst, self.bytes_written);
        self.bytes.extend_from_slice(&[marker::PREFIX, rst]);
        self.write_bytes()
    }

    /// Drop everything staged but not yet written
    pub fn discard(&mut self) {
        self.acc = 0;
        self.bit_count = 0;
        self.words.clear();
        self.bytes.clear();
    }

    /// Bytes handed to the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Bits waiting in the accumulator
    pub fn pending_bits(&self) -> u32 {
        self.bit_count
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn write_bytes(&mut self) -> Result<()> {
        if self.failed {
            self.bytes.clear();
            return Err(Error::SinkPoisoned);
        }
        if self.bytes.is_empty() {
            return Ok(());
        }
        let result = self.sink.write_all(&self.bytes);
        let len = self.bytes.len();
        self.bytes.clear();
        match result {
            Ok(()) => {
                self.bytes_written += len as u64;
                trace!("flushed {} bytes", len);
                Ok(())
            }
            Err(e) => {
                self.failed = true;
                Err(Error::Io(e))
            }
        }
    }
}

#[inline]
fn push_stuffed(out: &mut Vec<u8>, byte: u8) {
    out.push(byte);
    if byte == 0xFF {
        out.push(0x00);
    }
}
