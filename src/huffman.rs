//! Canonical Huffman tables for encoding.
//!
//! A [`HuffmanSpec`] is the form a DHT segment carries: how many codes
//! exist of each length 1..=16, and the symbols in code order. Building a
//! [`HuffmanLut`] assigns codes the canonical way (Figures C.1-C.3 of
//! ITU-T T.81) and stores each one left-justified in a `u32` next to its
//! length, so the bit writer can OR it into its accumulator without any
//! further shifting by code length.

use crate::error::{Error, Result};
use crate::types::TableClass;

/// Maximum code length allowed by JPEG (16 bits)
pub const MAX_CODE_LENGTH: usize = 16;

/// Largest DC difference category
pub const MAX_DC_SYMBOL: u8 = 15;

/// Canonical table specification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HuffmanSpec {
    /// `counts[i]` codes of length `i + 1`
    pub counts: [u8; MAX_CODE_LENGTH],
    /// Symbols ordered by code length, then by code
    pub values: Vec<u8>,
}

impl HuffmanSpec {
    pub fn new(counts: [u8; MAX_CODE_LENGTH], values: Vec<u8>) -> Self {
        Self { counts, values }
    }

    /// Total codes the counts describe
    pub fn total_codes(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }
}

/// Direct symbol → code lookup.
///
/// Each entry is `(code << (32 - len)) | len`; `len == 0` means the symbol
/// has no code.
#[derive(Clone, Debug)]
pub struct HuffmanLut {
    table: [u32; 256],
}

impl Default for HuffmanLut {
    fn default() -> Self {
        Self { table: [0; 256] }
    }
}

impl HuffmanLut {
    /// Build the lookup from a canonical specification.
    ///
    /// Fails when the per-length counts disagree with the number of
    /// symbols, when a length's codes overflow its bit width, on duplicate
    /// symbols, or on DC symbols above 15.
    pub fn build(class: TableClass, index: u8, spec: &HuffmanSpec) -> Result<Self> {
        let invalid = |reason| Error::huffman(class, index, reason);

        let total = spec.total_codes();
        if total != spec.values.len() {
            return Err(invalid("code-length counts do not match the number of symbols"));
        }
        if total == 0 || total > 256 {
            return Err(invalid("a table needs 1 to 256 symbols"));
        }

        let mut lut = Self::default();
        let mut code = 0u32;
        let mut p = 0usize;

        for (i, &count) in spec.counts.iter().enumerate() {
            let len = (i + 1) as u32;
            for _ in 0..count {
                let symbol = spec.values[p];
                if class == TableClass::Dc && symbol > MAX_DC_SYMBOL {
                    return Err(invalid("DC symbol above 15"));
                }
                let slot = &mut lut.table[symbol as usize];
                if *slot != 0 {
                    return Err(invalid("duplicate symbol"));
                }
                *slot = (code << (32 - len)) | len;
                code += 1;
                p += 1;
            }
            // all-ones codes are reserved
            if code >= (1 << len) {
                return Err(invalid("codes overflow their length"));
            }
            code <<= 1;
        }

        Ok(lut)
    }

    /// Packed entry for `symbol`
    #[inline]
    pub fn entry(&self, symbol: u8) -> u32 {
        self.table[symbol as usize]
    }

    /// Right-aligned code and its length; length 0 when the symbol has no code
    pub fn code(&self, symbol: u8) -> (u16, u8) {
        let entry = self.entry(symbol);
        let len = entry & 0xFF;
        if len == 0 {
            return (0, 0);
        }
        ((entry >> (32 - len)) as u16, len as u8)
    }
}

/// Number of bits needed to represent `value`'s magnitude (0 for 0)
#[inline]
pub fn category(value: i32) -> u32 {
    32 - value.unsigned_abs().leading_zeros()
}
