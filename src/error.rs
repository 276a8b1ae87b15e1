//! Error types for zenjpeg-scan

use crate::types::TableClass;

/// Result type for zenjpeg-scan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for zenjpeg-scan operations
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid image dimensions
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: &'static str,
    },

    /// A component's sampling factors don't fit the frame
    #[error("invalid sampling factors {horizontal}x{vertical} for component {component}: {reason}")]
    InvalidSamplingFactors {
        component: usize,
        horizontal: u8,
        vertical: u8,
        reason: &'static str,
    },

    /// Canonical Huffman specification is malformed
    #[error("invalid {class:?} Huffman table {index}: {reason}")]
    InvalidHuffmanTable {
        class: TableClass,
        index: u8,
        reason: &'static str,
    },

    /// A component references a Huffman table that was never built
    #[error("{class:?} Huffman table {index} has not been built")]
    MissingHuffmanTable { class: TableClass, index: u8 },

    /// A symbol has no code in the table it is emitted through
    #[error("symbol {symbol:#04x} has no code in the Huffman table")]
    MissingHuffmanCode { symbol: u8 },

    /// A component references a quantization table that was not provided
    #[error("invalid quantization table {index}: {reason}")]
    InvalidQuantTable { index: u8, reason: &'static str },

    /// AC spectral selection outside 1..=64 or empty
    #[error("invalid spectral selection [{start}, {end})")]
    InvalidSpectralSelection { start: usize, end: usize },

    /// Spectral buffer was never allocated
    #[error("spectral buffer for component {component} is not allocated")]
    SpectralNotAllocated { component: usize },

    /// Whole-image scan requested over a strip-sized spectral buffer
    #[error("spectral buffer for component {component} holds {rows} block rows, {needed} required")]
    SpectralTooSmall {
        component: usize,
        rows: usize,
        needed: usize,
    },

    /// Encoder configuration is inconsistent
    #[error("invalid encoder configuration: {0}")]
    InvalidConfig(String),

    /// Encoding was cancelled by the caller
    #[error("encoding cancelled")]
    Cancelled,

    /// A previous write to the sink failed; nothing more is written
    #[error("output sink failed earlier in this encode call")]
    SinkPoisoned,

    /// Output sink write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error is the cooperative cancellation signal rather
    /// than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub(crate) fn huffman(class: TableClass, index: u8, reason: &'static str) -> Self {
        Error::InvalidHuffmanTable {
            class,
            index,
            reason,
        }
    }
}
