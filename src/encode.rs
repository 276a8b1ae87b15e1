//! Main encoder implementation
//!
//! [`Encoder`] turns a pixel source into the entropy-coded scans of a
//! JPEG frame, together with the tables and component layout a container
//! writer needs to frame them. Markers are not written here.

use std::mem;

use log::debug;

use crate::cancel::CancellationToken;
use crate::convert::SpectralConverter;
use crate::entropy::ScanEncoder;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::progressive::{scans_for, ScanInfo};
use crate::quant::QuantTable;
use crate::source::PixelRows;
use crate::types::{
    ColorSpace, ComponentConfig, FrameConfig, HuffmanTableConfig, ScanScript, Subsampling,
};

/// Default quality factor
pub const DEFAULT_QUALITY: u8 = 85;

/// Entropy-coded bytes of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedScan {
    /// Components and coefficient band the scan covers
    pub info: ScanInfo,
    /// Stuffed, padded entropy-coded segment, restart markers included
    pub data: Vec<u8>,
}

/// Everything needed to frame the encoded scans.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: usize,
    pub height: usize,
    pub color_space: ColorSpace,
    /// Tables as used for quantization, natural order
    pub quant_tables: Vec<QuantTable>,
    pub huffman_tables: Vec<HuffmanTableConfig>,
    pub components: Vec<ComponentConfig>,
    /// MCUs (interleaved scans) or blocks between restart markers; 0 for none
    pub restart_interval: u16,
    /// Scans use spectral selection (SOF2) rather than sequential coding
    pub progressive: bool,
    pub scans: Vec<EncodedScan>,
}

impl EncodedImage {
    /// Total entropy-coded bytes over all scans
    pub fn scan_bytes(&self) -> usize {
        self.scans.iter().map(|s| s.data.len()).sum()
    }
}

/// JPEG scan encoder with configurable quality and frame layout
#[derive(Clone, Debug)]
pub struct Encoder {
    quality: u8,
    frame: FrameConfig,
    restart_interval: u16,
    interleaved: bool,
    progressive: bool,
    scan_script: ScanScript,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Create a new encoder with default settings: quality 85, YCbCr 4:2:0,
    /// one interleaved sequential scan, no restart markers.
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            frame: FrameConfig::ycbcr(Subsampling::default()),
            restart_interval: 0,
            interleaved: true,
            progressive: false,
            scan_script: ScanScript::default(),
        }
    }

    /// Set the quality level, clamped to 1..=100
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Use a custom frame layout
    pub fn frame(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Use the default frame layout for `color_space`
    pub fn color_space(self, color_space: ColorSpace) -> Self {
        self.frame(FrameConfig::for_color_space(color_space))
    }

    /// YCbCr frame with the given chroma subsampling
    pub fn subsampling(self, subsampling: Subsampling) -> Self {
        self.frame(FrameConfig::ycbcr(subsampling))
    }

    /// Restart marker spacing; 0 disables restart markers
    pub fn restart_interval(mut self, interval: u16) -> Self {
        self.restart_interval = interval;
        self
    }

    /// Code all components in one scan (default) or one scan each.
    ///
    /// Ignored for single-component frames and in progressive mode.
    pub fn interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }

    /// Enable or disable progressive encoding
    pub fn progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    /// Set the progressive scan script.
    ///
    /// This only applies when progressive mode is enabled.
    pub fn scan_script(mut self, script: ScanScript) -> Self {
        self.scan_script = script;
        self
    }

    pub fn get_quality(&self) -> u8 {
        self.quality
    }

    pub fn frame_config(&self) -> &FrameConfig {
        &self.frame
    }

    /// Encode `source` into scans.
    ///
    /// Single-component and interleaved sequential frames are converted
    /// one MCU row at a time; non-interleaved and progressive frames need
    /// the whole image's coefficients first. Returns [`Error::Cancelled`]
    /// once `cancel` fires.
    pub fn encode<S: PixelRows>(&self, source: S, cancel: &CancellationToken) -> Result<EncodedImage> {
        let (width, height) = (source.width(), source.height());
        let num_components = self.frame.components.len();
        let interleaved = if self.progressive {
            num_components > 1
        } else {
            self.interleaved
        };

        let mut frame = Frame::new(width, height, &self.frame, interleaved)?;
        let quant_tables: Vec<QuantTable> = self
            .frame
            .quant_tables
            .iter()
            .map(|config| QuantTable::from_config(config, self.quality))
            .collect();
        let mut converter = SpectralConverter::new(&frame, &quant_tables, source)?;

        let mut encoder = ScanEncoder::new(Vec::new());
        for table in &self.frame.huffman_tables {
            encoder.build_huffman_table(table.class, table.destination, &table.spec)?;
        }
        encoder.set_restart_interval(self.restart_interval);

        debug!(
            "encoding {}x{} {:?}, {} components, {}x{} MCUs, quality {}, {}",
            width,
            height,
            frame.color_space,
            num_components,
            frame.mcus_per_line(),
            frame.mcus_per_column(),
            self.quality,
            if self.progressive {
                "progressive"
            } else if num_components == 1 {
                "single component"
            } else if interleaved {
                "interleaved"
            } else {
                "non-interleaved"
            }
        );

        let mut scans = Vec::new();
        let mut take_scan = |encoder: &mut ScanEncoder<Vec<u8>>, info: ScanInfo| {
            scans.push(EncodedScan {
                info,
                data: mem::take(encoder.get_mut()),
            });
        };

        if self.progressive {
            let script = scans_for(&self.scan_script, num_components as u8)?;
            debug!("progressive script with {} scans", script.len());
            frame.allocate_spectral(true);
            converter.convert_full(&mut frame, cancel)?;
            for info in script {
                if info.is_dc_scan() {
                    encoder.encode_dc_scan(&mut frame, cancel)?;
                } else {
                    let component = info.component_index[0] as usize;
                    encoder.encode_ac_scan(
                        &mut frame,
                        component,
                        info.ss as usize,
                        info.spectral_end(),
                        cancel,
                    )?;
                }
                take_scan(&mut encoder, info);
            }
        } else if num_components == 1 {
            frame.allocate_spectral(false);
            encoder.encode_scan_baseline_single_component(&mut frame, &mut converter, cancel)?;
            take_scan(&mut encoder, ScanInfo::baseline(1));
        } else if interleaved {
            frame.allocate_spectral(false);
            encoder.encode_scan_baseline_interleaved(&mut frame, &mut converter, cancel)?;
            take_scan(&mut encoder, ScanInfo::baseline(num_components as u8));
        } else {
            frame.allocate_spectral(true);
            converter.convert_full(&mut frame, cancel)?;
            for component in 0..num_components {
                encoder.encode_scan_baseline(&mut frame, component, cancel)?;
                take_scan(&mut encoder, ScanInfo::single_component(component as u8));
            }
        }
        frame.release_spectral();

        let image = EncodedImage {
            width,
            height,
            color_space: frame.color_space,
            quant_tables,
            huffman_tables: self.frame.huffman_tables.clone(),
            components: self.frame.components.clone(),
            restart_interval: self.restart_interval,
            progressive: self.progressive,
            scans,
        };
        debug!(
            "encoded {} scans, {} bytes",
            image.scans.len(),
            image.scan_bytes()
        );
        if image.scans.is_empty() {
            return Err(Error::InvalidConfig("no scans were produced".into()));
        }
        Ok(image)
    }
}
