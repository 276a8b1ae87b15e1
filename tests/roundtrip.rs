//! Roundtrip encoding/decoding tests for zenjpeg-scan
//!
//! Scans are framed into a JPEG stream by the test helper and decoded with
//! `jpeg-decoder`.

mod common;

use common::{frame_jpeg, gradient_rgb, init_logging, mean_abs_diff, noise_gray, uniform_rgb};
use imgref::ImgVec;
use jpeg_decoder::PixelFormat;
use rgb::{ComponentBytes, RGB8};
use zenjpeg_scan::{CancellationToken, ColorSpace, Encoder, ScanScript, Subsampling};

fn decode(jpeg: &[u8]) -> (Vec<u8>, PixelFormat, u16, u16) {
    let mut decoder = jpeg_decoder::Decoder::new(jpeg);
    let pixels = decoder.decode().expect("decode failed");
    let info = decoder.info().expect("info after decode");
    (pixels, info.pixel_format, info.width, info.height)
}

fn encode_rgb(encoder: &Encoder, img: &ImgVec<RGB8>) -> Vec<u8> {
    let image = encoder
        .encode(img.as_ref(), &CancellationToken::new())
        .expect("encode failed");
    frame_jpeg(&image)
}

#[test]
fn test_roundtrip_gradient_q90() {
    init_logging();
    let img = gradient_rgb(64, 48);
    let jpeg = encode_rgb(&Encoder::new().quality(90), &img);
    let (pixels, format, width, height) = decode(&jpeg);
    assert_eq!(format, PixelFormat::RGB24);
    assert_eq!((width, height), (64, 48));
    let error = mean_abs_diff(&pixels, img.buf().as_bytes());
    assert!(error < 3.0, "mean error {}", error);
}

#[test]
fn test_uniform_colors_all_subsamplings() {
    init_logging();
    let colors = [
        RGB8::new(255, 0, 0),
        RGB8::new(0, 128, 255),
        RGB8::new(30, 200, 90),
        RGB8::new(255, 255, 255),
        RGB8::new(0, 0, 0),
    ];
    for subsampling in [
        Subsampling::S444,
        Subsampling::S422,
        Subsampling::S420,
        Subsampling::S411,
        Subsampling::S410,
    ] {
        for &color in &colors {
            let img = uniform_rgb(37, 29, color);
            let jpeg = encode_rgb(&Encoder::new().quality(95).subsampling(subsampling), &img);
            let (pixels, _, width, height) = decode(&jpeg);
            assert_eq!((width, height), (37, 29));
            for px in pixels.chunks(3) {
                for (&got, want) in px.iter().zip([color.r, color.g, color.b]) {
                    assert!(
                        (got as i32 - want as i32).abs() <= 4,
                        "{:?} {:?}: got {:?}",
                        subsampling,
                        color,
                        px
                    );
                }
            }
        }
    }
}

#[test]
fn test_odd_sizes_decode() {
    for (width, height) in [(1, 1), (7, 9), (8, 8), (17, 3), (33, 65), (100, 1)] {
        let img = gradient_rgb(width, height);
        let jpeg = encode_rgb(&Encoder::new(), &img);
        let (pixels, _, w, h) = decode(&jpeg);
        assert_eq!((w as usize, h as usize), (width, height));
        assert_eq!(pixels.len(), width * height * 3);
    }
}

#[test]
fn test_grayscale_encoding() {
    let img = noise_gray(45, 30, 7);
    let image = Encoder::new()
        .quality(100)
        .color_space(ColorSpace::Luminance)
        .encode(img.as_ref(), &CancellationToken::new())
        .unwrap();
    assert_eq!(image.scans.len(), 1);
    let (pixels, format, _, _) = decode(&frame_jpeg(&image));
    assert_eq!(format, PixelFormat::L8);
    let error = mean_abs_diff(&pixels, img.buf());
    assert!(error < 1.5, "mean error {}", error);
}

#[test]
fn test_rgb_color_space() {
    let img = gradient_rgb(40, 24);
    let jpeg = encode_rgb(&Encoder::new().quality(95).color_space(ColorSpace::Rgb), &img);
    let (pixels, format, _, _) = decode(&jpeg);
    assert_eq!(format, PixelFormat::RGB24);
    let error = mean_abs_diff(&pixels, img.buf().as_bytes());
    assert!(error < 3.0, "mean error {}", error);
}

#[test]
fn test_four_channel_color_spaces_decode() {
    let img = gradient_rgb(24, 16);
    for color_space in [ColorSpace::Cmyk, ColorSpace::Ycck] {
        let jpeg = encode_rgb(&Encoder::new().color_space(color_space), &img);
        let (pixels, format, _, _) = decode(&jpeg);
        assert_eq!(format, PixelFormat::CMYK32);
        assert_eq!(pixels.len(), 24 * 16 * 4);
    }
}

#[test]
fn test_restart_intervals_decode() {
    init_logging();
    let img = gradient_rgb(70, 50);
    let reference = decode(&encode_rgb(&Encoder::new().quality(80), &img)).0;
    for interval in [1, 2, 3, 7, 100] {
        let jpeg = encode_rgb(&Encoder::new().quality(80).restart_interval(interval), &img);
        let (pixels, _, _, _) = decode(&jpeg);
        // restarts change the bitstream, never the coefficients
        assert_eq!(pixels, reference, "interval {}", interval);
    }
}

#[test]
fn test_non_interleaved_matches_interleaved() {
    let img = gradient_rgb(50, 34);
    let interleaved = decode(&encode_rgb(&Encoder::new().quality(85), &img)).0;
    for interval in [0, 5] {
        let jpeg = encode_rgb(
            &Encoder::new()
                .quality(85)
                .interleaved(false)
                .restart_interval(interval),
            &img,
        );
        assert_eq!(decode(&jpeg).0, interleaved);
    }
}

#[test]
fn test_progressive_matches_baseline() {
    init_logging();
    let img = gradient_rgb(53, 41);
    for subsampling in [Subsampling::S444, Subsampling::S420] {
        let baseline = decode(&encode_rgb(&Encoder::new().subsampling(subsampling), &img)).0;
        for script in [ScanScript::Minimal, ScanScript::Simple] {
            let jpeg = encode_rgb(
                &Encoder::new()
                    .subsampling(subsampling)
                    .progressive(true)
                    .scan_script(script.clone()),
                &img,
            );
            assert_eq!(decode(&jpeg).0, baseline, "{:?} {:?}", subsampling, script);
        }
    }
}

#[test]
fn test_progressive_grayscale_with_restarts() {
    let img = noise_gray(33, 20, 99);
    let encoder = Encoder::new().color_space(ColorSpace::Luminance).quality(70);
    let baseline = encoder
        .clone()
        .encode(img.as_ref(), &CancellationToken::new())
        .unwrap();
    let progressive = encoder
        .progressive(true)
        .restart_interval(4)
        .encode(img.as_ref(), &CancellationToken::new())
        .unwrap();
    assert_eq!(progressive.scans.len(), 2);
    assert_eq!(
        decode(&frame_jpeg(&progressive)).0,
        decode(&frame_jpeg(&baseline)).0
    );
}

#[test]
fn test_quality_affects_size() {
    let img = gradient_rgb(64, 64);
    let cancel = CancellationToken::new();
    let low = Encoder::new().quality(20).encode(img.as_ref(), &cancel).unwrap();
    let high = Encoder::new().quality(95).encode(img.as_ref(), &cancel).unwrap();
    assert!(
        low.scan_bytes() < high.scan_bytes(),
        "q20 {} bytes, q95 {} bytes",
        low.scan_bytes(),
        high.scan_bytes()
    );
}

#[test]
fn test_pixel_formats_agree() {
    // the same colors through different pixel layouts give the same scans
    let img = gradient_rgb(19, 13);
    let cancel = CancellationToken::new();
    let encoder = Encoder::new().quality(75);
    let from_rgb = encoder.encode(img.as_ref(), &cancel).unwrap();

    let bgra: Vec<rgb::alt::BGRA8> = img
        .buf()
        .iter()
        .map(|p| rgb::alt::BGRA8 { b: p.b, g: p.g, r: p.r, a: 255 })
        .collect();
    let from_bgra = encoder
        .encode(ImgVec::new(bgra, 19, 13).as_ref(), &cancel)
        .unwrap();
    assert_eq!(from_rgb.scans, from_bgra.scans);

    let wide: Vec<rgb::RGB16> = img
        .buf()
        .iter()
        .map(|p| rgb::RGB16::new(p.r as u16 * 257, p.g as u16 * 257, p.b as u16 * 257))
        .collect();
    let from_16 = encoder
        .encode(ImgVec::new(wide, 19, 13).as_ref(), &cancel)
        .unwrap();
    assert_eq!(from_rgb.scans, from_16.scans);
}

#[test]
fn test_strided_source() {
    // stride wider than the image: padding pixels must not leak in
    let width = 20;
    let height = 10;
    let stride = 32;
    let img = gradient_rgb(width, height);
    let mut padded = vec![RGB8::new(255, 0, 255); stride * height];
    for y in 0..height {
        padded[y * stride..y * stride + width].copy_from_slice(&img.buf()[y * width..(y + 1) * width]);
    }
    let strided = ImgVec::new_stride(padded, width, height, stride);

    let cancel = CancellationToken::new();
    let a = Encoder::new().encode(img.as_ref(), &cancel).unwrap();
    let b = Encoder::new().encode(strided.as_ref(), &cancel).unwrap();
    assert_eq!(a.scans, b.scans);
}
