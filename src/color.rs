//! Color space conversion
//!
//! Source pixels are first unpacked into three planar float lanes (R, G, B
//! in 0..=255), then mixed into the frame's channels. YCbCr uses the
//! JFIF/BT.601 coefficients:
//! - Y  =  0.299 * R + 0.587 * G + 0.114 * B
//! - Cb = -0.168736 * R - 0.331264 * G + 0.5 * B + 128
//! - Cr =  0.5 * R - 0.418688 * G - 0.081312 * B + 128
//!
//! With the `simd` feature the YCbCr and row arithmetic run on `wide::f32x4`
//! using the same operation order as the scalar code, so both paths produce
//! identical floats.

use rgb::alt::{BGR, BGRA};
use rgb::{RGB, RGBA};

use crate::types::ColorSpace;

pub(crate) const Y_R: f32 = 0.299;
pub(crate) const Y_G: f32 = 0.587;
pub(crate) const Y_B: f32 = 0.114;
pub(crate) const CB_R: f32 = -0.168736;
pub(crate) const CB_G: f32 = -0.331264;
pub(crate) const CB_B: f32 = 0.5;
pub(crate) const CR_R: f32 = 0.5;
pub(crate) const CR_G: f32 = -0.418688;
pub(crate) const CR_B: f32 = -0.081312;
pub(crate) const CHROMA_OFFSET: f32 = 128.0;

/// A pixel that can be split into planar R, G, B floats in 0..=255.
pub trait PlanarPixel: Copy {
    /// Gray pixels carry the same value in all three lanes
    const IS_GRAY: bool = false;

    fn to_planar(self) -> [f32; 3];

    /// Unpack `row` into the first `row.len()` entries of each lane.
    fn unpack_row(row: &[Self], r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
        for (i, &px) in row.iter().enumerate() {
            let [pr, pg, pb] = px.to_planar();
            r[i] = pr;
            g[i] = pg;
            b[i] = pb;
        }
    }
}

impl PlanarPixel for u8 {
    const IS_GRAY: bool = true;

    #[inline]
    fn to_planar(self) -> [f32; 3] {
        let v = self as f32;
        [v, v, v]
    }
}

impl PlanarPixel for u16 {
    const IS_GRAY: bool = true;

    #[inline]
    fn to_planar(self) -> [f32; 3] {
        let v = self as f32 / 257.0;
        [v, v, v]
    }
}

impl PlanarPixel for RGB<u8> {
    #[inline]
    fn to_planar(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

impl PlanarPixel for RGBA<u8> {
    #[inline]
    fn to_planar(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

impl PlanarPixel for BGR<u8> {
    #[inline]
    fn to_planar(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

impl PlanarPixel for BGRA<u8> {
    #[inline]
    fn to_planar(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

impl PlanarPixel for RGB<u16> {
    #[inline]
    fn to_planar(self) -> [f32; 3] {
        [
            self.r as f32 / 257.0,
            self.g as f32 / 257.0,
            self.b as f32 / 257.0,
        ]
    }
}

/// Mixes planar R, G, B lanes into the channels of a color space.
#[derive(Debug, Clone, Copy)]
pub struct ColorConverter {
    color_space: ColorSpace,
    gray_source: bool,
}

impl ColorConverter {
    pub fn new(color_space: ColorSpace, gray_source: bool) -> Self {
        Self {
            color_space,
            gray_source,
        }
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Convert `r.len()` pixels into `out[..channel_count]`.
    pub fn convert_row(&self, r: &[f32], g: &[f32], b: &[f32], out: &mut [&mut [f32]; 4]) {
        let [c0, c1, c2, c3] = out;
        match self.color_space {
            ColorSpace::Luminance if self.gray_source => c0.copy_from_slice(r),
            ColorSpace::Luminance => luma_row(r, g, b, c0),
            ColorSpace::YCbCr => ycbcr_row(r, g, b, c0, c1, c2),
            ColorSpace::Rgb => {
                c0.copy_from_slice(r);
                c1.copy_from_slice(g);
                c2.copy_from_slice(b);
            }
            ColorSpace::Cmyk => {
                for i in 0..r.len() {
                    let [c, m, y, k] = rgb_to_inverted_cmyk(r[i], g[i], b[i]);
                    c0[i] = c;
                    c1[i] = m;
                    c2[i] = y;
                    c3[i] = k;
                }
            }
            ColorSpace::Ycck => {
                for i in 0..r.len() {
                    let [c, m, y, k] = rgb_to_inverted_cmyk(r[i], g[i], b[i]);
                    let [yy, cb, cr] = ycbcr_pixel(c, m, y);
                    c0[i] = yy;
                    c1[i] = cb;
                    c2[i] = cr;
                    c3[i] = k;
                }
            }
        }
    }
}

#[inline]
pub(crate) fn ycbcr_pixel(r: f32, g: f32, b: f32) -> [f32; 3] {
    [
        Y_R * r + Y_G * g + Y_B * b,
        CB_R * r + CB_G * g + CB_B * b + CHROMA_OFFSET,
        CR_R * r + CR_G * g + CR_B * b + CHROMA_OFFSET,
    ]
}

/// Adobe CMYK as stored in JPEG: every channel inverted, so white is
/// (255, 255, 255, 255).
#[inline]
pub(crate) fn rgb_to_inverted_cmyk(r: f32, g: f32, b: f32) -> [f32; 4] {
    let c = 255.0 - r;
    let m = 255.0 - g;
    let y = 255.0 - b;
    let k = c.min(m).min(y);
    if k >= 255.0 {
        return [255.0, 255.0, 255.0, 0.0];
    }
    let scale = 255.0 / (255.0 - k);
    [
        255.0 - (c - k) * scale,
        255.0 - (m - k) * scale,
        255.0 - (y - k) * scale,
        255.0 - k,
    ]
}

/// Y for every pixel of a row
pub(crate) fn luma_row(r: &[f32], g: &[f32], b: &[f32], y: &mut [f32]) {
    #[cfg(feature = "simd")]
    simd::luma_row(r, g, b, y);
    #[cfg(not(feature = "simd"))]
    scalar::luma_row(r, g, b, y);
}

/// Y, Cb, Cr for every pixel of a row
pub(crate) fn ycbcr_row(
    r: &[f32],
    g: &[f32],
    b: &[f32],
    y: &mut [f32],
    cb: &mut [f32],
    cr: &mut [f32],
) {
    #[cfg(feature = "simd")]
    simd::ycbcr_row(r, g, b, y, cb, cr);
    #[cfg(not(feature = "simd"))]
    scalar::ycbcr_row(r, g, b, y, cb, cr);
}

/// `acc[i] += src[i]`
pub(crate) fn add_row(acc: &mut [f32], src: &[f32]) {
    #[cfg(feature = "simd")]
    simd::add_row(acc, src);
    #[cfg(not(feature = "simd"))]
    scalar::add_row(acc, src);
}

/// `row[i] *= factor`
pub(crate) fn scale_row(row: &mut [f32], factor: f32) {
    #[cfg(feature = "simd")]
    simd::scale_row(row, factor);
    #[cfg(not(feature = "simd"))]
    scalar::scale_row(row, factor);
}

pub(crate) mod scalar {
    use super::*;

    pub fn luma_row(r: &[f32], g: &[f32], b: &[f32], y: &mut [f32]) {
        for i in 0..y.len() {
            y[i] = Y_R * r[i] + Y_G * g[i] + Y_B * b[i];
        }
    }

    pub fn ycbcr_row(
        r: &[f32],
        g: &[f32],
        b: &[f32],
        y: &mut [f32],
        cb: &mut [f32],
        cr: &mut [f32],
    ) {
        for i in 0..y.len() {
            let [py, pcb, pcr] = ycbcr_pixel(r[i], g[i], b[i]);
            y[i] = py;
            cb[i] = pcb;
            cr[i] = pcr;
        }
    }

    pub fn add_row(acc: &mut [f32], src: &[f32]) {
        for (a, &s) in acc.iter_mut().zip(src) {
            *a += s;
        }
    }

    pub fn scale_row(row: &mut [f32], factor: f32) {
        for v in row.iter_mut() {
            *v *= factor;
        }
    }
}

#[cfg(feature = "simd")]
pub(crate) mod simd {
    use super::*;
    use wide::f32x4;

    #[inline(always)]
    fn load(s: &[f32]) -> f32x4 {
        f32x4::from([s[0], s[1], s[2], s[3]])
    }

    #[inline(always)]
    fn store(v: f32x4, d: &mut [f32]) {
        d[..4].copy_from_slice(&v.to_array());
    }

    pub fn luma_row(r: &[f32], g: &[f32], b: &[f32], y: &mut [f32]) {
        let n = y.len();
        let body = n - n % 4;
        let (yr, yg, yb) = (f32x4::splat(Y_R), f32x4::splat(Y_G), f32x4::splat(Y_B));
        for i in (0..body).step_by(4) {
            let (rv, gv, bv) = (load(&r[i..]), load(&g[i..]), load(&b[i..]));
            store(yr * rv + yg * gv + yb * bv, &mut y[i..]);
        }
        scalar::luma_row(&r[body..n], &g[body..n], &b[body..n], &mut y[body..]);
    }

    pub fn ycbcr_row(
        r: &[f32],
        g: &[f32],
        b: &[f32],
        y: &mut [f32],
        cb: &mut [f32],
        cr: &mut [f32],
    ) {
        let n = y.len();
        let body = n - n % 4;

        let (yr, yg, yb) = (f32x4::splat(Y_R), f32x4::splat(Y_G), f32x4::splat(Y_B));
        let (cbr, cbg, cbb) = (f32x4::splat(CB_R), f32x4::splat(CB_G), f32x4::splat(CB_B));
        let (crr, crg, crb) = (f32x4::splat(CR_R), f32x4::splat(CR_G), f32x4::splat(CR_B));
        let offset = f32x4::splat(CHROMA_OFFSET);

        for i in (0..body).step_by(4) {
            let (rv, gv, bv) = (load(&r[i..]), load(&g[i..]), load(&b[i..]));
            store(yr * rv + yg * gv + yb * bv, &mut y[i..]);
            store(cbr * rv + cbg * gv + cbb * bv + offset, &mut cb[i..]);
            store(crr * rv + crg * gv + crb * bv + offset, &mut cr[i..]);
        }
        scalar::ycbcr_row(
            &r[body..n],
            &g[body..n],
            &b[body..n],
            &mut y[body..],
            &mut cb[body..],
            &mut cr[body..],
        );
    }

    pub fn add_row(acc: &mut [f32], src: &[f32]) {
        let n = acc.len().min(src.len());
        let body = n - n % 4;
        for i in (0..body).step_by(4) {
            let sum = load(&acc[i..]) + load(&src[i..]);
            store(sum, &mut acc[i..]);
        }
        scalar::add_row(&mut acc[body..n], &src[body..n]);
    }

    pub fn scale_row(row: &mut [f32], factor: f32) {
        let n = row.len();
        let body = n - n % 4;
        let f = f32x4::splat(factor);
        for i in (0..body).step_by(4) {
            let v = load(&row[i..]) * f;
            store(v, &mut row[i..]);
        }
        scalar::scale_row(&mut row[body..], factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_one(cs: ColorSpace, px: [f32; 3]) -> [f32; 4] {
        let conv = ColorConverter::new(cs, false);
        let (mut a, mut b, mut c, mut d) = ([0.0f32], [0.0f32], [0.0f32], [0.0f32]);
        let mut out: [&mut [f32]; 4] = [&mut a, &mut b, &mut c, &mut d];
        conv.convert_row(&[px[0]], &[px[1]], &[px[2]], &mut out);
        [a[0], b[0], c[0], d[0]]
    }

    #[test]
    fn test_ycbcr_primaries() {
        let white = convert_one(ColorSpace::YCbCr, [255.0, 255.0, 255.0]);
        assert!((white[0] - 255.0).abs() < 0.01);
        assert!((white[1] - 128.0).abs() < 0.01);
        assert!((white[2] - 128.0).abs() < 0.01);

        let red = convert_one(ColorSpace::YCbCr, [255.0, 0.0, 0.0]);
        assert!((red[0] - 76.245).abs() < 0.01);
        assert!((red[1] - 84.97).abs() < 0.01);
        assert!((red[2] - 255.5).abs() < 0.01);
    }

    #[test]
    fn test_rgb_passthrough() {
        let out = convert_one(ColorSpace::Rgb, [10.0, 20.0, 30.0]);
        assert_eq!(&out[..3], &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_inverted_cmyk() {
        assert_eq!(
            convert_one(ColorSpace::Cmyk, [255.0, 255.0, 255.0]),
            [255.0, 255.0, 255.0, 255.0]
        );
        assert_eq!(
            convert_one(ColorSpace::Cmyk, [0.0, 0.0, 0.0]),
            [255.0, 255.0, 255.0, 0.0]
        );
        // pure red: no cyan ink inverted -> 255, full magenta and yellow -> 0
        let red = convert_one(ColorSpace::Cmyk, [255.0, 0.0, 0.0]);
        assert_eq!(red, [255.0, 0.0, 0.0, 255.0]);
    }

    #[test]
    fn test_ycck_gray_has_neutral_chroma() {
        let out = convert_one(ColorSpace::Ycck, [100.0, 100.0, 100.0]);
        assert!((out[1] - 128.0).abs() < 0.01);
        assert!((out[2] - 128.0).abs() < 0.01);
        assert!((out[3] - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_gray_source_is_exact() {
        let conv = ColorConverter::new(ColorSpace::Luminance, true);
        let r = [7.0f32, 200.0];
        let mut y = [0.0f32; 2];
        let mut out: [&mut [f32]; 4] = [&mut y, &mut [], &mut [], &mut []];
        conv.convert_row(&r, &r, &r, &mut out);
        assert_eq!(y, r);
    }

    #[test]
    fn test_pixel_formats() {
        assert_eq!(RGB::new(1u8, 2, 3).to_planar(), [1.0, 2.0, 3.0]);
        assert_eq!(RGBA::new(1u8, 2, 3, 0).to_planar(), [1.0, 2.0, 3.0]);
        assert_eq!(BGR { b: 3u8, g: 2, r: 1 }.to_planar(), [1.0, 2.0, 3.0]);
        assert_eq!(
            BGRA {
                b: 3u8,
                g: 2,
                r: 1,
                a: 9
            }
            .to_planar(),
            [1.0, 2.0, 3.0]
        );
        assert_eq!(65535u16.to_planar(), [255.0, 255.0, 255.0]);
        assert_eq!(RGB::new(0u16, 257, 65535).to_planar(), [0.0, 1.0, 255.0]);
    }

    #[cfg(feature = "simd")]
    mod simd_matches_scalar {
        use super::super::{scalar, simd};
        use proptest::prelude::*;

        fn lanes() -> impl Strategy<Value = (Vec<f32>, Vec<f32>, Vec<f32>)> {
            (1usize..37).prop_flat_map(|n| {
                (
                    proptest::collection::vec(0.0f32..=255.0, n),
                    proptest::collection::vec(0.0f32..=255.0, n),
                    proptest::collection::vec(0.0f32..=255.0, n),
                )
            })
        }

        proptest! {
            #[test]
            fn ycbcr_row_identical((r, g, b) in lanes()) {
                let n = r.len();
                let (mut y1, mut cb1, mut cr1) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
                let (mut y2, mut cb2, mut cr2) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
                scalar::ycbcr_row(&r, &g, &b, &mut y1, &mut cb1, &mut cr1);
                simd::ycbcr_row(&r, &g, &b, &mut y2, &mut cb2, &mut cr2);
                prop_assert_eq!(y1, y2);
                prop_assert_eq!(cb1, cb2);
                prop_assert_eq!(cr1, cr2);
            }

            #[test]
            fn luma_row_identical((r, g, b) in lanes()) {
                let n = r.len();
                let (mut y1, mut y2) = (vec![0.0; n], vec![0.0; n]);
                scalar::luma_row(&r, &g, &b, &mut y1);
                simd::luma_row(&r, &g, &b, &mut y2);
                prop_assert_eq!(y1, y2);
            }

            #[test]
            fn add_and_scale_identical((a, b, _c) in lanes(), factor in 0.0f32..1.0) {
                let mut s = a.clone();
                let mut v = a.clone();
                scalar::add_row(&mut s, &b);
                simd::add_row(&mut v, &b);
                scalar::scale_row(&mut s, factor);
                simd::scale_row(&mut v, factor);
                prop_assert_eq!(s, v);
            }
        }
    }
}
