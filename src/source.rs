//! Row-oriented pixel sources

use imgref::Img;

use crate::color::PlanarPixel;
use crate::error::{Error, Result};

/// Random access to the rows of an image.
pub trait PixelRows {
    type Pixel: PlanarPixel;

    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Row `y`, exactly `width()` pixels long. `None` when the backing
    /// buffer is too short to hold it.
    fn row(&self, y: usize) -> Option<&[Self::Pixel]>;

    /// Row `y`, clamped to the last row so reads past the bottom edge
    /// replicate it.
    fn row_clamped(&self, y: usize) -> Result<&[Self::Pixel]> {
        let last = self.height().saturating_sub(1);
        self.row(y.min(last)).ok_or(Error::InvalidDimensions {
            width: self.width(),
            height: self.height(),
            reason: "pixel buffer is shorter than the image",
        })
    }
}

impl<T: PixelRows + ?Sized> PixelRows for &T {
    type Pixel = T::Pixel;

    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn row(&self, y: usize) -> Option<&[Self::Pixel]> {
        (**self).row(y)
    }
}

#[inline]
fn strided_row<P>(buf: &[P], stride: usize, width: usize, y: usize) -> Option<&[P]> {
    let start = y.checked_mul(stride)?;
    buf.get(start..start.checked_add(width)?)
}

impl<P: PlanarPixel> PixelRows for Img<&[P]> {
    type Pixel = P;

    fn width(&self) -> usize {
        Img::width(self)
    }

    fn height(&self) -> usize {
        Img::height(self)
    }

    fn row(&self, y: usize) -> Option<&[P]> {
        strided_row(self.buf(), self.stride(), Img::width(self), y)
    }
}

impl<P: PlanarPixel> PixelRows for Img<Vec<P>> {
    type Pixel = P;

    fn width(&self) -> usize {
        Img::width(self)
    }

    fn height(&self) -> usize {
        Img::height(self)
    }

    fn row(&self, y: usize) -> Option<&[P]> {
        strided_row(self.buf(), self.stride(), Img::width(self), y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::{ImgRef, ImgVec};

    #[test]
    fn test_rows_clamp_to_last() {
        let data: Vec<u8> = (0..12).collect();
        let img = ImgVec::new(data, 4, 3);
        assert_eq!(img.row_clamped(1).unwrap(), &[4, 5, 6, 7]);
        assert_eq!(img.row_clamped(2).unwrap(), &[8, 9, 10, 11]);
        assert_eq!(img.row_clamped(100).unwrap(), &[8, 9, 10, 11]);
    }

    #[test]
    fn test_stride_is_honored() {
        let data: Vec<u8> = (0..12).collect();
        let img = ImgRef::new_stride(&data[..], 3, 2, 6);
        assert_eq!(PixelRows::row(&img, 1).unwrap(), &[6, 7, 8]);
        assert_eq!(PixelRows::width(&img), 3);
    }

    #[test]
    fn test_short_buffer_is_an_error() {
        let rows: &[u8] = &[0; 5];
        assert_eq!(strided_row(rows, 4, 4, 0), Some(&rows[..4]));
        assert_eq!(strided_row(rows, 4, 4, 1), None);
        assert_eq!(strided_row(rows, usize::MAX, 4, 2), None);
    }
}
