//! Single-channel image buffers and bilinear sampling.
//!
//! Two samplers are provided:
//! - [`Image::interpolate`]: rectangle-weight variant used by the projection filter
//!   to pick up per-point intensity. The caller keeps `(x, y)` non-negative.
//! - [`Image::sample_clamped`]: clamps `(x, y)` into the image first, used by the
//!   photometric accumulator where patches can poke past the border.
//!
//! Both agree for in-bounds coordinates and return the stored sample at integer
//! coordinates.

use thiserror::Error;

/// Errors raised when wrapping pixel buffers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageError {
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: usize, height: usize },
    #[error("Row stride {stride} is smaller than width {width}")]
    StrideTooSmall { stride: usize, width: usize },
    #[error("Buffer holds {actual} samples, {expected} required")]
    BufferTooSmall { expected: usize, actual: usize },
}

/// Scalar pixel types the samplers can read.
pub trait Intensity: Copy + Send + Sync + 'static {
    fn to_f32(self) -> f32;
}

impl Intensity for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Intensity for u16 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Intensity for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

/// Row-major single-channel image with an explicit row stride (in samples).
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T = u8> {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<T>,
}

/// Bilinear weights `(w00, w01, w10, w11)` for the fractional part of `(x, y)`.
///
/// Uses the single-multiply rectangle form:
/// `w11 = dx·dy`, `w01 = dx - w11`, `w10 = dy - w11`, `w00 = 1 - dx - dy + w11`.
#[inline]
pub fn bilinear_weights(x: f32, y: f32) -> (f32, f32, f32, f32) {
    let dx = x - x.floor();
    let dy = y - y.floor();
    let w11 = dx * dy;
    let w01 = dx - w11;
    let w10 = dy - w11;
    let w00 = 1.0 - dx - dy + w11;
    (w00, w01, w10, w11)
}

impl<T: Intensity> Image<T> {
    /// Wrap a tightly packed buffer (`stride == width`).
    pub fn new(width: usize, height: usize, data: Vec<T>) -> Result<Self, ImageError> {
        Self::with_stride(width, height, width, data)
    }

    /// Wrap a buffer whose rows are `stride` samples apart.
    pub fn with_stride(
        width: usize,
        height: usize,
        stride: usize,
        data: Vec<T>,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage { width, height });
        }
        if stride < width {
            return Err(ImageError::StrideTooSmall { stride, width });
        }
        let expected = stride * (height - 1) + width;
        if data.len() < expected {
            return Err(ImageError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Build an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Result<Self, ImageError> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Sample at integer coordinates, `None` outside the image.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.stride + x])
        } else {
            None
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.stride + x].to_f32()
    }

    #[inline]
    fn blend(&self, x0: usize, y0: usize, weights: (f32, f32, f32, f32)) -> f32 {
        let (w00, w01, w10, w11) = weights;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        w00 * self.at(x0, y0) + w01 * self.at(x1, y0) + w10 * self.at(x0, y1) + w11 * self.at(x1, y1)
    }

    /// Rectangle-weight bilinear interpolation.
    ///
    /// Expects `x, y >= 0`. Coordinates on or past the last column/row read the
    /// border sample; the corresponding weights are then the only non-zero ones.
    #[inline]
    pub fn interpolate(&self, x: f32, y: f32) -> f32 {
        let x0 = (x.max(0.0) as usize).min(self.width - 1);
        let y0 = (y.max(0.0) as usize).min(self.height - 1);
        self.blend(x0, y0, bilinear_weights(x, y))
    }

    /// Bilinear sampling with `(x, y)` clamped into `[0, width-1] × [0, height-1]`.
    #[inline]
    pub fn sample_clamped(&self, x: f64, y: f64) -> f64 {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor();
        let y0 = y.floor();
        let xx = x - x0;
        let yy = y - y0;
        let (x0, y0) = (x0 as usize, y0 as usize);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        (1.0 - xx) * (1.0 - yy) * self.at(x0, y0) as f64
            + xx * (1.0 - yy) * self.at(x1, y0) as f64
            + (1.0 - xx) * yy * self.at(x0, y1) as f64
            + xx * yy * self.at(x1, y1) as f64
    }
}

impl TryFrom<::image::GrayImage> for Image<u8> {
    type Error = ImageError;

    fn try_from(gray: ::image::GrayImage) -> Result<Self, Self::Error> {
        let (width, height) = (gray.width() as usize, gray.height() as usize);
        Image::new(width, height, gray.into_raw())
    }
}
