//! Binary exposure masks.
//!
//! A [`Mask`] is an 8-bit grayscale bitmap where any non-zero pixel is lit.
//! Masks are immutable: the tight bounding box of lit pixels is computed once
//! at construction so overlap prefilters never rescan pixel data.

use image::{GrayImage, Luma};

use crate::bbox::PixelBox;
use crate::config::CanvasConfig;
use crate::error::{Error, Result};

/// Pixel value written for lit pixels by the constructors in this module.
pub const LIT: u8 = 255;

/// Grayscale bitmap denoting the pixels exposed in one printer pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pixels: GrayImage,
    bbox: Option<PixelBox>,
}

impl Mask {
    /// Wraps a grayscale image.
    pub fn new(pixels: GrayImage) -> Self {
        let bbox = lit_bounds(&pixels);
        Self { pixels, bbox }
    }

    /// Creates a mask with no lit pixels.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::new(width, height),
            bbox: None,
        }
    }

    /// Creates a mask from a row-major pixel buffer.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        GrayImage::from_raw(width, height, data)
            .map(Self::new)
            .ok_or(Error::InvalidPixelBuffer { width, height, len })
    }

    /// Creates a mask by evaluating `lit(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, lit: F) -> Self
    where
        F: Fn(u32, u32) -> bool,
    {
        Self::new(GrayImage::from_fn(width, height, |x, y| {
            if lit(x, y) {
                Luma([LIT])
            } else {
                Luma([0])
            }
        }))
    }

    /// Creates a mask with every given rectangle filled.
    ///
    /// Rectangles are clipped to the mask bounds.
    pub fn from_rects(width: u32, height: u32, rects: &[PixelBox]) -> Self {
        let mut pixels = GrayImage::new(width, height);
        for rect in rects.iter().filter_map(|r| r.clip(width, height)) {
            for y in rect.min_y..rect.max_y {
                for x in rect.min_x..rect.max_x {
                    pixels.put_pixel(x, y, Luma([LIT]));
                }
            }
        }
        Self::new(pixels)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Tight bounding box of the lit pixels, `None` for an empty mask.
    pub fn bounding_box(&self) -> Option<PixelBox> {
        self.bbox
    }

    /// Returns true if no pixel is lit.
    pub fn is_empty(&self) -> bool {
        self.bbox.is_none()
    }

    /// Returns true if the pixel at `(x, y)` is lit. Out-of-range pixels are unlit.
    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.pixels.get_pixel(x, y)[0] > 0
    }

    /// Number of lit pixels.
    pub fn lit_count(&self) -> usize {
        match self.bbox {
            Some(bbox) => self
                .rows(&bbox)
                .map(|row| row.iter().filter(|&&p| p > 0).count())
                .sum(),
            None => 0,
        }
    }

    /// Borrows the underlying image.
    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Consumes the mask, returning the underlying image.
    pub fn into_image(self) -> GrayImage {
        self.pixels
    }

    /// Returns true if any pixel inside `region` is lit.
    pub fn any_lit_in(&self, region: &PixelBox) -> bool {
        match region.clip(self.width(), self.height()) {
            Some(region) => self.rows(&region).any(|row| row.iter().any(|&p| p > 0)),
            None => false,
        }
    }

    /// Returns true if both masks have a lit pixel at the same position inside `region`.
    ///
    /// Equivalent to checking the pixelwise product of the two crops for a
    /// non-zero value.
    pub fn shares_lit_pixel_in(&self, other: &Mask, region: &PixelBox) -> bool {
        let width = self.width().min(other.width());
        let height = self.height().min(other.height());
        let Some(region) = region.clip(width, height) else {
            return false;
        };
        self.rows(&region)
            .zip(other.rows(&region))
            .any(|(a, b)| a.iter().zip(b).any(|(&pa, &pb)| pa > 0 && pb > 0))
    }

    /// Unions masks with a lighter (pixelwise maximum) combine.
    ///
    /// The result is canvas-sized; every input must match the canvas.
    pub fn union<'a, I>(masks: I, canvas: &CanvasConfig) -> Result<Mask>
    where
        I: IntoIterator<Item = &'a Mask>,
    {
        let mut out = GrayImage::new(canvas.width, canvas.height);
        let mut bbox: Option<PixelBox> = None;

        for mask in masks {
            if mask.dimensions() != canvas.dimensions() {
                return Err(Error::DimensionMismatch {
                    expected: canvas.dimensions(),
                    found: mask.dimensions(),
                });
            }
            let Some(src_box) = mask.bbox else {
                continue;
            };
            let stride = canvas.width as usize;
            let dst = &mut *out;
            for (offset, row) in mask.rows(&src_box).enumerate() {
                let y = src_box.min_y as usize + offset;
                let start = y * stride + src_box.min_x as usize;
                for (d, &s) in dst[start..start + row.len()].iter_mut().zip(row) {
                    *d = (*d).max(s);
                }
            }
            bbox = Some(match bbox {
                Some(b) => b.union(&src_box),
                None => src_box,
            });
        }

        Ok(Self { pixels: out, bbox })
    }

    /// Iterates the row slices of `region`, which must lie within the mask.
    fn rows<'a>(&'a self, region: &PixelBox) -> impl Iterator<Item = &'a [u8]> + 'a {
        let stride = self.width() as usize;
        let (x0, x1) = (region.min_x as usize, region.max_x as usize);
        let raw: &'a [u8] = self.pixels.as_raw();
        (region.min_y as usize..region.max_y as usize)
            .map(move |y| &raw[y * stride + x0..y * stride + x1])
    }
}

/// Computes the tight bounding box of non-zero pixels.
fn lit_bounds(pixels: &GrayImage) -> Option<PixelBox> {
    let width = pixels.width() as usize;
    if width == 0 {
        return None;
    }

    let mut bounds: Option<PixelBox> = None;
    for (y, row) in pixels.as_raw().chunks_exact(width).enumerate() {
        let Some(first) = row.iter().position(|&p| p > 0) else {
            continue;
        };
        let last = row.iter().rposition(|&p| p > 0).unwrap_or(first);
        let row_box = PixelBox::new(first as u32, y as u32, last as u32 + 1, y as u32 + 1);
        bounds = Some(match bounds {
            Some(b) => b.union(&row_box),
            None => row_box,
        });
    }
    bounds
}
