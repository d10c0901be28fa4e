//! Synthetic mask generator for exercising the partitioner.
//!
//! Each mask is a blank canvas with one filled rectangle or ellipse at a
//! random position.

use dosemux_core::{CanvasConfig, Mask, MaskTable, PixelBox, Result};
use image::{GrayImage, Luma};
use rand::prelude::*;

/// Largest rectangle side.
const MAX_RECT: u32 = 800;
/// Largest ellipse diameter.
const MAX_ELLIPSE: u32 = 500;
/// Smallest shape side.
const MIN_SIZE: u32 = 50;
/// Shapes start at least this far from the right and bottom edges.
const EDGE_MARGIN: u32 = 100;

/// Seeded generator of random single-shape masks.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    /// Creates a new generator with a specific seed for reproducibility.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generates `count` masks named `synthetic_<i>.png`.
    pub fn masks(&mut self, count: usize, canvas: &CanvasConfig) -> Result<MaskTable> {
        canvas.validate()?;
        Ok((0..count)
            .map(|i| (format!("synthetic_{i:03}.png"), self.shape(canvas)))
            .collect())
    }

    /// Generates one mask with a random rectangle or ellipse.
    pub fn shape(&mut self, canvas: &CanvasConfig) -> Mask {
        if self.rng.gen_bool(0.5) {
            let bounds = self.bounds(canvas, MAX_RECT);
            Mask::from_rects(canvas.width, canvas.height, &[bounds])
        } else {
            let bounds = self.bounds(canvas, MAX_ELLIPSE);
            ellipse(canvas, &bounds)
        }
    }

    fn bounds(&mut self, canvas: &CanvasConfig, max_len: u32) -> PixelBox {
        let (x0, x1) = self.span(canvas.width, max_len);
        let (y0, y1) = self.span(canvas.height, max_len);
        PixelBox::new(x0, y0, x1, y1)
    }

    /// Random `[start, end)` along an axis of length `extent`.
    fn span(&mut self, extent: u32, max_len: u32) -> (u32, u32) {
        let margin = EDGE_MARGIN.min(extent / 2).max(1);
        let min_len = MIN_SIZE.min(margin);
        let start = self.rng.gen_range(0..=extent - margin);
        let end = self
            .rng
            .gen_range(start + min_len..=(start + max_len.max(min_len)).min(extent));
        (start, end)
    }
}

/// Filled ellipse inscribed in `bounds`, sampled at pixel centers.
fn ellipse(canvas: &CanvasConfig, bounds: &PixelBox) -> Mask {
    let mut pixels = GrayImage::new(canvas.width, canvas.height);
    let cx = (bounds.min_x + bounds.max_x) as f64 / 2.0;
    let cy = (bounds.min_y + bounds.max_y) as f64 / 2.0;
    let rx = bounds.width() as f64 / 2.0;
    let ry = bounds.height() as f64 / 2.0;

    for y in bounds.min_y..bounds.max_y {
        let dy = (y as f64 + 0.5 - cy) / ry;
        for x in bounds.min_x..bounds.max_x {
            let dx = (x as f64 + 0.5 - cx) / rx;
            if dx * dx + dy * dy <= 1.0 {
                pixels.put_pixel(x, y, Luma([dosemux_core::mask::LIT]));
            }
        }
    }
    Mask::new(pixels)
}
