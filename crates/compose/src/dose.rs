//! Per-pixel cumulative dose maps.
//!
//! Dose is modeled as the total exposure time a pixel receives across all
//! passes of a layer. Comparing the dose map of a layer before and after
//! optimization checks that the rewrite preserved every specimen's dose.

use dosemux_core::{resolve_mask, CanvasConfig, Error, Mask, MaskEntry, MaskTable, Result};

/// Cumulative exposure in milliseconds for every pixel of the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseMap {
    width: u32,
    height: u32,
    values: Vec<u64>,
}

impl DoseMap {
    /// Creates an all-zero dose map.
    pub fn new(canvas: &CanvasConfig) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            values: vec![0; canvas.width as usize * canvas.height as usize],
        }
    }

    /// Replays entries in order and accumulates their durations.
    pub fn from_entries(
        entries: &[MaskEntry],
        masks: &MaskTable,
        canvas: &CanvasConfig,
    ) -> Result<Self> {
        let mut map = Self::new(canvas);
        for entry in entries {
            map.expose(resolve_mask(masks, &entry.mask)?, entry.exposure_ms)?;
        }
        Ok(map)
    }

    /// Adds `duration_ms` to every lit pixel of `mask`.
    pub fn expose(&mut self, mask: &Mask, duration_ms: u64) -> Result<()> {
        if mask.dimensions() != (self.width, self.height) {
            return Err(Error::DimensionMismatch {
                expected: (self.width, self.height),
                found: mask.dimensions(),
            });
        }
        let Some(bbox) = mask.bounding_box() else {
            return Ok(());
        };
        for y in bbox.min_y..bbox.max_y {
            for x in bbox.min_x..bbox.max_x {
                if mask.is_lit(x, y) {
                    self.values[y as usize * self.width as usize + x as usize] += duration_ms;
                }
            }
        }
        Ok(())
    }

    /// Dose at `(x, y)`, zero outside the canvas.
    pub fn get(&self, x: u32, y: u32) -> u64 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Largest dose on the canvas.
    pub fn max(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    /// Number of pixels whose dose differs between the two maps.
    pub fn mismatches(&self, other: &DoseMap) -> usize {
        if self.width != other.width || self.height != other.height {
            return self.values.len().max(other.values.len());
        }
        self.values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a != b)
            .count()
    }
}
