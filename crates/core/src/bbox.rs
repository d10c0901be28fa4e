//! Integer pixel bounding boxes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle with inclusive minimum and exclusive maximum.
///
/// A box covering the single pixel `(3, 4)` is `PixelBox::new(3, 4, 4, 5)`.
/// Because the maximum is exclusive, two boxes that merely share an edge or a
/// corner do not intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelBox {
    /// Left edge (inclusive).
    pub min_x: u32,
    /// Top edge (inclusive).
    pub min_y: u32,
    /// Right edge (exclusive).
    pub max_x: u32,
    /// Bottom edge (exclusive).
    pub max_y: u32,
}

impl PixelBox {
    /// Creates a new box from its corners.
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a box from an origin and a size.
    pub fn from_origin_size(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Returns true if the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Returns true if the pixel `(x, y)` lies inside the box.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Returns true if the two boxes share at least one pixel.
    ///
    /// Uses strict inequalities on the exclusive edges, so boxes that only
    /// touch along an edge or at a corner are disjoint.
    pub fn intersects(&self, other: &PixelBox) -> bool {
        !(self.max_x <= other.min_x
            || other.max_x <= self.min_x
            || self.max_y <= other.min_y
            || other.max_y <= self.min_y)
    }

    /// Returns the shared rectangle, or `None` if the boxes are disjoint.
    pub fn intersection(&self, other: &PixelBox) -> Option<PixelBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(PixelBox::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        ))
    }

    /// Returns the smallest box containing both boxes.
    pub fn union(&self, other: &PixelBox) -> PixelBox {
        PixelBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Clips the box to a `width` x `height` canvas anchored at the origin.
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelBox> {
        let clipped = PixelBox::new(
            self.min_x.min(width),
            self.min_y.min(height),
            self.max_x.min(width),
            self.max_y.min(height),
        );
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }
}
