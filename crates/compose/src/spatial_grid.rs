//! Uniform spatial grid for broad-phase mask overlap detection.
//!
//! The canvas is divided into `grid_size` x `grid_size` cells. Each mask is
//! registered in every cell its lit bounding box touches, so only masks that
//! share a cell need a pixel-level comparison.

use std::collections::{BTreeMap, BTreeSet};

use dosemux_core::PixelBox;

/// An entry in the grid: a mask index and its lit bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEntry {
    /// Index of the mask in the caller's list.
    pub index: usize,
    /// Lit bounding box of the mask.
    pub bbox: PixelBox,
    /// Dimensions of the mask the box belongs to.
    pub canvas: (u32, u32),
}

impl GridEntry {
    /// Creates a new grid entry.
    pub fn new(index: usize, bbox: PixelBox, canvas: (u32, u32)) -> Self {
        Self {
            index,
            bbox,
            canvas,
        }
    }
}

/// Fixed-resolution grid mapping cells to the masks that touch them.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    grid_size: u32,
    cells: BTreeMap<(u32, u32), Vec<usize>>,
    len: usize,
}

impl SpatialGrid {
    /// Creates an empty grid with `grid_size` cells per axis (at least 1).
    pub fn new(grid_size: u32) -> Self {
        Self {
            grid_size: grid_size.max(1),
            cells: BTreeMap::new(),
            len: 0,
        }
    }

    /// Creates a grid holding the given entries.
    pub fn with_entries(grid_size: u32, entries: impl IntoIterator<Item = GridEntry>) -> Self {
        let mut grid = Self::new(grid_size);
        for entry in entries {
            grid.insert(&entry);
        }
        grid
    }

    /// Registers an entry in every cell its box touches.
    pub fn insert(&mut self, entry: &GridEntry) {
        let (x0, y0, x1, y1) = self.cell_range(&entry.bbox, entry.canvas);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(entry.index);
            }
        }
        self.len += 1;
    }

    /// Number of cells per axis.
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Number of entries inserted.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of cells holding at least one entry.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Entries registered in cell `(cx, cy)`.
    pub fn cell(&self, cx: u32, cy: u32) -> &[usize] {
        self.cells.get(&(cx, cy)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every unordered pair `(low, high)` of entries sharing at least one cell.
    ///
    /// Each pair is reported once however many cells it shares.
    pub fn candidate_pairs(&self) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for members in self.cells.values() {
            for (pos, &a) in members.iter().enumerate() {
                for &b in &members[pos + 1..] {
                    if a != b {
                        pairs.insert((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs
    }

    /// Inclusive cell range `(x0, y0, x1, y1)` covered by a box.
    fn cell_range(&self, bbox: &PixelBox, canvas: (u32, u32)) -> (u32, u32, u32, u32) {
        let g = self.grid_size as u64;
        let last = self.grid_size - 1;
        let to_cell = |coord: u32, extent: u32| -> u32 {
            let extent = extent.max(1) as u64;
            ((coord as u64 * g / extent) as u32).min(last)
        };
        let (width, height) = canvas;
        (
            to_cell(bbox.min_x, width),
            to_cell(bbox.min_y, height),
            to_cell(bbox.max_x.saturating_sub(1), width),
            to_cell(bbox.max_y.saturating_sub(1), height),
        )
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GRID_SIZE)
    }
}
