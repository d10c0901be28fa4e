//! Dose composition and partitioning engine for multiplexed exposure masks.
//!
//! Given a print job whose layers list one mask entry per dose requirement,
//! this crate rewrites each layer into fewer exposure passes while keeping the
//! cumulative per-pixel dose of every specimen exactly as requested.
//!
//! # Algorithm
//!
//! 1. **Grouping**: bucket entries that share every setting except mask and duration
//! 2. **Overlap check**: bounding-box prefilter, then pixel test on the shared rectangle
//! 3. **Composition**: telescoping suffix unions over durations sorted ascending
//! 4. **Assembly**: merge new composites into the job-wide mask table with unique names
//!
//! Independently, [`partition`] splits any set of masks into non-overlapping
//! groups by greedy coloring of a spatial-grid-accelerated conflict graph.
//!
//! All operations are synchronous and never mutate their inputs.
//!
//! # Example
//!
//! ```rust
//! use dosemux_compose::{optimize_layer, OptimizerConfig};
//! use dosemux_core::{CanvasConfig, Mask, MaskEntry, MaskTable, PixelBox};
//!
//! let mut masks = MaskTable::new();
//! masks.insert("a.png".into(), Mask::from_rects(100, 100, &[PixelBox::new(0, 0, 20, 20)]));
//! masks.insert("b.png".into(), Mask::from_rects(100, 100, &[PixelBox::new(50, 50, 70, 70)]));
//!
//! let entries = vec![MaskEntry::new("a.png", 1000), MaskEntry::new("b.png", 2000)];
//! let config = OptimizerConfig::new().with_canvas(CanvasConfig::new(100, 100));
//! let layer = optimize_layer(&entries, &masks, &config).unwrap();
//!
//! let durations: Vec<u64> = layer.entries.iter().map(|e| e.exposure_ms).collect();
//! assert_eq!(durations, vec![1000, 1000]);
//! ```

pub mod coloring;
pub mod compose;
pub mod config;
pub mod conflict;
pub mod dose;
pub mod grouping;
pub mod optimizer;
pub mod overlap;
pub mod partition;
pub mod result;
pub mod spatial_grid;

pub use compose::{compose_group, composite_name, Composition};
pub use config::{OptimizerConfig, PartitionConfig};
pub use conflict::ConflictGraph;
pub use dose::DoseMap;
pub use grouping::{group_by_settings, SettingsGroup};
pub use optimizer::{optimize_layer, optimize_print, ExposureOptimizer};
pub use overlap::{any_overlap, overlaps};
pub use partition::partition;
pub use result::{LayerOptimization, LayerSummary, OptimizationSummary, Partition, PrintOptimization};
pub use spatial_grid::{GridEntry, SpatialGrid};
