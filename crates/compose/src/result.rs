//! Result types for exposure optimization and partitioning.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use dosemux_core::{Mask, MaskEntry, MaskId, MaskTable, PrintJob};

use crate::conflict::ConflictGraph;

/// Counters describing what happened to one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSummary {
    /// Entries before optimization.
    pub entries_before: usize,
    /// Entries after optimization.
    pub entries_after: usize,
    /// Number of settings groups found.
    pub groups: usize,
    /// Groups rewritten into telescoping passes.
    pub groups_composed: usize,
    /// Groups left unmodified because two of their masks overlap.
    pub groups_overlapping: usize,
    /// Composite masks created.
    pub composites_created: usize,
}

impl LayerSummary {
    /// Number of passes saved.
    pub fn passes_saved(&self) -> isize {
        self.entries_before as isize - self.entries_after as isize
    }
}

/// Result of optimizing one layer.
#[derive(Debug, Clone, Default)]
pub struct LayerOptimization {
    /// Rewritten entry list.
    pub entries: Vec<MaskEntry>,
    /// Composite masks referenced by `entries`, in creation order.
    pub composites: Vec<(MaskId, Mask)>,
    /// What happened to the layer.
    pub summary: LayerSummary,
}

impl LayerOptimization {
    /// Wraps a layer that was left as-is.
    pub fn unchanged(entries: Vec<MaskEntry>) -> Self {
        let n = entries.len();
        Self {
            entries,
            composites: Vec::new(),
            summary: LayerSummary {
                entries_before: n,
                entries_after: n,
                ..Default::default()
            },
        }
    }
}

/// Job-wide optimization counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationSummary {
    /// Layers in the job.
    pub layers_total: usize,
    /// Layers passed through the layer optimizer.
    pub layers_optimized: usize,
    /// Layers left untouched (no entries or no resolvable masks).
    pub layers_skipped: usize,
    /// Entries across all layers before optimization.
    pub entries_before: usize,
    /// Entries across all layers after optimization.
    pub entries_after: usize,
    /// Groups rewritten into telescoping passes.
    pub groups_composed: usize,
    /// Groups left unmodified because of overlapping masks.
    pub groups_overlapping: usize,
    /// Composite masks added to the mask table.
    pub composites_created: usize,
    /// Computation time in milliseconds.
    pub computation_time_ms: u64,
}

impl OptimizationSummary {
    /// Folds one layer's counters into the job summary.
    pub fn add_layer(&mut self, layer: &LayerSummary) {
        self.layers_optimized += 1;
        self.entries_before += layer.entries_before;
        self.entries_after += layer.entries_after;
        self.groups_composed += layer.groups_composed;
        self.groups_overlapping += layer.groups_overlapping;
        self.composites_created += layer.composites_created;
    }

    /// Fraction of passes removed (0.0 - 1.0).
    pub fn reduction(&self) -> f64 {
        if self.entries_before == 0 {
            return 0.0;
        }
        1.0 - self.entries_after as f64 / self.entries_before as f64
    }
}

/// Result of optimizing a whole print job.
#[derive(Debug, Clone)]
pub struct PrintOptimization {
    /// Rewritten job.
    pub job: PrintJob,
    /// Original masks plus every composite created.
    pub masks: MaskTable,
    /// Job-wide counters.
    pub summary: OptimizationSummary,
}

/// Result of partitioning masks into non-overlapping groups.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Mask ids per group, keyed by color. Ids are sorted within a group.
    pub groups: BTreeMap<usize, Vec<MaskId>>,
    /// The conflict graph the coloring was computed on.
    pub graph: ConflictGraph,
    /// Number of distinct candidate pairs checked at pixel level.
    pub pairs_checked: usize,
}

impl Partition {
    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group (color) assigned to a mask.
    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.groups
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == id))
            .map(|(&color, _)| color)
    }

    /// Total number of masks across all groups.
    pub fn mask_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
