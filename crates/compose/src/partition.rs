//! Settings-agnostic partitioning of masks into non-overlapping groups.
//!
//! # Algorithm
//!
//! 1. **Spatial bucketing**: register each mask's lit bounding box in a fixed grid
//! 2. **Conflict graph**: pixel-test every pair sharing a grid cell, once
//! 3. **Greedy coloring**: largest-degree-first, ties by ascending mask id
//! 4. **Grouping**: one group per color
//!
//! Masks in the same group never overlap, so each group can be exposed in a
//! single pass. Empty masks have no conflicts and land in group 0.

use std::collections::BTreeMap;

use dosemux_core::{MaskId, MaskTable, Result};

use crate::coloring::greedy_color;
use crate::config::PartitionConfig;
use crate::conflict::ConflictGraph;
use crate::result::Partition;

/// Partitions masks into the fewest groups the greedy heuristic finds.
///
/// # Errors
///
/// - [`dosemux_core::Error::InvalidConfig`] for a zero grid size
/// - [`dosemux_core::Error::DimensionMismatch`] if the masks differ in size
pub fn partition(masks: &MaskTable, config: &PartitionConfig) -> Result<Partition> {
    config.validate()?;
    log::debug!("Partitioning {} masks", masks.len());

    let (graph, pairs_checked) = ConflictGraph::build(masks, config.grid_size)?;
    let colors = greedy_color(&graph);

    let mut groups: BTreeMap<usize, Vec<MaskId>> = BTreeMap::new();
    for (index, &color) in colors.iter().enumerate() {
        groups
            .entry(color)
            .or_default()
            .push(graph.id(index).to_string());
    }

    log::debug!("Partitioned into {} groups", groups.len());
    for (color, members) in &groups {
        log::trace!("Group {}: {} masks", color, members.len());
    }

    Ok(Partition {
        groups,
        graph,
        pairs_checked,
    })
}
