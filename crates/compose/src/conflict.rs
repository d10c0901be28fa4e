//! Conflict graph over masks.
//!
//! Nodes are mask ids; an undirected edge joins two masks whose lit pixels
//! intersect. No self-loops, no weights.

use std::collections::BTreeSet;

use dosemux_core::{Error, Mask, MaskId, MaskTable, Result};

use crate::overlap::overlaps;
use crate::spatial_grid::{GridEntry, SpatialGrid};

/// Undirected graph whose edges connect overlapping masks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictGraph {
    ids: Vec<MaskId>,
    adjacency: Vec<BTreeSet<usize>>,
    edge_count: usize,
}

impl ConflictGraph {
    /// Creates a graph with the given nodes and no edges.
    pub fn new(ids: Vec<MaskId>) -> Self {
        let adjacency = vec![BTreeSet::new(); ids.len()];
        Self {
            ids,
            adjacency,
            edge_count: 0,
        }
    }

    /// Builds the conflict graph of a mask table.
    ///
    /// Candidate pairs come from a `grid_size` spatial grid; each distinct pair
    /// is checked once at pixel level. Empty masks are nodes without edges.
    /// Returns the graph and the number of pairs checked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] unless every mask has the
    /// dimensions of the first one in id order.
    pub fn build(masks: &MaskTable, grid_size: u32) -> Result<(Self, usize)> {
        let ids: Vec<MaskId> = masks.keys().cloned().collect();
        let refs: Vec<&Mask> = masks.values().collect();
        if let Some(first) = refs.first() {
            let expected = first.dimensions();
            if let Some(other) = refs.iter().find(|m| m.dimensions() != expected) {
                return Err(Error::DimensionMismatch {
                    expected,
                    found: other.dimensions(),
                });
            }
        }
        let mut graph = Self::new(ids);

        let grid = SpatialGrid::with_entries(
            grid_size,
            refs.iter().enumerate().filter_map(|(i, m)| {
                m.bounding_box()
                    .map(|bbox| GridEntry::new(i, bbox, m.dimensions()))
            }),
        );

        let pairs = grid.candidate_pairs();
        for &(a, b) in &pairs {
            if overlaps(refs[a], refs[b]) {
                graph.add_edge(a, b);
            }
        }

        log::debug!(
            "Conflict graph: {} nodes, {} edges ({} pairs checked, {} grid cells occupied)",
            graph.node_count(),
            graph.edge_count(),
            pairs.len(),
            grid.occupied_cells()
        );
        Ok((graph, pairs.len()))
    }

    /// Adds an edge between node indices. Self-loops are ignored.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        if self.adjacency[a].insert(b) {
            self.adjacency[b].insert(a);
            self.edge_count += 1;
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Mask id of node `index`.
    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// All node ids, in node order.
    pub fn ids(&self) -> &[MaskId] {
        &self.ids
    }

    /// Node index of a mask id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|n| n == id)
    }

    /// Degree of node `index`.
    pub fn degree(&self, index: usize) -> usize {
        self.adjacency[index].len()
    }

    /// Neighbors of node `index` in ascending order.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[index].iter().copied()
    }

    /// Returns true if the two masks conflict.
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.adjacency[a].contains(&b),
            _ => false,
        }
    }

    /// Every edge once, as `(low, high)` node indices.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, ns)| ns.iter().filter(move |&&b| b > a).map(move |&b| (a, b)))
    }
}
