//! Greedy graph coloring.
//!
//! Largest-degree-first greedy heuristic: nodes are visited in descending
//! degree order and each takes the smallest color not used by an already
//! colored neighbor. Ties are broken by ascending node index, which for
//! graphs built from a mask table is ascending mask id, so colorings are
//! reproducible. Not guaranteed minimal.

use crate::conflict::ConflictGraph;

/// Visiting order used by [`greedy_color`].
pub fn largest_first_order(graph: &ConflictGraph) -> Vec<usize> {
    let mut order: Vec<usize> = (0..graph.node_count()).collect();
    order.sort_by(|&a, &b| graph.degree(b).cmp(&graph.degree(a)).then(a.cmp(&b)));
    order
}

/// Colors every node; adjacent nodes never share a color.
///
/// Returns one color per node index.
pub fn greedy_color(graph: &ConflictGraph) -> Vec<usize> {
    let n = graph.node_count();
    let mut colors: Vec<Option<usize>> = vec![None; n];
    let mut used: Vec<bool> = Vec::new();

    for node in largest_first_order(graph) {
        used.clear();
        used.resize(graph.degree(node) + 1, false);
        for neighbor in graph.neighbors(node) {
            if let Some(c) = colors[neighbor] {
                if c < used.len() {
                    used[c] = true;
                }
            }
        }
        let color = used.iter().position(|&u| !u).unwrap_or(used.len());
        colors[node] = Some(color);
    }

    colors.into_iter().map(|c| c.unwrap_or(0)).collect()
}

/// Number of distinct colors in a coloring.
pub fn color_count(colors: &[usize]) -> usize {
    colors.iter().max().map_or(0, |&m| m + 1)
}
