//! Pixel-level overlap detection between masks.
//!
//! Every check runs a bounding-box prefilter first: masks whose lit bounding
//! boxes are disjoint (including boxes that only touch along an edge or at a
//! corner) are rejected without reading pixel data. Only the shared rectangle
//! of the two boxes is scanned otherwise.

use dosemux_core::{Mask, PixelBox};

/// Returns the rectangle where the lit bounding boxes of both masks intersect.
///
/// `None` means the masks cannot overlap, including when either is empty.
pub fn candidate_region(a: &Mask, b: &Mask) -> Option<PixelBox> {
    let box_a = a.bounding_box()?;
    let box_b = b.bounding_box()?;
    box_a.intersection(&box_b)
}

/// Returns true if the two masks have at least one lit pixel in common.
pub fn overlaps(a: &Mask, b: &Mask) -> bool {
    match candidate_region(a, b) {
        Some(region) => a.shares_lit_pixel_in(b, &region),
        None => false,
    }
}

/// Returns true if any unordered pair of masks overlaps.
///
/// Stops at the first overlapping pair.
pub fn any_overlap(masks: &[&Mask]) -> bool {
    first_overlap(masks).is_some()
}

/// Returns the indices `(i, j)`, `j < i`, of the first overlapping pair found.
pub fn first_overlap(masks: &[&Mask]) -> Option<(usize, usize)> {
    let boxed: Vec<(usize, PixelBox)> = masks
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.bounding_box().map(|b| (i, b)))
        .collect();

    for (pos, &(i, box_i)) in boxed.iter().enumerate() {
        for &(j, box_j) in &boxed[..pos] {
            let Some(region) = box_i.intersection(&box_j) else {
                continue;
            };
            if masks[i].shares_lit_pixel_in(masks[j], &region) {
                return Some((i, j));
            }
        }
    }
    None
}
