//! Progressive exposure composition.
//!
//! Collapses a group of same-settings, pairwise non-overlapping entries into
//! telescoping passes. With durations sorted as `e_0 <= e_1 <= ... <= e_{n-1}`,
//! pass `i` exposes the union of masks `i..n` for `e_i - e_{i-1}` ms. Every
//! original mask `m_j` is contained in passes `0..=j`, whose durations sum to
//! `e_j`, so replaying the passes reproduces each mask's requested dose.
//!
//! # Algorithm
//!
//! 1. Stable-sort the group by duration
//! 2. Build suffix unions from the longest exposure backwards
//! 3. Emit one pass per positive duration step whose union has lit pixels

use std::path::Path;

use dosemux_core::{resolve_mask, Mask, MaskEntry, MaskId, MaskTable, Result};

use crate::config::OptimizerConfig;

/// Extension used when a source mask name has none.
const DEFAULT_EXTENSION: &str = "png";

/// Output of composing one settings group.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    /// Replacement entries in exposure order.
    pub entries: Vec<MaskEntry>,
    /// Newly created composite masks, keyed by the names used in `entries`.
    pub composites: Vec<(MaskId, Mask)>,
}

impl Composition {
    /// Wraps entries that were left unchanged.
    pub fn passthrough(entries: Vec<MaskEntry>) -> Self {
        Self {
            entries,
            composites: Vec::new(),
        }
    }

    /// Number of passes emitted.
    pub fn pass_count(&self) -> usize {
        self.entries.len()
    }
}

/// Builds the name of the composite emitted for sorted index `index`.
///
/// `layer_12.png` with tag `opt` and index 3 becomes `layer_12_opt_3.png`.
/// Directory components of the source name are dropped.
pub fn composite_name(source: &str, tag: &str, index: usize) -> String {
    let path = Path::new(source);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source);
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_EXTENSION);
    format!("{stem}_{tag}_{index}.{ext}")
}

/// Returns `name`, or the first `<stem>_<n>.<ext>` (n >= 1) for which `taken` is false.
pub fn disambiguate<F>(name: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !taken(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1usize..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Composes a settings group into the minimal set of telescoping passes.
///
/// The caller guarantees that all entries share settings and that their masks
/// are pairwise non-overlapping (see [`crate::overlap::any_overlap`]).
/// A group of zero or one entries is returned unchanged without touching the
/// mask table.
///
/// # Errors
///
/// - [`dosemux_core::Error::MissingMask`] if an entry's mask is not in `masks`
/// - [`dosemux_core::Error::DimensionMismatch`] if a mask does not match the canvas
pub fn compose_group(
    group: &[MaskEntry],
    masks: &MaskTable,
    config: &OptimizerConfig,
) -> Result<Composition> {
    if group.len() <= 1 {
        return Ok(Composition::passthrough(group.to_vec()));
    }

    let mut sorted: Vec<&MaskEntry> = group.iter().collect();
    sorted.sort_by_key(|e| e.exposure_ms);

    let sources = sorted
        .iter()
        .map(|e| resolve_mask(masks, &e.mask))
        .collect::<Result<Vec<&Mask>>>()?;

    // Positive duration steps, indexed by sorted position.
    let mut deltas = vec![0u64; sorted.len()];
    let mut previous = 0u64;
    for (i, entry) in sorted.iter().enumerate() {
        deltas[i] = entry.exposure_ms - previous;
        previous = entry.exposure_ms;
    }

    // Suffix unions, built from the back so each mask is merged once.
    let mut suffixes: Vec<Option<Mask>> = vec![None; sorted.len()];
    let mut acc = Mask::blank(config.canvas.width, config.canvas.height);
    for i in (0..sorted.len()).rev() {
        acc = Mask::union([&acc, sources[i]], &config.canvas)?;
        if deltas[i] > 0 && !acc.is_empty() {
            suffixes[i] = Some(acc.clone());
        }
    }

    let mut composition = Composition::default();
    for (i, suffix) in suffixes.into_iter().enumerate() {
        let Some(mask) = suffix else {
            continue;
        };
        let source = sorted[i];
        let name = composite_name(&source.mask, &config.composite_tag, i);
        composition.entries.push(MaskEntry {
            mask: name.clone(),
            exposure_ms: deltas[i],
            settings: source.settings.clone(),
        });
        composition.composites.push((name, mask));
    }

    log::trace!(
        "Composed {} entries into {} passes",
        group.len(),
        composition.pass_count()
    );
    Ok(composition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dosemux_core::{CanvasConfig, Error, PixelBox};

    fn config() -> OptimizerConfig {
        OptimizerConfig::new().with_canvas(CanvasConfig::new(100, 100))
    }

    fn table(rects: &[(&str, PixelBox)]) -> MaskTable {
        rects
            .iter()
            .map(|(name, r)| (name.to_string(), Mask::from_rects(100, 100, &[*r])))
            .collect()
    }

    #[test]
    fn test_composite_name() {
        assert_eq!(composite_name("layer_12.png", "opt", 3), "layer_12_opt_3.png");
        assert_eq!(composite_name("slices/a.bmp", "opt", 0), "a_opt_0.bmp");
        assert_eq!(composite_name("noext", "m", 1), "noext_m_1.png");
    }

    #[test]
    fn test_disambiguate() {
        let taken = ["a_opt_0.png", "a_opt_0_1.png", "plain"];
        let is_taken = |n: &str| taken.contains(&n);

        assert_eq!(disambiguate("b_opt_0.png", is_taken), "b_opt_0.png");
        assert_eq!(disambiguate("a_opt_0.png", is_taken), "a_opt_0_2.png");
        assert_eq!(disambiguate("plain", is_taken), "plain_1");
    }

    #[test]
    fn test_two_durations_make_two_passes() {
        let masks = table(&[
            ("a.png", PixelBox::new(0, 0, 20, 20)),
            ("b.png", PixelBox::new(50, 50, 70, 70)),
        ]);
        let group = vec![MaskEntry::new("a.png", 1000), MaskEntry::new("b.png", 2000)];

        let out = compose_group(&group, &masks, &config()).unwrap();
        assert_eq!(out.pass_count(), 2);
        assert_eq!(out.entries[0].mask, "a_opt_0.png");
        assert_eq!(out.entries[0].exposure_ms, 1000);
        assert_eq!(out.entries[1].mask, "b_opt_1.png");
        assert_eq!(out.entries[1].exposure_ms, 1000);

        let (_, first) = &out.composites[0];
        let (_, second) = &out.composites[1];
        assert_eq!(first.lit_count(), 800);
        assert!(first.is_lit(5, 5) && first.is_lit(60, 60));
        assert_eq!(second.lit_count(), 400);
        assert!(!second.is_lit(5, 5) && second.is_lit(60, 60));
    }

    #[test]
    fn test_equal_durations_collapse_to_one_pass() {
        let masks = table(&[
            ("a.png", PixelBox::new(0, 0, 20, 20)),
            ("b.png", PixelBox::new(50, 50, 70, 70)),
        ]);
        let group = vec![MaskEntry::new("a.png", 1000), MaskEntry::new("b.png", 1000)];

        let out = compose_group(&group, &masks, &config()).unwrap();
        assert_eq!(out.pass_count(), 1);
        assert_eq!(out.entries[0].exposure_ms, 1000);
        assert_eq!(out.composites[0].1.lit_count(), 800);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let masks = table(&[
            ("long.png", PixelBox::new(0, 0, 10, 10)),
            ("short.png", PixelBox::new(50, 50, 60, 60)),
        ]);
        let group = vec![
            MaskEntry::new("long.png", 3000),
            MaskEntry::new("short.png", 500),
        ];

        let out = compose_group(&group, &masks, &config()).unwrap();
        let durations: Vec<u64> = out.entries.iter().map(|e| e.exposure_ms).collect();
        assert_eq!(durations, vec![500, 2500]);
        assert_eq!(out.entries[0].mask, "short_opt_0.png");
        assert_eq!(out.entries[1].mask, "long_opt_1.png");
    }

    #[test]
    fn test_single_entry_is_unchanged() {
        let group = vec![MaskEntry::new("missing.png", 1234).with_setting("power", 10)];
        let out = compose_group(&group, &MaskTable::new(), &config()).unwrap();
        assert_eq!(out.entries, group);
        assert!(out.composites.is_empty());
    }

    #[test]
    fn test_settings_come_from_step_entry() {
        let masks = table(&[
            ("a.png", PixelBox::new(0, 0, 10, 10)),
            ("b.png", PixelBox::new(20, 20, 30, 30)),
        ]);
        let group = vec![
            MaskEntry::new("a.png", 100).with_setting("power", 50),
            MaskEntry::new("b.png", 300).with_setting("power", 50),
        ];
        let out = compose_group(&group, &masks, &config()).unwrap();
        assert!(out.entries.iter().all(|e| e.settings == group[0].settings));
    }

    #[test]
    fn test_empty_masks_are_skipped() {
        let mut masks = table(&[("a.png", PixelBox::new(0, 0, 10, 10))]);
        masks.insert("empty.png".to_string(), Mask::blank(100, 100));
        let group = vec![
            MaskEntry::new("a.png", 100),
            MaskEntry::new("empty.png", 400),
        ];

        let out = compose_group(&group, &masks, &config()).unwrap();
        assert_eq!(out.pass_count(), 1);
        assert_eq!(out.entries[0].exposure_ms, 100);
    }

    #[test]
    fn test_zero_duration_entries() {
        let masks = table(&[
            ("a.png", PixelBox::new(0, 0, 10, 10)),
            ("b.png", PixelBox::new(20, 20, 30, 30)),
        ]);
        let group = vec![MaskEntry::new("a.png", 0), MaskEntry::new("b.png", 0)];
        let out = compose_group(&group, &masks, &config()).unwrap();
        assert_eq!(out.pass_count(), 0);
    }

    #[test]
    fn test_missing_mask_is_an_error() {
        let masks = table(&[("a.png", PixelBox::new(0, 0, 10, 10))]);
        let group = vec![MaskEntry::new("a.png", 1), MaskEntry::new("b.png", 2)];
        assert_eq!(
            compose_group(&group, &masks, &config()).unwrap_err(),
            Error::missing_mask("b.png")
        );
    }

    #[test]
    fn test_wrong_canvas_is_an_error() {
        let masks = table(&[
            ("a.png", PixelBox::new(0, 0, 10, 10)),
            ("b.png", PixelBox::new(20, 20, 30, 30)),
        ]);
        let group = vec![MaskEntry::new("a.png", 1), MaskEntry::new("b.png", 2)];
        let config = OptimizerConfig::new().with_canvas(CanvasConfig::new(50, 50));
        assert!(matches!(
            compose_group(&group, &masks, &config),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
