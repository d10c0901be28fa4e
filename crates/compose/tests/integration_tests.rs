//! Integration tests for dosemux-compose.

use dosemux_compose::{
    any_overlap, compose_group, group_by_settings, optimize_layer, optimize_print, overlaps,
    partition, DoseMap, OptimizerConfig, PartitionConfig,
};
use dosemux_core::{CanvasConfig, Layer, Mask, MaskEntry, MaskTable, PixelBox, PrintJob};
use rand::prelude::*;

const SIZE: u32 = 100;

fn canvas() -> CanvasConfig {
    CanvasConfig::new(SIZE, SIZE)
}

fn config() -> OptimizerConfig {
    OptimizerConfig::new().with_canvas(canvas())
}

fn rect_mask(r: PixelBox) -> Mask {
    Mask::from_rects(SIZE, SIZE, &[r])
}

/// Table of the originals plus every composite produced.
fn merged(masks: &MaskTable, composites: &[(String, Mask)]) -> MaskTable {
    let mut all = masks.clone();
    all.extend(composites.iter().cloned());
    all
}

/// Random masks placed in distinct cells of a coarse lattice so that none overlap.
fn random_disjoint_masks(rng: &mut StdRng, count: usize) -> MaskTable {
    let slots_per_axis = 5u32;
    let slot = SIZE / slots_per_axis;
    let mut slots: Vec<u32> = (0..slots_per_axis * slots_per_axis).collect();
    slots.shuffle(rng);

    slots
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(i, s)| {
            let ox = (s % slots_per_axis) * slot;
            let oy = (s / slots_per_axis) * slot;
            let w = rng.gen_range(1..=slot);
            let h = rng.gen_range(1..=slot);
            let x = ox + rng.gen_range(0..=slot - w);
            let y = oy + rng.gen_range(0..=slot - h);
            (
                format!("part_{i:02}.png"),
                rect_mask(PixelBox::from_origin_size(x, y, w, h)),
            )
        })
        .collect()
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_two_durations_two_passes() {
        let mut masks = MaskTable::new();
        masks.insert("m1.png".into(), rect_mask(PixelBox::new(10, 10, 30, 30)));
        masks.insert("m2.png".into(), rect_mask(PixelBox::new(60, 60, 90, 90)));
        let entries = vec![
            MaskEntry::new("m1.png", 1000),
            MaskEntry::new("m2.png", 2000),
        ];

        let out = optimize_layer(&entries, &masks, &config()).unwrap();
        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.entries[0].exposure_ms, 1000);
        assert_eq!(out.entries[1].exposure_ms, 1000);

        let all = merged(&masks, &out.composites);
        let first = &all[&out.entries[0].mask];
        let second = &all[&out.entries[1].mask];
        assert!(first.is_lit(20, 20) && first.is_lit(70, 70));
        assert!(!second.is_lit(20, 20) && second.is_lit(70, 70));

        let dose = DoseMap::from_entries(&out.entries, &all, &canvas()).unwrap();
        assert_eq!(dose.get(20, 20), 1000);
        assert_eq!(dose.get(70, 70), 2000);
    }

    #[test]
    fn test_equal_durations_one_pass() {
        let mut masks = MaskTable::new();
        masks.insert("m1.png".into(), rect_mask(PixelBox::new(10, 10, 30, 30)));
        masks.insert("m2.png".into(), rect_mask(PixelBox::new(60, 60, 90, 90)));
        let entries = vec![
            MaskEntry::new("m1.png", 1000),
            MaskEntry::new("m2.png", 1000),
        ];

        let out = optimize_layer(&entries, &masks, &config()).unwrap();
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].exposure_ms, 1000);
        let union = &out.composites[0].1;
        assert_eq!(union.lit_count(), 20 * 20 + 30 * 30);
    }

    #[test]
    fn test_overlapping_masks_left_alone() {
        let mut masks = MaskTable::new();
        masks.insert("m1.png".into(), rect_mask(PixelBox::new(50, 50, 76, 76)));
        masks.insert("m2.png".into(), rect_mask(PixelBox::new(75, 75, 100, 100)));
        let entries = vec![
            MaskEntry::new("m1.png", 1000),
            MaskEntry::new("m2.png", 2000),
        ];

        let out = optimize_layer(&entries, &masks, &config()).unwrap();
        assert_eq!(out.entries, entries);
        assert!(out.composites.is_empty());
    }

    #[test]
    fn test_three_conflicting_two_free() {
        let masks: MaskTable = [
            ("a", PixelBox::new(10, 10, 30, 30)),
            ("b", PixelBox::new(20, 20, 40, 40)),
            ("c", PixelBox::new(25, 15, 45, 35)),
            ("d", PixelBox::new(70, 5, 80, 15)),
            ("e", PixelBox::new(5, 80, 15, 95)),
        ]
        .into_iter()
        .map(|(n, r)| (n.to_string(), rect_mask(r)))
        .collect();

        let result = partition(&masks, &PartitionConfig::default()).unwrap();
        assert!(result.group_count() >= 2);
        assert_eq!(result.mask_count(), 5);
        for members in result.groups.values() {
            let group: Vec<&Mask> = members.iter().map(|m| &masks[m]).collect();
            assert!(!any_overlap(&group));
        }
    }

    #[test]
    fn test_settings_split_into_two_buckets() {
        let entries = vec![
            MaskEntry::new("A.png", 100).with_setting("Light intensity", 100),
            MaskEntry::new("B.png", 100).with_setting("Light intensity", 50),
            MaskEntry::new("C.png", 100).with_setting("Light intensity", 100),
        ];
        let groups = group_by_settings(&entries).unwrap();
        assert_eq!(groups.len(), 2);
        let first: Vec<&str> = groups[0].entries.iter().map(|e| e.mask.as_str()).collect();
        let second: Vec<&str> = groups[1].entries.iter().map(|e| e.mask.as_str()).collect();
        assert_eq!(first, vec!["A.png", "C.png"]);
        assert_eq!(second, vec!["B.png"]);
    }
}

mod property_tests {
    use super::*;

    #[test]
    fn test_dose_preserved_for_random_groups() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..40 {
            let count = rng.gen_range(2..=10);
            let masks = random_disjoint_masks(&mut rng, count);
            let entries: Vec<MaskEntry> = masks
                .keys()
                .map(|name| {
                    // Coarse durations so ties occur regularly.
                    MaskEntry::new(name.clone(), 250 * rng.gen_range(0..=8))
                        .with_setting("Light intensity", 100)
                })
                .collect();

            let expected = DoseMap::from_entries(&entries, &masks, &canvas()).unwrap();
            let out = compose_group(&entries, &masks, &config()).unwrap();
            let all = merged(&masks, &out.composites);
            let actual = DoseMap::from_entries(&out.entries, &all, &canvas()).unwrap();

            assert_eq!(expected.mismatches(&actual), 0);
            assert!(out.entries.len() <= entries.len());

            let mut distinct: Vec<u64> = entries
                .iter()
                .map(|e| e.exposure_ms)
                .filter(|&d| d > 0)
                .collect();
            distinct.sort_unstable();
            distinct.dedup();
            assert_eq!(out.entries.len(), distinct.len());
        }
    }

    #[test]
    fn test_print_optimization_preserves_layer_doses() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut masks = MaskTable::new();
        let mut layers = Vec::new();

        for layer_index in 0..5 {
            let layer_masks = random_disjoint_masks(&mut rng, 6);
            let mut entries = Vec::new();
            for (name, mask) in layer_masks {
                let name = format!("l{layer_index}_{name}");
                let intensity = if rng.gen_bool(0.3) { 80 } else { 100 };
                entries.push(
                    MaskEntry::new(name.clone(), 100 * rng.gen_range(1..=5))
                        .with_setting("Light intensity", intensity),
                );
                masks.insert(name, mask);
            }
            layers.push(Layer::new(entries));
        }
        let job = PrintJob::new(layers);

        let out = optimize_print(&job, &masks, &config()).unwrap();
        assert_eq!(out.job.layer_count(), job.layer_count());
        assert!(out.summary.entries_after <= out.summary.entries_before);

        for (before, after) in job.layers.iter().zip(&out.job.layers) {
            let expected = DoseMap::from_entries(&before.entries, &masks, &canvas()).unwrap();
            let actual = DoseMap::from_entries(&after.entries, &out.masks, &canvas()).unwrap();
            assert_eq!(expected.mismatches(&actual), 0);
        }
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let mut random_rect = || {
                let x = rng.gen_range(0..SIZE - 1);
                let y = rng.gen_range(0..SIZE - 1);
                let w = rng.gen_range(1..=SIZE - x);
                let h = rng.gen_range(1..=SIZE - y);
                rect_mask(PixelBox::from_origin_size(x, y, w, h))
            };
            let a = random_rect();
            let b = random_rect();
            assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
            assert!(overlaps(&a, &a));

            let boxes_intersect = a
                .bounding_box()
                .zip(b.bounding_box())
                .map_or(false, |(ba, bb)| ba.intersects(&bb));
            // Solid rectangles overlap exactly when their boxes do.
            assert_eq!(overlaps(&a, &b), boxes_intersect);
        }
    }

    #[test]
    fn test_partition_groups_are_conflict_free() {
        let mut rng = StdRng::seed_from_u64(42);
        let masks: MaskTable = (0..30)
            .map(|i| {
                let x = rng.gen_range(0..90);
                let y = rng.gen_range(0..90);
                let w = rng.gen_range(3..=SIZE - x);
                let h = rng.gen_range(3..=SIZE - y);
                (
                    format!("m{i:02}"),
                    rect_mask(PixelBox::from_origin_size(x, y, w.min(40), h.min(40))),
                )
            })
            .collect();

        let result = partition(&masks, &PartitionConfig::default()).unwrap();
        assert_eq!(result.mask_count(), masks.len());

        let mut seen: Vec<&String> = result.groups.values().flatten().collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), masks.len());

        for members in result.groups.values() {
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    assert!(!overlaps(&masks[a], &masks[b]));
                }
            }
        }
    }
}
