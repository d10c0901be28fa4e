//! Layout-to-dose translation.
//!
//! A layout places copies of one component on the plate, each copy tagged with
//! a dose-group label. Translating a component print job through a layout
//! produces, for every layer, one stamped mask per dose group and original
//! entry, with the exposure derived from the group label.
//!
//! # Algorithm
//!
//! 1. **Grouping**: collect placement offsets per label, first-seen order
//! 2. **Stamping**: paste each original mask at every offset of a group and
//!    combine the copies with a lighter (max) blend
//! 3. **Dose translation**: absolute labels are durations, percentage labels
//!    scale the original duration
//! 4. **Optimization** (optional): run the exposure optimizer on the result

use std::path::Path;

use dosemux_compose::{optimize_print, OptimizationSummary, OptimizerConfig};
use dosemux_core::{
    resolve_mask, CanvasConfig, Layer, Mask, MaskEntry, MaskTable, PixelBox, PrintJob,
};
use image::GrayImage;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PrintFileError, Result};

/// One component copy placed on the plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPlacement {
    /// Left offset in pixels.
    pub x: u32,
    /// Top offset in pixels.
    pub y: u32,
    /// Footprint width, used only for the placement overlap check.
    #[serde(default)]
    pub width: u32,
    /// Footprint height, used only for the placement overlap check.
    #[serde(default)]
    pub height: u32,
    /// Dose-group label. Numbers in layout files are read as their text.
    #[serde(deserialize_with = "group_label")]
    pub group: String,
}

impl ComponentPlacement {
    /// Creates a placement.
    pub fn new(x: u32, y: u32, width: u32, height: u32, group: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            group: group.into(),
        }
    }

    /// Footprint on the plate.
    pub fn rect(&self) -> PixelBox {
        PixelBox::from_origin_size(self.x, self.y, self.width, self.height)
    }
}

fn group_label<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Text(text) => text,
        Label::Number(number) => number.to_string(),
    })
}

/// Parses a JSON layout: a list of placements.
pub fn parse_layout(json: &str) -> Result<Vec<ComponentPlacement>> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a JSON layout file.
pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<Vec<ComponentPlacement>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let placements = parse_layout(&text)?;
    log::info!(
        "Loaded layout with {} components from {}",
        placements.len(),
        path.as_ref().display()
    );
    Ok(placements)
}

/// How a dose-group label turns into an exposure duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseMode {
    /// The label is the duration in milliseconds.
    Absolute,
    /// The label is a percentage of the layer's original duration.
    #[default]
    Percentage,
}

impl DoseMode {
    /// Duration for an entry of `original_ms` in group `label`.
    ///
    /// Fractional results are truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`PrintFileError::InvalidLayout`] if the label is not a
    /// finite, non-negative number.
    pub fn exposure_ms(self, label: &str, original_ms: u64) -> Result<u64> {
        let value: f64 = label.trim().parse().map_err(|_| {
            PrintFileError::invalid_layout(format!("dose group '{label}' is not a number"))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(PrintFileError::invalid_layout(format!(
                "dose group '{label}' must be a non-negative number"
            )));
        }
        Ok(match self {
            Self::Absolute => value as u64,
            Self::Percentage => (original_ms as f64 * (value / 100.0)) as u64,
        })
    }
}

/// Offsets sharing one dose-group label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseGroup {
    /// Group label as written in the layout.
    pub label: String,
    /// `(x, y)` offsets of every placement in the group.
    pub offsets: Vec<(u32, u32)>,
}

/// Groups placement offsets by label, keeping first-seen label order.
pub fn group_placements(placements: &[ComponentPlacement]) -> Vec<DoseGroup> {
    let mut groups: Vec<DoseGroup> = Vec::new();
    for placement in placements {
        let offset = (placement.x, placement.y);
        match groups.iter_mut().find(|g| g.label == placement.group) {
            Some(group) => group.offsets.push(offset),
            None => groups.push(DoseGroup {
                label: placement.group.clone(),
                offsets: vec![offset],
            }),
        }
    }

    log::debug!("Grouped {} placements into {} dose groups", placements.len(), groups.len());
    for group in &groups {
        log::trace!("Dose group {}: {} components", group.label, group.offsets.len());
    }
    groups
}

/// Stamps `template` at every offset on a blank canvas.
///
/// Copies are clipped to the canvas and combined with a pixelwise maximum.
pub fn stamp_composite(
    template: &Mask,
    offsets: &[(u32, u32)],
    canvas: &CanvasConfig,
) -> Result<Mask> {
    canvas.validate()?;
    let Some(src) = template.bounding_box() else {
        return Ok(Mask::blank(canvas.width, canvas.height));
    };

    let pixels = template.as_image();
    let mut out = GrayImage::new(canvas.width, canvas.height);
    for &(ox, oy) in offsets {
        let dst = PixelBox::new(
            src.min_x.saturating_add(ox),
            src.min_y.saturating_add(oy),
            src.max_x.saturating_add(ox),
            src.max_y.saturating_add(oy),
        );
        let Some(dst) = dst.clip(canvas.width, canvas.height) else {
            continue;
        };
        for y in dst.min_y..dst.max_y {
            for x in dst.min_x..dst.max_x {
                let value = pixels.get_pixel(x - ox, y - oy)[0];
                if value > 0 {
                    let px = out.get_pixel_mut(x, y);
                    px[0] = px[0].max(value);
                }
            }
        }
    }
    Ok(Mask::new(out))
}

/// Name of the stamped mask for `source` in group `label`.
///
/// `slice_7.png` in group `50` becomes `slice_7_50.png`.
pub fn stamped_name(source: &str, label: &str) -> String {
    match source.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => format!("{base}_{label}.{ext}"),
        _ => format!("{source}_{label}"),
    }
}

/// Configuration for [`generate_print_job`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Plate the stamped masks are rendered on.
    pub canvas: CanvasConfig,
    /// How group labels become durations.
    pub mode: DoseMode,
    /// Run the exposure optimizer on the generated job.
    pub optimize: bool,
    /// Optimizer settings; its canvas is replaced by [`Self::canvas`].
    pub optimizer: OptimizerConfig,
}

impl LayoutConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plate size.
    pub fn with_canvas(mut self, canvas: CanvasConfig) -> Self {
        self.canvas = canvas;
        self
    }

    /// Sets the dose mode.
    pub fn with_mode(mut self, mode: DoseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables the optimization pass.
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Sets the optimizer configuration.
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

/// A job produced from a layout.
#[derive(Debug, Clone)]
pub struct GeneratedJob {
    /// The translated (and possibly optimized) job.
    pub job: PrintJob,
    /// Every mask the job references.
    pub masks: MaskTable,
    /// Optimizer counters, when optimization ran.
    pub optimization: Option<OptimizationSummary>,
}

/// Translates a component job through a layout.
///
/// For every layer, dose group and original entry (in that order) one entry
/// is emitted referencing the stamped mask, with the original settings and the
/// translated duration. The returned table holds only stamped masks and, when
/// optimization ran, its composites.
///
/// # Errors
///
/// - [`PrintFileError::InvalidLayout`] for an empty layout or a bad label
/// - a core `MissingMask` if an entry references an unknown mask
pub fn generate_print_job(
    job: &PrintJob,
    masks: &MaskTable,
    placements: &[ComponentPlacement],
    config: &LayoutConfig,
) -> Result<GeneratedJob> {
    let groups = group_placements(placements);
    if groups.is_empty() {
        return Err(PrintFileError::invalid_layout("layout contains no components"));
    }
    for group in &groups {
        config.mode.exposure_ms(&group.label, 0)?;
    }

    let mut stamped = MaskTable::new();
    let mut layers = Vec::with_capacity(job.layer_count());
    for (index, layer) in job.layers.iter().enumerate() {
        let mut entries = Vec::with_capacity(layer.len() * groups.len());
        for group in &groups {
            for entry in &layer.entries {
                let name = stamped_name(&entry.mask, &group.label);
                if !stamped.contains_key(&name) {
                    let template = resolve_mask(masks, &entry.mask)?;
                    stamped.insert(
                        name.clone(),
                        stamp_composite(template, &group.offsets, &config.canvas)?,
                    );
                }
                entries.push(MaskEntry {
                    mask: name,
                    exposure_ms: config.mode.exposure_ms(&group.label, entry.exposure_ms)?,
                    settings: entry.settings.clone(),
                });
            }
        }
        log::debug!(
            "Layer {}: {} entries -> {} entries",
            index,
            layer.len(),
            entries.len()
        );
        layers.push(Layer::new(entries));
    }
    let generated = PrintJob::new(layers);
    log::info!("Created {} stamped masks", stamped.len());

    if !config.optimize {
        return Ok(GeneratedJob {
            job: generated,
            masks: stamped,
            optimization: None,
        });
    }

    let optimizer = config.optimizer.clone().with_canvas(config.canvas);
    let optimized = optimize_print(&generated, &stamped, &optimizer)?;
    log::info!(
        "Optimization complete: {} -> {} entries",
        optimized.summary.entries_before,
        optimized.summary.entries_after
    );
    Ok(GeneratedJob {
        job: optimized.job,
        masks: optimized.masks,
        optimization: Some(optimized.summary),
    })
}

/// Pairs of placements whose footprints overlap, as `(i, j)` with `i < j`.
///
/// Rectangles that only touch do not overlap; zero-sized footprints never do.
pub fn find_overlapping_placements(placements: &[ComponentPlacement]) -> Vec<(usize, usize)> {
    let rects: Vec<PixelBox> = placements.iter().map(ComponentPlacement::rect).collect();
    let mut pairs = Vec::new();
    for (i, a) in rects.iter().enumerate() {
        if a.is_empty() {
            continue;
        }
        for (j, b) in rects.iter().enumerate().skip(i + 1) {
            if !b.is_empty() && a.intersects(b) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> CanvasConfig {
        CanvasConfig::new(100, 60)
    }

    fn dot_template() -> Mask {
        Mask::from_rects(100, 60, &[PixelBox::new(0, 0, 4, 3)])
    }

    #[test]
    fn test_parse_layout_accepts_numeric_groups() {
        let placements = parse_layout(
            r#"[
                {"group": "50", "x": 10, "y": 20, "width": 5, "height": 5},
                {"group": 100, "x": 30, "y": 20},
                {"group": 1.5, "x": 0, "y": 0}
            ]"#,
        )
        .unwrap();
        assert_eq!(placements.len(), 3);
        assert_eq!(placements[0], ComponentPlacement::new(10, 20, 5, 5, "50"));
        assert_eq!(placements[1].group, "100");
        assert_eq!(placements[1].width, 0);
        assert_eq!(placements[2].group, "1.5");
    }

    #[test]
    fn test_group_placements_first_seen_order() {
        let placements = vec![
            ComponentPlacement::new(0, 0, 0, 0, "80"),
            ComponentPlacement::new(10, 0, 0, 0, "40"),
            ComponentPlacement::new(20, 0, 0, 0, "80"),
        ];
        let groups = group_placements(&placements);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "80");
        assert_eq!(groups[0].offsets, vec![(0, 0), (20, 0)]);
        assert_eq!(groups[1].label, "40");
    }

    #[test]
    fn test_dose_modes() {
        assert_eq!(DoseMode::Percentage.exposure_ms("50", 1000).unwrap(), 500);
        assert_eq!(DoseMode::Percentage.exposure_ms("12.5", 1000).unwrap(), 125);
        assert_eq!(DoseMode::Percentage.exposure_ms("150", 999).unwrap(), 1498);
        assert_eq!(DoseMode::Absolute.exposure_ms("1500", 1000).unwrap(), 1500);
        assert_eq!(DoseMode::Absolute.exposure_ms("2.9", 1000).unwrap(), 2);
        assert!(DoseMode::Percentage.exposure_ms("high", 1000).is_err());
        assert!(DoseMode::Absolute.exposure_ms("-5", 1000).is_err());
        assert!(DoseMode::Absolute.exposure_ms("inf", 1000).is_err());
    }

    #[test]
    fn test_stamp_composite() {
        let mask = stamp_composite(&dot_template(), &[(10, 10), (50, 20)], &canvas()).unwrap();
        assert_eq!(mask.lit_count(), 24);
        assert!(mask.is_lit(10, 10) && mask.is_lit(13, 12));
        assert!(mask.is_lit(50, 20) && mask.is_lit(53, 22));
        assert!(!mask.is_lit(0, 0));
    }

    #[test]
    fn test_stamp_composite_clips_and_merges() {
        // Overlapping copies merge; the copy at the edge is clipped.
        let mask =
            stamp_composite(&dot_template(), &[(0, 0), (2, 0), (98, 58), (500, 500)], &canvas())
                .unwrap();
        assert_eq!(mask.lit_count(), 6 * 3 + 2 * 2);
        assert!(mask.is_lit(99, 59));
    }

    #[test]
    fn test_stamp_blank_template() {
        let mask = stamp_composite(&Mask::blank(100, 60), &[(5, 5)], &canvas()).unwrap();
        assert!(mask.is_empty());
        assert_eq!(mask.dimensions(), (100, 60));
    }

    #[test]
    fn test_layout_config_from_json() {
        let config: LayoutConfig = serde_json::from_str(
            r#"{"canvas": {"width": 100, "height": 60}, "mode": "absolute", "optimize": true}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            LayoutConfig::new()
                .with_canvas(canvas())
                .with_mode(DoseMode::Absolute)
                .with_optimize(true)
        );

        let text = serde_json::to_string(&config).unwrap();
        let back: LayoutConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
        assert_eq!(serde_json::from_str::<LayoutConfig>("{}").unwrap(), LayoutConfig::default());
    }

    #[test]
    fn test_stamped_name() {
        assert_eq!(stamped_name("slice_7.png", "50"), "slice_7_50.png");
        assert_eq!(stamped_name("slice", "50"), "slice_50");
        assert_eq!(stamped_name("a.b.png", "1.5"), "a.b_1.5.png");
    }

    #[test]
    fn test_generate_print_job() {
        let mut masks = MaskTable::new();
        masks.insert("s0.png".into(), dot_template());
        let job = PrintJob::new(vec![
            Layer::new(vec![MaskEntry::new("s0.png", 1000).with_setting("Light intensity", 100)]),
            Layer::new(vec![MaskEntry::new("s0.png", 800)]),
        ]);
        let placements = vec![
            ComponentPlacement::new(0, 0, 4, 3, "50"),
            ComponentPlacement::new(20, 0, 4, 3, "100"),
            ComponentPlacement::new(40, 0, 4, 3, "50"),
        ];
        let config = LayoutConfig::new().with_canvas(canvas());

        let out = generate_print_job(&job, &masks, &placements, &config).unwrap();
        assert!(out.optimization.is_none());
        assert_eq!(out.masks.len(), 2);
        assert_eq!(out.masks["s0_50.png"].lit_count(), 24);

        let first = &out.job.layers[0].entries;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].mask, "s0_50.png");
        assert_eq!(first[0].exposure_ms, 500);
        assert_eq!(first[1].mask, "s0_100.png");
        assert_eq!(first[1].exposure_ms, 1000);
        assert_eq!(first[0].settings, job.layers[0].entries[0].settings);

        let second = &out.job.layers[1].entries;
        assert_eq!(second[0].exposure_ms, 400);
        assert_eq!(second[1].exposure_ms, 800);
    }

    #[test]
    fn test_generate_with_optimization() {
        let mut masks = MaskTable::new();
        masks.insert("s0.png".into(), dot_template());
        let job = PrintJob::new(vec![Layer::new(vec![MaskEntry::new("s0.png", 1000)])]);
        let placements = vec![
            ComponentPlacement::new(0, 0, 4, 3, "50"),
            ComponentPlacement::new(20, 0, 4, 3, "100"),
        ];
        let config = LayoutConfig::new().with_canvas(canvas()).with_optimize(true);

        let out = generate_print_job(&job, &masks, &placements, &config).unwrap();
        let summary = out.optimization.unwrap();
        assert_eq!(summary.composites_created, 2);

        let entries = &out.job.layers[0].entries;
        assert_eq!(entries.len(), 2);
        let first = &out.masks[&entries[0].mask];
        assert_eq!(entries[0].exposure_ms, 500);
        assert!(first.is_lit(0, 0) && first.is_lit(20, 0));
        assert_eq!(entries[1].exposure_ms, 500);
        assert!(!out.masks[&entries[1].mask].is_lit(0, 0));
    }

    #[test]
    fn test_generate_rejects_bad_layouts() {
        let mut masks = MaskTable::new();
        masks.insert("s0.png".into(), dot_template());
        let job = PrintJob::new(vec![Layer::new(vec![MaskEntry::new("s0.png", 1000)])]);
        let config = LayoutConfig::new().with_canvas(canvas());

        assert!(matches!(
            generate_print_job(&job, &masks, &[], &config),
            Err(PrintFileError::InvalidLayout(_))
        ));
        let bad = vec![ComponentPlacement::new(0, 0, 1, 1, "lots")];
        assert!(matches!(
            generate_print_job(&job, &masks, &bad, &config),
            Err(PrintFileError::InvalidLayout(_))
        ));
        let missing = PrintJob::new(vec![Layer::new(vec![MaskEntry::new("nope.png", 1)])]);
        let ok = vec![ComponentPlacement::new(0, 0, 1, 1, "100")];
        assert!(matches!(
            generate_print_job(&missing, &masks, &ok, &config),
            Err(PrintFileError::Core(dosemux_core::Error::MissingMask { .. }))
        ));
    }

    #[test]
    fn test_find_overlapping_placements() {
        let placements = vec![
            ComponentPlacement::new(0, 0, 10, 10, "1"),
            ComponentPlacement::new(10, 0, 10, 10, "1"),
            ComponentPlacement::new(5, 5, 10, 10, "2"),
            ComponentPlacement::new(7, 7, 0, 0, "2"),
        ];
        assert_eq!(find_overlapping_placements(&placements), vec![(0, 2), (1, 2)]);
    }
}
