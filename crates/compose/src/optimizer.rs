//! Layer and print-job exposure optimization.
//!
//! For every layer, entries are grouped by settings. Groups with more than one
//! entry whose masks are pairwise non-overlapping are rewritten into
//! telescoping composite passes; everything else passes through unchanged.
//!
//! Layers are independent. With [`OptimizerConfig::parallel`] set they are
//! optimized on the rayon pool into private results, then merged into the
//! job-wide mask table in layer order so composite names stay deterministic.

use std::collections::BTreeSet;
use std::time::Instant;

use rayon::prelude::*;

use dosemux_core::{resolve_mask, Layer, Mask, MaskEntry, MaskTable, PrintJob, Result};

use crate::compose::{compose_group, disambiguate};
use crate::config::OptimizerConfig;
use crate::grouping::group_by_settings;
use crate::overlap::first_overlap;
use crate::result::{LayerOptimization, OptimizationSummary, PrintOptimization};

/// Rewrites layers into fewer exposure passes with identical per-pixel dose.
#[derive(Debug, Clone, Default)]
pub struct ExposureOptimizer {
    config: OptimizerConfig,
}

impl ExposureOptimizer {
    /// Creates an optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimizes a single layer.
    ///
    /// Composite names never collide with a name already in `masks` or with
    /// another composite of the same layer.
    ///
    /// # Errors
    ///
    /// - [`dosemux_core::Error::MissingMask`] if any entry references an absent mask
    /// - [`dosemux_core::Error::InvalidSetting`] if settings cannot be grouped
    /// - [`dosemux_core::Error::DimensionMismatch`] if a composed mask does not match the canvas
    pub fn optimize_layer(
        &self,
        entries: &[MaskEntry],
        masks: &MaskTable,
    ) -> Result<LayerOptimization> {
        self.config.validate()?;
        for entry in entries {
            resolve_mask(masks, &entry.mask)?;
        }

        if entries.len() <= 1 {
            return Ok(LayerOptimization::unchanged(entries.to_vec()));
        }

        let groups = group_by_settings(entries)?;
        let mut result = LayerOptimization::default();
        result.summary.entries_before = entries.len();
        result.summary.groups = groups.len();
        let mut layer_names: BTreeSet<String> = BTreeSet::new();

        for group in groups {
            if group.len() <= 1 {
                result.entries.extend(group.entries);
                continue;
            }

            let group_masks = group
                .entries
                .iter()
                .map(|e| resolve_mask(masks, &e.mask))
                .collect::<Result<Vec<&Mask>>>()?;

            if let Some((i, j)) = first_overlap(&group_masks) {
                log::debug!(
                    "Masks '{}' and '{}' overlap; leaving group of {} entries unmodified",
                    group.entries[i].mask,
                    group.entries[j].mask,
                    group.len()
                );
                result.summary.groups_overlapping += 1;
                result.entries.extend(group.entries);
                continue;
            }

            let composition = compose_group(&group.entries, masks, &self.config)?;
            let mut composed_entries = composition.entries;
            for (name, mask) in composition.composites {
                let unique = disambiguate(&name, |n| {
                    masks.contains_key(n) || layer_names.contains(n)
                });
                if unique != name {
                    rename_references(&mut composed_entries, &name, &unique);
                }
                layer_names.insert(unique.clone());
                result.composites.push((unique, mask));
            }

            result.summary.groups_composed += 1;
            result.entries.extend(composed_entries);
        }

        result.summary.entries_after = result.entries.len();
        result.summary.composites_created = result.composites.len();
        log::debug!(
            "Layer optimized: {} -> {} entries, {} composites",
            result.summary.entries_before,
            result.summary.entries_after,
            result.summary.composites_created
        );
        Ok(result)
    }

    /// Optimizes every layer of a job.
    ///
    /// Layers with no entries, or whose entries reference no mask present in
    /// `masks`, are left untouched. Layers that reference some but not all of
    /// their masks fail with [`dosemux_core::Error::MissingMask`].
    ///
    /// The returned table holds every original mask plus the new composites.
    pub fn optimize_print(&self, job: &PrintJob, masks: &MaskTable) -> Result<PrintOptimization> {
        let start = Instant::now();
        self.config.validate()?;

        let optimize = |layer: &Layer| -> Result<Option<LayerOptimization>> {
            if !is_resolvable(layer, masks) {
                return Ok(None);
            }
            self.optimize_layer(&layer.entries, masks).map(Some)
        };

        let per_layer: Vec<Option<LayerOptimization>> = if self.config.parallel {
            job.layers.par_iter().map(optimize).collect::<Result<_>>()?
        } else {
            job.layers.iter().map(optimize).collect::<Result<_>>()?
        };

        let mut out_masks = masks.clone();
        let mut summary = OptimizationSummary {
            layers_total: job.layers.len(),
            ..Default::default()
        };
        let mut layers = Vec::with_capacity(job.layers.len());

        for (index, (layer, optimized)) in job.layers.iter().zip(per_layer).enumerate() {
            let Some(mut optimized) = optimized else {
                log::debug!("Layer {index}: nothing to optimize");
                summary.layers_skipped += 1;
                layers.push(layer.clone());
                continue;
            };

            merge_composites(&mut optimized, &mut out_masks);
            summary.add_layer(&optimized.summary);
            layers.push(Layer::new(optimized.entries));
        }

        summary.computation_time_ms = start.elapsed().as_millis() as u64;
        log::debug!(
            "Optimized {} layers: {} -> {} entries, {} composites",
            summary.layers_optimized,
            summary.entries_before,
            summary.entries_after,
            summary.composites_created
        );

        Ok(PrintOptimization {
            job: PrintJob::new(layers),
            masks: out_masks,
            summary,
        })
    }
}

/// Optimizes a single layer. See [`ExposureOptimizer::optimize_layer`].
pub fn optimize_layer(
    entries: &[MaskEntry],
    masks: &MaskTable,
    config: &OptimizerConfig,
) -> Result<LayerOptimization> {
    ExposureOptimizer::new(config.clone()).optimize_layer(entries, masks)
}

/// Optimizes a whole job. See [`ExposureOptimizer::optimize_print`].
pub fn optimize_print(
    job: &PrintJob,
    masks: &MaskTable,
    config: &OptimizerConfig,
) -> Result<PrintOptimization> {
    ExposureOptimizer::new(config.clone()).optimize_print(job, masks)
}

fn is_resolvable(layer: &Layer, masks: &MaskTable) -> bool {
    layer.entries.iter().any(|e| masks.contains_key(&e.mask))
}

fn rename_references(entries: &mut [MaskEntry], from: &str, to: &str) {
    for entry in entries.iter_mut().filter(|e| e.mask == from) {
        entry.mask = to.to_string();
    }
}

/// Moves a layer's composites into the job table, renaming any that collide
/// with masks added by earlier layers.
fn merge_composites(layer: &mut LayerOptimization, table: &mut MaskTable) {
    let pending: BTreeSet<String> = layer.composites.iter().map(|(n, _)| n.clone()).collect();
    for (name, mask) in std::mem::take(&mut layer.composites) {
        let unique = disambiguate(&name, |n| {
            table.contains_key(n) || (n != name && pending.contains(n))
        });
        if unique != name {
            rename_references(&mut layer.entries, &name, &unique);
        }
        table.insert(unique, mask);
    }
}
