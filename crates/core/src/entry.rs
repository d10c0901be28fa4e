//! Mask entries, layers and print jobs.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::settings::{SettingValue, Settings};

/// Name of a mask in a [`MaskTable`].
pub type MaskId = String;

/// Job-wide table of masks keyed by name.
pub type MaskTable = BTreeMap<MaskId, Mask>;

/// Looks up a mask, failing with [`Error::MissingMask`] when absent.
pub fn resolve_mask<'a>(masks: &'a MaskTable, name: &str) -> Result<&'a Mask> {
    masks.get(name).ok_or_else(|| Error::missing_mask(name))
}

/// One exposure pass: a mask, how long to expose it and the printer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskEntry {
    /// Name of the mask to expose.
    pub mask: MaskId,
    /// Exposure duration in milliseconds.
    pub exposure_ms: u64,
    /// All other printer settings for this pass.
    pub settings: Settings,
}

impl MaskEntry {
    /// Creates an entry with empty settings.
    pub fn new(mask: impl Into<MaskId>, exposure_ms: u64) -> Self {
        Self {
            mask: mask.into(),
            exposure_ms,
            settings: Settings::new(),
        }
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a single setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Returns true if both entries carry equal settings.
    pub fn is_compatible(&self, other: &MaskEntry) -> bool {
        self.settings == other.settings
    }
}

/// Ordered list of entries exposed for one printed layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layer {
    /// Entries in exposure order.
    pub entries: Vec<MaskEntry>,
}

impl Layer {
    /// Creates a layer from its entries.
    pub fn new(entries: Vec<MaskEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the layer has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all exposure durations in milliseconds.
    pub fn total_exposure_ms(&self) -> u64 {
        self.entries.iter().map(|e| e.exposure_ms).sum()
    }
}

/// A print job: ordered layers, each processed independently.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrintJob {
    /// Layers in build order.
    pub layers: Vec<Layer>,
}

impl PrintJob {
    /// Creates a job from its layers.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Appends a layer, builder style.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total number of entries across all layers.
    pub fn entry_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// Sum of all exposure durations across all layers.
    pub fn total_exposure_ms(&self) -> u64 {
        self.layers.iter().map(Layer::total_exposure_ms).sum()
    }

    /// Names of every mask referenced by an entry.
    pub fn referenced_masks(&self) -> BTreeSet<&str> {
        self.layers
            .iter()
            .flat_map(|layer| layer.entries.iter().map(|e| e.mask.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = MaskEntry::new("a.png", 1200)
            .with_setting("Light intensity", 100)
            .with_setting("Wait before", 0.5);
        assert_eq!(entry.mask, "a.png");
        assert_eq!(entry.exposure_ms, 1200);
        assert_eq!(entry.settings.len(), 2);
    }

    #[test]
    fn test_compatibility_ignores_mask_and_duration() {
        let a = MaskEntry::new("a.png", 1000).with_setting("power", 80);
        let b = MaskEntry::new("b.png", 3000).with_setting("power", 80);
        let c = MaskEntry::new("c.png", 1000).with_setting("power", 90);
        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));
    }

    #[test]
    fn test_job_counts() {
        let job = PrintJob::default()
            .with_layer(Layer::new(vec![
                MaskEntry::new("a.png", 100),
                MaskEntry::new("b.png", 200),
            ]))
            .with_layer(Layer::new(vec![MaskEntry::new("a.png", 300)]));

        assert_eq!(job.layer_count(), 2);
        assert_eq!(job.entry_count(), 3);
        assert_eq!(job.total_exposure_ms(), 600);
        let refs: Vec<&str> = job.referenced_masks().into_iter().collect();
        assert_eq!(refs, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_resolve_mask() {
        let mut masks = MaskTable::new();
        masks.insert("a.png".to_string(), Mask::blank(4, 4));
        assert!(resolve_mask(&masks, "a.png").is_ok());
        assert_eq!(
            resolve_mask(&masks, "b.png"),
            Err(Error::missing_mask("b.png"))
        );
    }
}
