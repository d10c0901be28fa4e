//! Grouping of mask entries by shared printer settings.

use std::collections::BTreeMap;

use dosemux_core::{MaskEntry, Result, SettingsKey};

/// Entries that share every setting except mask reference and duration.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsGroup {
    /// Canonical key shared by all entries.
    pub key: SettingsKey,
    /// Entries in input order.
    pub entries: Vec<MaskEntry>,
}

impl SettingsGroup {
    /// Number of entries in the group.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the group has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the group has a single entry and needs no composition.
    pub fn is_singleton(&self) -> bool {
        self.entries.len() == 1
    }
}

/// Partitions entries into settings groups.
///
/// Groups are returned in order of first appearance and entries keep their
/// input order within a group. Every entry lands in exactly one group.
///
/// Fails with [`dosemux_core::Error::InvalidSetting`] when a settings value
/// has no canonical ordering.
pub fn group_by_settings(entries: &[MaskEntry]) -> Result<Vec<SettingsGroup>> {
    let mut index: BTreeMap<SettingsKey, usize> = BTreeMap::new();
    let mut groups: Vec<SettingsGroup> = Vec::new();

    for entry in entries {
        let key = entry.settings.canonical_key()?;
        match index.get(&key) {
            Some(&slot) => groups[slot].entries.push(entry.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(SettingsGroup {
                    key,
                    entries: vec![entry.clone()],
                });
            }
        }
    }

    log::trace!(
        "Grouped {} entries into {} settings groups",
        entries.len(),
        groups.len()
    );
    Ok(groups)
}
