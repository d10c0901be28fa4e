//! Printer settings attached to mask entries.
//!
//! Settings are an order-independent bag of named values. Two entries are
//! compatible when their bags compare equal; grouping uses the canonical
//! sorted `(name, value)` sequence as the key.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single setting value.
///
/// Values of different kinds never compare equal: `Int(100)` and
/// `Float(100.0)` are distinct settings.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SettingValue {
    /// Explicitly unset.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value. NaN cannot be canonicalized.
    Float(f64),
    /// Free-form text.
    Text(String),
    /// Ordered list of values.
    List(Vec<SettingValue>),
}

impl SettingValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::List(_) => 5,
        }
    }

    /// Returns true if the value (recursively) supports canonical ordering.
    pub fn is_comparable(&self) -> bool {
        match self {
            Self::Float(f) => !f.is_nan(),
            Self::List(items) => items.iter().all(Self::is_comparable),
            _ => true,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value of an `Int` or `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value, if this is `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Maps `-0.0` to `0.0` so both zeros compare and hash alike.
fn unsigned_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl Ord for SettingValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SettingValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SettingValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SettingValue {}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<SettingValue>> From<Vec<T>> for SettingValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Canonical grouping key: settings sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SettingsKey(Vec<(String, SettingValue)>);

impl SettingsKey {
    /// The `(name, value)` pairs in sorted order.
    pub fn pairs(&self) -> &[(String, SettingValue)] {
        &self.0
    }
}

impl std::hash::Hash for SettingValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => unsigned_zero(*v).to_bits().hash(state),
            Self::Text(v) => v.hash(state),
            Self::List(items) => items.hash(state),
        }
    }
}

/// Named printer settings for one mask entry, excluding the mask reference
/// and the exposure duration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Settings(BTreeMap<String, SettingValue>);

impl Settings {
    /// Creates an empty settings bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setting, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SettingValue>,
    ) -> Option<SettingValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Looks up a value by name.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    /// Removes a value by name.
    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.0.remove(key)
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no settings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates settings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter()
    }

    /// Builds the canonical grouping key.
    ///
    /// Fails with [`Error::InvalidSetting`] if a value has no canonical order.
    pub fn canonical_key(&self) -> Result<SettingsKey> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            if !value.is_comparable() {
                return Err(Error::invalid_setting(
                    key.clone(),
                    format!("value {value} has no canonical ordering"),
                ));
            }
            pairs.push((key.clone(), value.clone()));
        }
        Ok(SettingsKey(pairs))
    }
}

impl<K, V> FromIterator<(K, V)> for Settings
where
    K: Into<String>,
    V: Into<SettingValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Settings {
    type Item = (String, SettingValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, SettingValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = Settings::new()
            .with("Light intensity", 100)
            .with("Wait after", 1.5)
            .with("Mode", "fast");
        let b = Settings::new()
            .with("Mode", "fast")
            .with("Light intensity", 100)
            .with("Wait after", 1.5);

        assert_eq!(a, b);
        assert_eq!(a.canonical_key().unwrap(), b.canonical_key().unwrap());
    }

    #[test]
    fn test_key_is_sorted() {
        let s = Settings::new().with("z", 1).with("a", 2).with("m", 3);
        let key = s.canonical_key().unwrap();
        let names: Vec<&str> = key.pairs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_different_values_differ() {
        let a = Settings::new().with("Light intensity", 100);
        let b = Settings::new().with("Light intensity", 90);
        assert_ne!(a.canonical_key().unwrap(), b.canonical_key().unwrap());
    }

    #[test]
    fn test_int_and_float_are_distinct() {
        assert_ne!(SettingValue::Int(100), SettingValue::Float(100.0));
    }

    #[test]
    fn test_signed_zeros_share_a_key() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let positive = Settings::new().with("Z offset", 0.0);
        let negative = Settings::new().with("Z offset", -0.0);
        let a = positive.canonical_key().unwrap();
        let b = negative.canonical_key().unwrap();
        assert_eq!(a, b);

        let hash = |key: &SettingsKey| {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
        assert!(SettingValue::Float(-1.0) < SettingValue::Float(-0.0));
    }

    #[test]
    fn test_nan_is_rejected() {
        let s = Settings::new().with("ok", 1).with("bad", f64::NAN);
        match s.canonical_key() {
            Err(Error::InvalidSetting { key, .. }) => assert_eq!(key, "bad"),
            other => panic!("expected InvalidSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_nan_is_rejected() {
        let s = Settings::new().with("list", vec![1.0, f64::NAN]);
        assert!(s.canonical_key().is_err());
    }

    #[test]
    fn test_value_ordering_across_kinds() {
        let mut values = vec![
            SettingValue::from("b"),
            SettingValue::Int(3),
            SettingValue::Null,
            SettingValue::Bool(true),
            SettingValue::Float(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                SettingValue::Null,
                SettingValue::Bool(true),
                SettingValue::Int(3),
                SettingValue::Float(-1.0),
                SettingValue::from("b"),
            ]
        );
    }

    #[test]
    fn test_from_iterator() {
        let s: Settings = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(s.len(), 2);
        assert_eq!(s.get("b").and_then(SettingValue::as_int), Some(2));
    }
}
