//! The `print_settings.json` document.
//!
//! The document is kept as a JSON object so keys this crate does not
//! interpret survive a load/save cycle. Only the layer image lists are
//! converted to and from [`PrintJob`]; every other key, at the top level and
//! inside each layer, is carried through untouched.

use std::collections::BTreeSet;

use dosemux_core::{Layer, MaskEntry, PrintJob, SettingValue, Settings};
use serde_json::{Map, Number, Value};

use crate::error::{PrintFileError, Result};

/// Top-level list of layers.
pub const LAYERS_KEY: &str = "Layers";
/// Per-layer list of image settings.
pub const IMAGE_LIST_KEY: &str = "Image settings list";
/// Mask reference inside an image setting.
pub const IMAGE_FILE_KEY: &str = "Image file";
/// Exposure duration inside an image setting.
pub const EXPOSURE_KEY: &str = "Layer exposure time (ms)";
/// Top-level default settings block.
pub const DEFAULT_LAYER_KEY: &str = "Default layer settings";
/// Image settings inside the default block.
pub const DEFAULT_IMAGE_KEY: &str = "Image settings";

/// A parsed `print_settings.json`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrintDocument {
    root: Map<String, Value>,
}

impl PrintDocument {
    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(PrintFileError::invalid_document(format!(
                "expected a JSON object at the top level, found {}",
                kind(&other)
            ))),
        }
    }

    /// Parses document bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Serializes with two-space indentation.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Number of layers in the document.
    pub fn layer_count(&self) -> usize {
        self.layers().len()
    }

    /// Name of the default layer image, if the document declares one.
    pub fn default_image(&self) -> Option<&str> {
        self.root
            .get(DEFAULT_LAYER_KEY)?
            .get(DEFAULT_IMAGE_KEY)?
            .get(IMAGE_FILE_KEY)?
            .as_str()
    }

    /// Points the default layer image at `name`.
    ///
    /// Returns false if the document has no default image settings block.
    pub fn set_default_image(&mut self, name: &str) -> bool {
        let slot = self
            .root
            .get_mut(DEFAULT_LAYER_KEY)
            .and_then(|d| d.get_mut(DEFAULT_IMAGE_KEY))
            .and_then(Value::as_object_mut);
        match slot {
            Some(settings) => {
                settings.insert(IMAGE_FILE_KEY.to_string(), Value::from(name));
                true
            }
            None => false,
        }
    }

    /// Image names referenced by the layers.
    pub fn referenced_images(&self) -> BTreeSet<&str> {
        self.layers()
            .iter()
            .filter_map(|layer| layer.get(IMAGE_LIST_KEY)?.as_array())
            .flatten()
            .filter_map(|setting| setting.get(IMAGE_FILE_KEY)?.as_str())
            .collect()
    }

    /// Converts the layers into a [`PrintJob`].
    ///
    /// # Errors
    ///
    /// Returns [`PrintFileError::InvalidDocument`] for malformed layers or
    /// entries, and a core `InvalidSetting` for nested objects used as
    /// setting values.
    pub fn to_job(&self) -> Result<PrintJob> {
        let raw_layers = match self.root.get(LAYERS_KEY) {
            None => return Ok(PrintJob::default()),
            Some(Value::Array(layers)) => layers,
            Some(other) => {
                return Err(PrintFileError::invalid_document(format!(
                    "\"{LAYERS_KEY}\" must be a list, found {}",
                    kind(other)
                )))
            }
        };

        let mut layers = Vec::with_capacity(raw_layers.len());
        for (index, raw) in raw_layers.iter().enumerate() {
            let entries = match raw.get(IMAGE_LIST_KEY) {
                None => Vec::new(),
                Some(Value::Array(list)) => list
                    .iter()
                    .map(|setting| entry_from_json(index, setting))
                    .collect::<Result<Vec<_>>>()?,
                Some(other) => {
                    return Err(PrintFileError::invalid_document(format!(
                        "layer {index}: \"{IMAGE_LIST_KEY}\" must be a list, found {}",
                        kind(other)
                    )))
                }
            };
            layers.push(Layer::new(entries));
        }

        log::debug!("Parsed {} layers from print settings", layers.len());
        Ok(PrintJob::new(layers))
    }

    /// Returns a copy of this document whose layers describe `job`.
    ///
    /// Layer-level keys other than the image list are kept from the
    /// corresponding original layer; extra layers start as empty objects.
    pub fn with_job(&self, job: &PrintJob) -> Self {
        let originals = self.layers();
        let layers: Vec<Value> = job
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                let mut object = originals
                    .get(index)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let list = layer.entries.iter().map(entry_to_json).collect();
                object.insert(IMAGE_LIST_KEY.to_string(), Value::Array(list));
                Value::Object(object)
            })
            .collect();

        let mut root = self.root.clone();
        root.insert(LAYERS_KEY.to_string(), Value::Array(layers));
        Self { root }
    }

    fn layers(&self) -> &[Value] {
        self.root
            .get(LAYERS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Converts a JSON value into a setting value.
///
/// # Errors
///
/// Nested objects cannot be compared and yield `InvalidSetting`.
pub fn setting_from_json(key: &str, value: &Value) -> dosemux_core::Result<SettingValue> {
    Ok(match value {
        Value::Null => SettingValue::Null,
        Value::Bool(b) => SettingValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SettingValue::Int(i),
            None => SettingValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SettingValue::Text(s.clone()),
        Value::Array(items) => SettingValue::List(
            items
                .iter()
                .map(|item| setting_from_json(key, item))
                .collect::<dosemux_core::Result<_>>()?,
        ),
        Value::Object(_) => {
            return Err(dosemux_core::Error::invalid_setting(
                key,
                "nested objects are not supported",
            ))
        }
    })
}

/// Converts a setting value back into JSON.
pub fn setting_to_json(value: &SettingValue) -> Value {
    match value {
        SettingValue::Null => Value::Null,
        SettingValue::Bool(b) => Value::Bool(*b),
        SettingValue::Int(i) => Value::from(*i),
        SettingValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        SettingValue::Text(s) => Value::String(s.clone()),
        SettingValue::List(items) => Value::Array(items.iter().map(setting_to_json).collect()),
    }
}

fn entry_from_json(layer: usize, value: &Value) -> Result<MaskEntry> {
    let object = value.as_object().ok_or_else(|| {
        PrintFileError::invalid_document(format!(
            "layer {layer}: image settings must be objects, found {}",
            kind(value)
        ))
    })?;

    let mask = object
        .get(IMAGE_FILE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            PrintFileError::invalid_document(format!(
                "layer {layer}: image setting without a string \"{IMAGE_FILE_KEY}\""
            ))
        })?;

    let exposure_ms = object
        .get(EXPOSURE_KEY)
        .and_then(exposure_from_json)
        .ok_or_else(|| {
            PrintFileError::invalid_document(format!(
                "layer {layer}: '{mask}' needs a non-negative integer \"{EXPOSURE_KEY}\""
            ))
        })?;

    let mut settings = Settings::new();
    for (key, value) in object {
        if key == IMAGE_FILE_KEY || key == EXPOSURE_KEY {
            continue;
        }
        settings.insert(key.clone(), setting_from_json(key, value)?);
    }

    Ok(MaskEntry::new(mask, exposure_ms).with_settings(settings))
}

fn entry_to_json(entry: &MaskEntry) -> Value {
    let mut object: Map<String, Value> = entry
        .settings
        .iter()
        .map(|(key, value)| (key.clone(), setting_to_json(value)))
        .collect();
    object.insert(IMAGE_FILE_KEY.to_string(), Value::from(entry.mask.as_str()));
    object.insert(EXPOSURE_KEY.to_string(), Value::from(entry.exposure_ms));
    Value::Object(object)
}

fn exposure_from_json(value: &Value) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    let ms = value.as_f64()?;
    (ms.is_finite() && ms >= 0.0 && ms.fract() == 0.0).then_some(ms as u64)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
