//! # Dosemux Core
//!
//! Data model for multiplexed vat-photopolymerization exposure planning.
//!
//! A single build plate carries many specimens that need different cumulative
//! UV doses. Each printed layer is a list of [`MaskEntry`] values: a binary
//! [`Mask`], an exposure duration and the remaining printer [`Settings`].
//! The `dosemux-compose` crate rewrites those lists into fewer passes that
//! deliver the same per-pixel dose.
//!
//! ## Core Components
//!
//! - **Masks**: [`Mask`] with a cached tight [`PixelBox`] of lit pixels
//! - **Settings**: [`Settings`] bags compared through a canonical [`SettingsKey`]
//! - **Jobs**: [`MaskEntry`], [`Layer`], [`PrintJob`] and the [`MaskTable`]
//! - **Canvas**: [`CanvasConfig`] sizes every composite the engine creates
//!
//! ## Example
//!
//! ```rust
//! use dosemux_core::{Mask, MaskEntry, PixelBox};
//!
//! let mask = Mask::from_rects(100, 100, &[PixelBox::new(10, 10, 40, 40)]);
//! assert_eq!(mask.bounding_box(), Some(PixelBox::new(10, 10, 40, 40)));
//!
//! let entry = MaskEntry::new("part_a.png", 1500).with_setting("Light intensity", 100);
//! assert_eq!(entry.exposure_ms, 1500);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod bbox;
pub mod config;
pub mod entry;
pub mod error;
pub mod mask;
pub mod settings;

// Re-exports
pub use bbox::PixelBox;
pub use config::CanvasConfig;
pub use entry::{resolve_mask, Layer, MaskEntry, MaskId, MaskTable, PrintJob};
pub use error::{Error, Result};
pub use mask::Mask;
pub use settings::{SettingValue, Settings, SettingsKey};
