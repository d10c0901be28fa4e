//! Error types shared by the dose planning crates.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while planning exposures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An entry references a mask that is not present in the mask table.
    #[error("mask '{name}' is referenced by an entry but missing from the mask table")]
    MissingMask {
        /// Name of the missing mask.
        name: String,
    },

    /// A mask does not match the canvas it is combined on.
    #[error("mask is {found:?} but the canvas is {expected:?}")]
    DimensionMismatch {
        /// Expected `(width, height)`.
        expected: (u32, u32),
        /// Actual `(width, height)`.
        found: (u32, u32),
    },

    /// Pixel buffer length does not match the declared dimensions.
    #[error("pixel buffer of {len} bytes does not fit a {width}x{height} mask")]
    InvalidPixelBuffer {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Actual buffer length.
        len: usize,
    },

    /// A settings value cannot be canonicalized for grouping.
    #[error("setting '{key}' cannot be compared: {reason}")]
    InvalidSetting {
        /// Setting name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates a [`Error::MissingMask`] for the given name.
    pub fn missing_mask(name: impl Into<String>) -> Self {
        Self::MissingMask { name: name.into() }
    }

    /// Creates a [`Error::InvalidSetting`].
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
