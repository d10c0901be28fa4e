//! Configuration for exposure optimization and mask partitioning.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use dosemux_core::{CanvasConfig, Error, Result};

/// Default tag inserted into composite mask names (`<stem>_opt_<i>.png`).
pub const DEFAULT_COMPOSITE_TAG: &str = "opt";

/// Default number of grid cells per axis used by the partitioner.
pub const DEFAULT_GRID_SIZE: u32 = 10;

/// Configuration parameters for the layer/print optimizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerConfig {
    /// Plate that composite masks are rendered on. Every mask in a composed
    /// group must have these dimensions.
    pub canvas: CanvasConfig,

    /// Tag placed between the source stem and the pass index in composite names.
    pub composite_tag: String,

    /// Optimize layers on the rayon thread pool.
    /// Results are merged in layer order, so output does not depend on this flag.
    pub parallel: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            composite_tag: DEFAULT_COMPOSITE_TAG.to_string(),
            parallel: true,
        }
    }
}

impl OptimizerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the canvas.
    pub fn with_canvas(mut self, canvas: CanvasConfig) -> Self {
        self.canvas = canvas;
        self
    }

    /// Sets the composite name tag.
    pub fn with_composite_tag(mut self, tag: impl Into<String>) -> Self {
        self.composite_tag = tag.into();
        self
    }

    /// Enables or disables parallel layer processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the canvas and tag.
    pub fn validate(&self) -> Result<()> {
        self.canvas.validate()?;
        if self.composite_tag.is_empty() {
            return Err(Error::InvalidConfig(
                "composite tag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration parameters for the conflict-graph partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartitionConfig {
    /// Number of grid cells along each axis of the spatial grid.
    pub grid_size: u32,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl PartitionConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grid resolution.
    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Rejects a zero-sized grid.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(Error::InvalidConfig(
                "grid size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
