//! Print-file I/O and layout translation for dosemux.
//!
//! This crate connects the dose engine to the files a resin printer consumes:
//!
//! - [`archive`]: zip archives with `print_settings.json` and `slices/*.png`
//! - [`document`]: conversion between the settings document and a [`dosemux_core::PrintJob`]
//! - [`layout`]: stamping a component job onto a plate layout with per-group doses
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use dosemux_compose::OptimizerConfig;
//! use dosemux_printfile::optimize_print_file;
//!
//! let result = optimize_print_file(Path::new("part.zip"), None, &OptimizerConfig::default())?;
//! println!("wrote {}", result.output.display());
//! # Ok::<(), dosemux_printfile::PrintFileError>(())
//! ```

pub mod archive;
pub mod document;
pub mod error;
pub mod layout;

pub use archive::{
    default_output_path, generate_print_file, load_print_file, optimize_print_file,
    read_print_file, save_print_file, write_print_file, FileOptimization, PrintFile, BLACK_IMAGE,
};
pub use document::PrintDocument;
pub use error::{PrintFileError, Result};
pub use layout::{
    find_overlapping_placements, generate_print_job, group_placements, load_layout, parse_layout,
    stamp_composite, ComponentPlacement, DoseGroup, DoseMode, GeneratedJob, LayoutConfig,
};
