//! Zip print-file archives.
//!
//! An archive holds `print_settings.json` at the root and one image per mask
//! under `slices/`. Images are decoded to 8-bit grayscale on load and written
//! back as PNG.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use dosemux_compose::{optimize_print, OptimizationSummary, OptimizerConfig};
use dosemux_core::{resolve_mask, CanvasConfig, Mask, MaskTable, PrintJob};
use image::ImageFormat;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::document::PrintDocument;
use crate::error::{PrintFileError, Result};
use crate::layout::{generate_print_job, ComponentPlacement, GeneratedJob, LayoutConfig};

/// Name of the settings document inside the archive.
pub const SETTINGS_FILE: &str = "print_settings.json";

/// Directory holding the mask images.
pub const SLICES_DIR: &str = "slices/";

/// Image substituted when the default layer image is unavailable.
pub const BLACK_IMAGE: &str = "black.png";

/// A loaded print file.
///
/// `job` is authoritative: saving rewrites the document's layers from it and
/// keeps every other document key.
#[derive(Debug, Clone)]
pub struct PrintFile {
    /// The settings document as read.
    pub document: PrintDocument,
    /// Layers converted from the document.
    pub job: PrintJob,
    /// Decoded masks by image name.
    pub masks: MaskTable,
}

impl PrintFile {
    /// Builds a print file from a document and its masks.
    pub fn new(document: PrintDocument, masks: MaskTable) -> Result<Self> {
        let job = document.to_job()?;
        Ok(Self {
            document,
            job,
            masks,
        })
    }

    /// Replaces the job and masks, keeping the document.
    pub fn with_job(self, job: PrintJob, masks: MaskTable) -> Self {
        Self {
            document: self.document,
            job,
            masks,
        }
    }
}

/// Outcome of [`optimize_print_file`].
#[derive(Debug, Clone)]
pub struct FileOptimization {
    /// Where the optimized archive was written.
    pub output: PathBuf,
    /// Optimizer counters.
    pub summary: OptimizationSummary,
}

/// Returns true if `path` has a `.zip` extension (any case).
pub fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Default output path for an optimized archive: `<stem>_optimized.zip`
/// next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "print".to_string());
    input.with_file_name(format!("{stem}_optimized.zip"))
}

/// Reads a print file from any seekable reader.
///
/// Every image referenced by a layer must be present; the default layer
/// image is loaded when available.
pub fn read_print_file<R: Read + Seek>(reader: R) -> Result<PrintFile> {
    let mut archive = ZipArchive::new(reader)?;

    let bytes = read_entry(&mut archive, SETTINGS_FILE)?.ok_or(PrintFileError::MissingDocument)?;
    let document = PrintDocument::from_slice(&bytes)?;
    let job = document.to_job()?;

    let referenced = job.referenced_masks();
    log::info!("Loading {} unique images", referenced.len());

    let mut masks = MaskTable::new();
    for name in referenced {
        let bytes = read_entry(&mut archive, &slice_path(name))?
            .ok_or_else(|| PrintFileError::MissingImage(name.to_string()))?;
        log::debug!("Loading image: {name}");
        masks.insert(name.to_string(), decode_mask(&bytes)?);
    }

    if let Some(name) = document.default_image() {
        if !masks.contains_key(name) {
            match read_entry(&mut archive, &slice_path(name))? {
                Some(bytes) => {
                    masks.insert(name.to_string(), decode_mask(&bytes)?);
                }
                None => log::debug!("Default image {name} is not in the archive"),
            }
        }
    }

    log::info!(
        "Print file loaded: {} layers, {} images",
        job.layer_count(),
        masks.len()
    );
    Ok(PrintFile {
        document,
        job,
        masks,
    })
}

/// Loads a print file from disk.
///
/// # Errors
///
/// - [`PrintFileError::NotAZip`] if the path does not end in `.zip`
/// - [`PrintFileError::MissingDocument`] without `print_settings.json`
/// - [`PrintFileError::MissingImage`] if a referenced slice is absent
pub fn load_print_file<P: AsRef<Path>>(path: P) -> Result<PrintFile> {
    let path = path.as_ref();
    log::info!("Loading print file from {}", path.display());
    if !is_zip_path(path) {
        return Err(PrintFileError::NotAZip(path.to_path_buf()));
    }
    let file = File::open(path)?;
    read_print_file(BufReader::new(file))
}

/// Writes a print file to any seekable writer and returns the writer.
///
/// The document is written with two-space indentation, followed by a
/// `slices/` directory entry and one PNG per mask referenced by the job or
/// named as the default image. A default image missing from the mask table
/// is replaced by a black canvas-sized [`BLACK_IMAGE`].
pub fn write_print_file<W: Write + Seek>(
    writer: W,
    file: &PrintFile,
    canvas: &CanvasConfig,
) -> Result<W> {
    let mut document = file.document.with_job(&file.job);

    let black;
    let mut images: Vec<(String, &Mask)> = Vec::new();
    for name in file.job.referenced_masks() {
        images.push((name.to_string(), resolve_mask(&file.masks, name)?));
    }

    if let Some(name) = document.default_image().map(str::to_string) {
        if let Some(mask) = file.masks.get(&name) {
            if !images.iter().any(|(n, _)| *n == name) {
                images.push((name, mask));
            }
        } else {
            log::debug!("Default image {name} unavailable, substituting {BLACK_IMAGE}");
            canvas.validate()?;
            black = Mask::blank(canvas.width, canvas.height);
            document.set_default_image(BLACK_IMAGE);
            if !images.iter().any(|(n, _)| n == BLACK_IMAGE) {
                images.push((BLACK_IMAGE.to_string(), &black));
            }
        }
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    log::debug!("Writing {SETTINGS_FILE}");
    zip.start_file(SETTINGS_FILE, options)?;
    zip.write_all(document.to_pretty_json()?.as_bytes())?;

    zip.add_directory(SLICES_DIR, options)?;

    log::info!("Saving {} images", images.len());
    for (name, mask) in &images {
        log::debug!("Saving image: {name}");
        zip.start_file(slice_path(name), options)?;
        zip.write_all(&encode_mask(mask)?)?;
    }

    Ok(zip.finish()?)
}

/// Saves a print file to disk.
pub fn save_print_file<P: AsRef<Path>>(
    path: P,
    file: &PrintFile,
    canvas: &CanvasConfig,
) -> Result<()> {
    let path = path.as_ref();
    log::info!("Saving print file to {}", path.display());
    let writer = write_print_file(BufWriter::new(File::create(path)?), file, canvas)?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    log::info!("Print file saved");
    Ok(())
}

/// Loads, optimizes and saves a print file.
///
/// The output defaults to [`default_output_path`] of the input.
pub fn optimize_print_file(
    input: &Path,
    output: Option<&Path>,
    config: &OptimizerConfig,
) -> Result<FileOptimization> {
    let file = load_print_file(input)?;
    let optimized = optimize_print(&file.job, &file.masks, config)?;
    log::info!(
        "Optimized {} layers: {} -> {} entries ({} composites)",
        optimized.summary.layers_optimized,
        optimized.summary.entries_before,
        optimized.summary.entries_after,
        optimized.summary.composites_created
    );

    let output = output.map_or_else(|| default_output_path(input), Path::to_path_buf);
    let file = file.with_job(optimized.job, optimized.masks);
    save_print_file(&output, &file, &config.canvas)?;

    Ok(FileOptimization {
        output,
        summary: optimized.summary,
    })
}

/// Loads a component print file, translates it through a layout and saves
/// the result.
pub fn generate_print_file(
    input: &Path,
    output: &Path,
    placements: &[ComponentPlacement],
    config: &LayoutConfig,
) -> Result<GeneratedJob> {
    log::info!(
        "Generating print file {} -> {} ({} components, optimize={})",
        input.display(),
        output.display(),
        placements.len(),
        config.optimize
    );
    let file = load_print_file(input)?;
    let generated = generate_print_job(&file.job, &file.masks, placements, config)?;

    let file = file.with_job(generated.job.clone(), generated.masks.clone());
    save_print_file(output, &file, &config.canvas)?;
    Ok(generated)
}

fn slice_path(name: &str) -> String {
    format!("{SLICES_DIR}{name}")
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn decode_mask(bytes: &[u8]) -> Result<Mask> {
    Ok(Mask::new(image::load_from_memory(bytes)?.into_luma8()))
}

fn encode_mask(mask: &Mask) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    mask.as_image()
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
