//! Variant generation.
//!
//! Stage 1 of the pipeline. Discovers the master images, plans which ladder
//! widths each one gets, resizes them all in parallel and copies the masters
//! verbatim to the output.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── images/
//! │   ├── beach.jpg              # Verbatim master copy
//! │   └── harbor.png
//! └── variants/
//!     ├── beach-500.jpg          # {basename}-{width}{ext}
//!     ├── beach-800.jpg
//!     ├── harbor-500.png
//!     └── ...
//! ```
//!
//! ## Parallel Processing
//!
//! Every (master, width) pair is an independent job. All jobs of a run are
//! flattened into one batch and run on [rayon](https://docs.rs/rayon)'s pool;
//! the stage only completes once every job has finished. A single failed
//! resize fails the whole stage and the variants it already wrote are removed,
//! since a `srcset` entry must always point at a real file.
//!
//! ## Reused Output Roots
//!
//! Before resizing, variants and master copies left by an earlier run that
//! this run no longer plans are deleted, so the output never holds a file for
//! a master that was removed or shrank. Only files named like a variant (in
//! the variants directory) or with a supported image extension (in the images
//! directory) are considered; anything else under the output root is kept.

use crate::imaging::{
    BackendError, ImageBackend, Quality, ResizeParams, VariantConfig, create_variant,
    get_dimensions, is_supported_image, plan_variants,
};
use crate::naming::parse_variant_filename;
use crate::types::{MasterImageRecord, MasterRecords};
use log::debug;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read images directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Resize to {} failed: {source}", output.display())]
    Resize {
        output: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Images directory not found: {0}")]
    ImagesDirNotFound(PathBuf),
    #[error("Image filename is not valid UTF-8: {0}")]
    NonUtf8Filename(PathBuf),
    #[error("Duplicate master filename: {0}")]
    DuplicateFilename(String),
}

/// Where masters are read from and where copies and variants are written.
#[derive(Debug, Clone)]
pub struct ProcessLayout {
    pub images_in: PathBuf,
    pub images_out: PathBuf,
    pub variants_out: PathBuf,
}

/// Configuration for variant generation.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub ladder: Vec<u32>,
    pub quality: u32,
}

impl ProcessConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            ladder: config.images.widths.clone(),
            quality: config.images.quality,
        }
    }

    fn variant_config(&self) -> VariantConfig {
        VariantConfig {
            ladder: self.ladder.clone(),
            quality: Quality::new(self.quality),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from_config(&crate::config::Config::default())
    }
}

/// Progress reported once per master after the stage has joined.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    MasterProcessed {
        filename: String,
        dimensions: (u32, u32),
        variants: Vec<u32>,
    },
}

/// Output of the stage.
#[derive(Debug)]
pub struct ProcessResult {
    pub records: MasterRecords,
    pub variants_written: usize,
}

/// A master with its record and the resizes it needs.
#[derive(Debug, Clone)]
pub struct PlannedMaster {
    pub record: MasterImageRecord,
    pub jobs: Vec<ResizeParams>,
}

/// List the master images directly inside `images_dir`, sorted by name.
///
/// Subdirectories are not descended into; files without a supported image
/// extension are ignored.
pub fn discover_masters(images_dir: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    if !images_dir.is_dir() {
        return Err(ProcessError::ImagesDirNotFound(images_dir.to_path_buf()));
    }
    let mut masters = Vec::new();
    for entry in WalkDir::new(images_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            masters.push(entry.into_path());
        }
    }
    masters.sort();
    Ok(masters)
}

/// Identify every master and plan its variants, without writing anything.
pub fn plan_masters(
    backend: &impl ImageBackend,
    masters: &[PathBuf],
    variants_out: &Path,
    config: &ProcessConfig,
) -> Result<Vec<PlannedMaster>, ProcessError> {
    let variant_config = config.variant_config();
    let planned: Vec<PlannedMaster> = masters
        .par_iter()
        .map(|source| plan_master(backend, source, variants_out, &variant_config))
        .collect::<Result<_, _>>()?;

    let mut seen = HashSet::new();
    for master in &planned {
        if !seen.insert(master.record.filename.as_str()) {
            return Err(ProcessError::DuplicateFilename(
                master.record.filename.clone(),
            ));
        }
    }
    Ok(planned)
}

fn plan_master(
    backend: &impl ImageBackend,
    source: &Path,
    variants_out: &Path,
    config: &VariantConfig,
) -> Result<PlannedMaster, ProcessError> {
    let filename = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ProcessError::NonUtf8Filename(source.to_path_buf()))?
        .to_string();
    let byte_size = std::fs::metadata(source)?.len();
    let dimensions = get_dimensions(backend, source)?;
    let jobs = plan_variants(source, variants_out, &filename, dimensions, config);

    Ok(PlannedMaster {
        record: MasterImageRecord {
            filename,
            source_path: source.to_path_buf(),
            byte_size,
            width: dimensions.0,
            height: dimensions.1,
            variant_widths: jobs.iter().map(|job| job.width).collect(),
        },
        jobs,
    })
}

/// Generate variants and master copies with the given backend.
pub fn process_with_backend(
    backend: &impl ImageBackend,
    layout: &ProcessLayout,
    config: &ProcessConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let masters = discover_masters(&layout.images_in)?;
    let planned = plan_masters(backend, &masters, &layout.variants_out, config)?;
    prune_stale(layout, &planned)?;

    std::fs::create_dir_all(&layout.variants_out)?;
    std::fs::create_dir_all(&layout.images_out)?;

    let jobs: Vec<&ResizeParams> = planned.iter().flat_map(|m| m.jobs.iter()).collect();

    // Collect every outcome before inspecting any: the stage joins on all jobs.
    let outcomes: Vec<Result<(), ProcessError>> = jobs
        .par_iter()
        .map(|job| {
            create_variant(backend, job).map_err(|source| ProcessError::Resize {
                output: job.output.clone(),
                source,
            })
        })
        .collect();

    if let Some(err) = outcomes.into_iter().find_map(Result::err) {
        remove_outputs(&jobs);
        return Err(err);
    }

    for master in &planned {
        let dest = layout.images_out.join(&master.record.filename);
        std::fs::copy(&master.record.source_path, &dest)?;
    }

    let variants_written = jobs.len();
    let mut records = MasterRecords::new();
    for master in planned {
        if let Some(tx) = &events {
            tx.send(ProcessEvent::MasterProcessed {
                filename: master.record.filename.clone(),
                dimensions: (master.record.width, master.record.height),
                variants: master.record.variant_widths.iter().copied().collect(),
            })
            .ok();
        }
        records.insert(master.record.filename.clone(), master.record);
    }

    Ok(ProcessResult {
        records,
        variants_written,
    })
}

/// Delete variants and master copies in the output that `planned` does not
/// produce. Returns how many files were removed.
fn prune_stale(layout: &ProcessLayout, planned: &[PlannedMaster]) -> Result<usize, ProcessError> {
    let variants: HashSet<&Path> = planned
        .iter()
        .flat_map(|m| m.jobs.iter())
        .map(|job| job.output.as_path())
        .collect();
    let masters: HashSet<&str> = planned.iter().map(|m| m.record.filename.as_str()).collect();

    let removed = remove_files_where(&layout.variants_out, |path, name| {
        parse_variant_filename(name).is_some()
            && is_supported_image(path)
            && !variants.contains(path)
    })? + remove_files_where(&layout.images_out, |path, name| {
        is_supported_image(path) && !masters.contains(name)
    })?;
    if removed > 0 {
        debug!("removed {removed} stale files from earlier runs");
    }
    Ok(removed)
}

/// Remove the files directly inside `dir` for which `stale(path, name)` holds.
fn remove_files_where(
    dir: &Path,
    stale: impl Fn(&Path, &str) -> bool,
) -> Result<usize, ProcessError> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if stale(entry.path(), name) {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Best-effort removal of variant files from a failed run.
fn remove_outputs(jobs: &[&ResizeParams]) {
    for job in jobs {
        if job.output.exists() {
            std::fs::remove_file(&job.output).ok();
        }
    }
}
