//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Planning is
//! split from execution so the generator can flatten every (master, width)
//! job of a run into one parallel batch.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{plan_variant_widths, scaled_height};
use super::params::{Quality, ResizeParams};
use crate::naming::variant_filename;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Configuration for variant generation.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    /// Candidate widths, ascending.
    pub ladder: Vec<u32>,
    pub quality: Quality,
}

/// Plan the resize operations for one master without executing them.
///
/// One [`ResizeParams`] per ladder width below the master's width, written to
/// `output_dir/{basename}-{width}{ext}`.
pub fn plan_variants(
    source: &Path,
    output_dir: &Path,
    filename: &str,
    original_dims: (u32, u32),
    config: &VariantConfig,
) -> Vec<ResizeParams> {
    plan_variant_widths(original_dims.0, &config.ladder)
        .into_iter()
        .map(|width| ResizeParams {
            source: source.to_path_buf(),
            output: output_dir.join(variant_filename(filename, width)),
            width,
            height: scaled_height(original_dims, width),
            quality: config.quality,
        })
        .collect()
}

/// Execute one planned variant.
pub fn create_variant(backend: &impl ImageBackend, params: &ResizeParams) -> Result<()> {
    backend.resize(params)
}
