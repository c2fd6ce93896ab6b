//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the resize collaborator: it can identify an
//! image's dimensions and write a resized copy. Everything above it is
//! backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because resizes fan out across rayon's pool.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Write `params.source` resized to `params.width` x `params.height`
    /// at `params.output`. Must fail loudly on unsupported input.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
