//! Image processing: pure Rust, no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Plan** | [`plan_variant_widths`]: ladder widths below the master width |
//! | **Resize** | Lanczos3, re-encoded in the master's own format |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for width planning and dimension math
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{plan_variant_widths, scaled_height};
pub use operations::{VariantConfig, create_variant, get_dimensions, plan_variants};
pub use params::{Quality, ResizeParams};
pub use rust_backend::{RustBackend, is_supported_image};
