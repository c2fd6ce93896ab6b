//! Layout-engine access.
//!
//! Rendered image widths come from a real browser: CSS layout cannot be
//! evaluated statically in general, so the page is loaded and asked.
//!
//! - [`Renderer`] is the typed request/response contract with the layout
//!   engine. Each call resolves exactly once.
//! - [`RendererSession`] owns one renderer for one run and enforces the
//!   lifecycle `Uninitialized → Loaded → Ready → {Measuring ⇄ Idle} → Closed`.
//!   Any failure closes the renderer before the error propagates.
//! - [`ChromeRenderer`] is the production renderer, driving headless Chrome
//!   through `headless_chrome`.

mod chrome;
mod scripts;
mod session;

pub use chrome::ChromeRenderer;
pub use session::{RendererSession, SessionState};

use crate::types::CompiledAttributes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to launch renderer: {0}")]
    Launch(String),
    #[error("Failed to load document {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    #[error("Script did not complete within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Invalid image binding: {0}")]
    Binding(String),
    #[error("No compiled attributes for image element '{0}'")]
    MissingAttributes(String),
    #[error("Script failed: {0}")]
    Script(String),
    #[error("Cannot {operation} while session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

/// An `<img>` element as found in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageElement {
    /// `id` attribute; `None` when absent or empty.
    pub id: Option<String>,
    /// Raw `src` attribute.
    pub src: String,
}

/// A layout engine hosting one document.
///
/// Implementations only perform the requested operation; ordering and
/// cleanup on failure are the session's job.
pub trait Renderer {
    /// Load a local document.
    fn load(&mut self, document: &Path) -> Result<(), RenderError>;

    /// Block until the document reports it has finished loading.
    fn await_ready(&mut self) -> Result<(), RenderError>;

    /// Change the viewport size.
    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Every `<img>` element in document order.
    fn image_elements(&mut self) -> Result<Vec<ImageElement>, RenderError>;

    /// Rendered width of every laid-out `<img>` with an id, as a CSS length.
    ///
    /// Elements without a layout box are omitted. Scrollbars must not
    /// shrink the layout while measuring, and the page's own overflow
    /// setting must be restored afterwards whether or not measuring worked.
    fn measure(&mut self) -> Result<BTreeMap<String, String>, RenderError>;

    /// Set `srcset`/`sizes` on every `<img>` and return the serialized markup.
    fn apply_attributes(&mut self, compiled: &CompiledAttributes) -> Result<String, RenderError>;

    /// Release the underlying engine. Must be idempotent.
    fn close(&mut self);
}
