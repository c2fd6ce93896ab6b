//! Renderer lifecycle for one pipeline run.

use super::{RenderError, Renderer};
use crate::naming::strip_path_prefix;
use crate::types::{CompiledAttributes, ElementBinding};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Lifecycle states of a [`RendererSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loaded,
    Ready,
    Measuring,
    Idle,
    Closed,
}

/// Exclusive owner of one renderer for one run.
///
/// Operations are only accepted in the states listed on each method. Any
/// error, including a call in the wrong state, closes the renderer before it
/// is returned: there is no recovery path for renderer failures. Dropping the
/// session closes the renderer too, so every exit path releases it.
pub struct RendererSession<R: Renderer> {
    renderer: R,
    state: SessionState,
    settle: Duration,
    bound_ids: Vec<String>,
}

impl<R: Renderer> RendererSession<R> {
    /// Wrap a freshly created renderer. `settle` is waited after every
    /// viewport resize so layout can re-flow before anything is measured.
    pub fn new(renderer: R, settle: Duration) -> Self {
        Self {
            renderer,
            state: SessionState::Uninitialized,
            settle,
            bound_ids: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Delay waited after each viewport resize.
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// `Uninitialized → Loaded`.
    pub fn load(&mut self, document: &Path) -> Result<(), RenderError> {
        self.expect("load a document", &[SessionState::Uninitialized])?;
        debug!("loading {}", document.display());
        self.call(|r| r.load(document))?;
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// `Loaded → Ready`.
    pub fn await_ready(&mut self) -> Result<(), RenderError> {
        self.expect("wait for readiness", &[SessionState::Loaded])?;
        self.call(|r| r.await_ready())?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Resize the viewport and wait for the settle delay. No state change.
    pub fn resize_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.expect(
            "resize the viewport",
            &[SessionState::Ready, SessionState::Idle],
        )?;
        debug!("viewport {width}x{height}");
        self.call(|r| r.resize_viewport(width, height))?;
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        Ok(())
    }

    /// Map every image element id to the filename its `src` points at.
    ///
    /// Fails when an element has no id or two elements share one.
    pub fn bind_image_identifiers(&mut self) -> Result<ElementBinding, RenderError> {
        self.expect(
            "bind image identifiers",
            &[SessionState::Ready, SessionState::Idle],
        )?;
        let elements = self.call(|r| r.image_elements())?;

        let mut binding = ElementBinding::new();
        let mut failure = None;
        for element in elements {
            let Some(id) = element.id.filter(|id| !id.is_empty()) else {
                failure = Some(format!("<img src=\"{}\"> has no id", element.src));
                break;
            };
            if binding.contains_key(&id) {
                failure = Some(format!("id '{id}' is used by more than one <img>"));
                break;
            }
            binding.insert(id, strip_path_prefix(&element.src).to_string());
        }
        if let Some(reason) = failure {
            return Err(self.fail(RenderError::Binding(reason)));
        }

        self.bound_ids = binding.keys().cloned().collect();
        Ok(binding)
    }

    /// Measure every image at the current viewport, labelled `query_width`.
    ///
    /// `Ready|Idle → Measuring → Idle`.
    pub fn measure_at(&mut self, query_width: u32) -> Result<BTreeMap<String, String>, RenderError> {
        self.expect("measure", &[SessionState::Ready, SessionState::Idle])?;
        self.state = SessionState::Measuring;
        let widths = self.call(|r| r.measure())?;
        debug!("breakpoint {query_width}: {} images measured", widths.len());
        self.state = SessionState::Idle;
        Ok(widths)
    }

    /// Set the compiled attributes on every image and serialize the document.
    ///
    /// Fails if any bound element has no compiled entry.
    pub fn inject_attributes_and_serialize(
        &mut self,
        compiled: &CompiledAttributes,
    ) -> Result<String, RenderError> {
        self.expect(
            "inject attributes",
            &[SessionState::Ready, SessionState::Idle],
        )?;
        if let Some(id) = self.bound_ids.iter().find(|id| !compiled.contains_key(*id)) {
            let err = RenderError::MissingAttributes(id.clone());
            return Err(self.fail(err));
        }
        self.call(|r| r.apply_attributes(compiled))
    }

    /// Release the renderer. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!("closing renderer (was {:?})", self.state);
            self.renderer.close();
            self.state = SessionState::Closed;
        }
    }

    fn expect(
        &mut self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<(), RenderError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        let err = RenderError::InvalidState {
            operation,
            state: self.state,
        };
        Err(self.fail(err))
    }

    /// Run a renderer operation, closing the session if it fails.
    fn call<T>(
        &mut self,
        op: impl FnOnce(&mut R) -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        match op(&mut self.renderer) {
            Ok(value) => Ok(value),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: RenderError) -> RenderError {
        warn!("renderer failed: {err}");
        self.close();
        err
    }
}

impl<R: Renderer> Drop for RendererSession<R> {
    fn drop(&mut self) {
        self.close();
    }
}
