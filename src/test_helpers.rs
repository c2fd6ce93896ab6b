//! Shared test utilities.
//!
//! [`FakeRenderer`] stands in for a browser: it reports a fixed list of
//! `<img>` elements, computes their widths from a layout function of the
//! current viewport width, and records every call so tests can assert on
//! ordering.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let fake = FakeRenderer::new(vec![img("hero", "images/beach.jpg")])
//!     .with_layout(|_, viewport| Some(viewport.min(1000)));
//! let log = fake.calls();
//! let mut session = RendererSession::new(fake, Duration::ZERO);
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::renderer::{ImageElement, RenderError, Renderer};
use crate::types::CompiledAttributes;

// =========================================================================
// Fake renderer
// =========================================================================

/// One recorded call against a [`FakeRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererCall {
    Load(String),
    AwaitReady,
    Resize(u32, u32),
    ImageElements,
    Measure,
    Apply(Vec<String>),
    Close,
}

/// Rendered width of element `id` at viewport width `viewport`, or `None`
/// when the element has no layout box there.
pub type Layout = Box<dyn Fn(&str, u32) -> Option<u32>>;

pub struct FakeRenderer {
    pub elements: Vec<ImageElement>,
    pub layout: Layout,
    pub fail_load: bool,
    /// Measuring at this viewport width reports a script timeout.
    pub timeout_at_width: Option<u32>,
    viewport_width: u32,
    calls: Arc<Mutex<Vec<RendererCall>>>,
    timeline: Arc<Mutex<Vec<(RendererCall, Instant)>>>,
}

impl FakeRenderer {
    /// Images render at `min(viewport, 1000)` by default.
    pub fn new(elements: Vec<ImageElement>) -> Self {
        Self {
            elements,
            layout: Box::new(default_layout),
            fail_load: false,
            timeout_at_width: None,
            viewport_width: 1280,
            calls: Arc::new(Mutex::new(Vec::new())),
            timeline: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_layout(mut self, layout: impl Fn(&str, u32) -> Option<u32> + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Handle on the call log that outlives the renderer.
    pub fn calls(&self) -> Arc<Mutex<Vec<RendererCall>>> {
        Arc::clone(&self.calls)
    }

    /// Same calls as [`calls`](Self::calls), each with the instant it
    /// reached the renderer.
    pub fn timeline(&self) -> Arc<Mutex<Vec<(RendererCall, Instant)>>> {
        Arc::clone(&self.timeline)
    }

    fn record(&self, call: RendererCall) {
        self.timeline
            .lock()
            .unwrap()
            .push((call.clone(), Instant::now()));
        self.calls.lock().unwrap().push(call);
    }
}

impl Renderer for FakeRenderer {
    fn load(&mut self, document: &Path) -> Result<(), RenderError> {
        self.record(RendererCall::Load(document.display().to_string()));
        if self.fail_load {
            return Err(RenderError::Load {
                path: document.to_path_buf(),
                reason: "net::ERR_FILE_NOT_FOUND".into(),
            });
        }
        Ok(())
    }

    fn await_ready(&mut self) -> Result<(), RenderError> {
        self.record(RendererCall::AwaitReady);
        Ok(())
    }

    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.record(RendererCall::Resize(width, height));
        self.viewport_width = width;
        Ok(())
    }

    fn image_elements(&mut self) -> Result<Vec<ImageElement>, RenderError> {
        self.record(RendererCall::ImageElements);
        Ok(self.elements.clone())
    }

    fn measure(&mut self) -> Result<BTreeMap<String, String>, RenderError> {
        self.record(RendererCall::Measure);
        if self.timeout_at_width == Some(self.viewport_width) {
            return Err(RenderError::Timeout(Duration::from_secs(60)));
        }
        let widths = self
            .elements
            .iter()
            .filter_map(|e| e.id.as_deref())
            .filter_map(|id| {
                (self.layout)(id, self.viewport_width).map(|w| (id.to_string(), format!("{w}px")))
            })
            .collect();
        Ok(widths)
    }

    fn apply_attributes(&mut self, compiled: &CompiledAttributes) -> Result<String, RenderError> {
        self.record(RendererCall::Apply(compiled.keys().cloned().collect()));
        let mut markup = String::from("<!DOCTYPE html>\n<html><head></head><body>");
        for element in &self.elements {
            let id = element.id.as_deref().unwrap_or_default();
            let Some(attributes) = compiled.get(id) else {
                return Err(RenderError::MissingAttributes(id.to_string()));
            };
            markup.push_str(&format!(
                r#"<img id="{id}" src="{}" srcset="{}" sizes="{}">"#,
                element.src, attributes.srcset, attributes.sizes
            ));
        }
        markup.push_str("</body></html>");
        Ok(markup)
    }

    fn close(&mut self) {
        self.record(RendererCall::Close);
    }
}

fn default_layout(_id: &str, viewport: u32) -> Option<u32> {
    Some(viewport.min(1000))
}

/// An `<img>` element with an id.
pub fn img(id: &str, src: &str) -> ImageElement {
    ImageElement {
        id: Some(id.to_string()),
        src: src.to_string(),
    }
}

/// Time from each viewport resize to the next measurement.
pub fn resize_to_measure_gaps(timeline: &[(RendererCall, Instant)]) -> Vec<Duration> {
    let mut gaps = Vec::new();
    let mut resized_at = None;
    for (call, at) in timeline {
        match call {
            RendererCall::Resize(..) => resized_at = Some(*at),
            RendererCall::Measure => {
                if let Some(start) = resized_at.take() {
                    gaps.push(at.duration_since(start));
                }
            }
            _ => {}
        }
    }
    gaps
}
