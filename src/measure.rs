//! Breakpoint measurement sweep.
//!
//! Stage 3 of the pipeline. Walks the breakpoints in ascending order, sizing
//! the viewport to each one and recording how wide every image renders:
//!
//! ```text
//! for q in [480, 768, 992, 1200, MAX]:
//!     resize viewport to (q, probe_height)   # MAX uses MAX - 1
//!     wait settle delay
//!     measure → table[id][q]
//! ```
//!
//! The renderer has a single viewport, so each measurement completes before
//! the next resize starts. One sample is taken per breakpoint; the compiler
//! only relies on the breakpoint → width mapping, so sampling more widths per
//! range would not change it.

use crate::renderer::{RenderError, Renderer, RendererSession};
use crate::types::{BreakpointSet, MeasurementTable};
use log::debug;

/// Measure every image at every breakpoint.
///
/// Elements the renderer does not report at some breakpoint simply have no
/// cell for it. The first renderer error aborts the sweep; the session has
/// already been closed by then.
pub fn sweep<R: Renderer>(
    session: &mut RendererSession<R>,
    breakpoints: &BreakpointSet,
    probe_height: u32,
) -> Result<MeasurementTable, RenderError> {
    debug!(
        "sweeping {} breakpoints, {:?} settle after each resize",
        breakpoints.count(),
        session.settle()
    );
    let mut table = MeasurementTable::new();
    for breakpoint in breakpoints.iter() {
        session.resize_viewport(breakpoint.window_width(), probe_height)?;
        let column = session.measure_at(breakpoint.value())?;
        let written = table.record_column(breakpoint.value(), column);
        debug!("recorded {written} widths for {:?}", breakpoint);
    }
    Ok(table)
}
