//! # respimg
//!
//! Adds responsive-image attributes to a static HTML document. For every
//! `<img>` it writes a `srcset` listing resized variants of the master image,
//! and a `sizes` value stating how wide the image actually renders at each
//! viewport breakpoint.
//!
//! Rendered width depends on the page's CSS and cannot be computed statically
//! in general. respimg loads the document in headless Chrome, resizes the
//! viewport across a fixed set of breakpoints and measures every image.
//!
//! # Architecture: Five-Stage Pipeline
//!
//! ```text
//! 1. Generate   site/images/*  →  dist/images/, dist/variants/   (rayon fan-out)
//! 2. Bind       site/index.html → { img id → master filename }
//! 3. Measure    viewport 480, 768, 992, 1200, max → { id → { breakpoint → width } }
//! 4. Compile    records + measurements → { id → { srcset, sizes } }
//! 5. Inject     attributes → dist/index.html
//! ```
//!
//! Stages share one [`pipeline::RunContext`]. Stage 1 is data-parallel;
//! stages 2 to 5 talk to a single renderer strictly in sequence.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Stage 1: discovers masters, plans and writes variants |
//! | [`renderer`] | Stage 2 and 5: the `Renderer` contract, session lifecycle, headless Chrome |
//! | [`measure`] | Stage 3: the breakpoint sweep |
//! | [`compile`] | Stage 4: `srcset`/`sizes` compilation |
//! | [`pipeline`] | Runs all stages over one context |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`types`] | Records, binding, measurement table, breakpoints |
//! | [`naming`] | `{basename}-{width}{ext}` variant filename convention |
//! | [`imaging`] | Pure-Rust resize backend on the `image` crate |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Browser as Layout Oracle
//!
//! Every in-page script runs inside an envelope that races it against the
//! configured timeout and always resolves to exactly one JSON reply. The Rust
//! side therefore sees one result per call and never has to untangle a script
//! that both failed and timed out.
//!
//! ## The Sentinel Breakpoint
//!
//! Above the last media query the image width is measured at the configured
//! maximum viewable width minus one pixel, and emitted as the unconditional
//! last `sizes` clause.
//!
//! ## No Partial Output
//!
//! A failed resize removes the variants the run already wrote, and a renderer
//! failure aborts before the output document is written. Every `srcset`
//! entry in a written document points at a file that exists.

pub mod compile;
pub mod config;
pub mod imaging;
pub mod measure;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod renderer;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
