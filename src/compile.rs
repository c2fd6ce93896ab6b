//! Attribute compilation.
//!
//! Stage 4 of the pipeline. Turns the master records and the measurement
//! table into the `srcset` and `sizes` attribute values for each image:
//!
//! ```text
//! beach.jpg (2000px wide), ladder [500, 800, ..., 3200]
//!   srcset = "variants/beach-500.jpg 500w, ..., variants/beach-1800.jpg 1800w"
//!
//! hero: {480: 480px, 768: 700px, 992: 700px, 1200: 1000px, MAX: 1000px}
//!   sizes = "(max-width: 480px) 480px, (max-width: 768px) 700px,
//!            (max-width: 992px) 700px, (max-width: 1200px) 1000px, 1000px"
//! ```
//!
//! Browsers take the first `sizes` clause whose media condition matches, so
//! clauses are always emitted in ascending breakpoint order with the
//! unconditional sentinel clause last.

use crate::naming::variant_filename;
use crate::types::{
    BreakpointSet, CompiledAttributes, ElementBinding, ImageAttributes, MasterImageRecord,
    MasterRecords, MeasurementTable,
};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompileError {
    #[error("Image element '{0}' is not bound to any master image")]
    UnboundIdentifier(String),
    #[error("Image element '{id}' references '{filename}', which is not a master image")]
    MissingMasterRecord { id: String, filename: String },
}

/// Settings that shape the compiled strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Directory prefix of `srcset` entries, relative to the document.
    pub variants_dir: String,
    /// Merge adjacent `sizes` clauses that resolve to the same width.
    pub collapse: bool,
}

impl CompileOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            variants_dir: config.paths.variants.clone(),
            collapse: config.sizes.collapse,
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            variants_dir: "variants".to_string(),
            collapse: false,
        }
    }
}

/// `srcset` value for one master: every generated variant, ascending.
///
/// Empty when the master was smaller than every ladder width.
pub fn compile_srcset(record: &MasterImageRecord, variants_dir: &str) -> String {
    record
        .variant_widths
        .iter()
        .map(|&w| {
            format!(
                "{variants_dir}/{} {w}w",
                variant_filename(&record.filename, w)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `sizes` value from one row of the measurement table.
///
/// Breakpoints without a measurement are skipped. With `collapse`, a clause
/// is dropped when the next emitted clause has the same width.
pub fn compile_sizes(
    row: Option<&BTreeMap<u32, String>>,
    breakpoints: &BreakpointSet,
    collapse: bool,
) -> String {
    let measured: Vec<(bool, u32, &str)> = breakpoints
        .iter()
        .filter_map(|bp| {
            let width = row?.get(&bp.value())?;
            Some((bp.is_max(), bp.value(), width.as_str()))
        })
        .collect();

    let mut clauses = Vec::with_capacity(measured.len());
    for (i, &(is_max, value, width)) in measured.iter().enumerate() {
        if collapse && measured.get(i + 1).is_some_and(|next| next.2 == width) {
            continue;
        }
        if is_max {
            clauses.push(width.to_string());
        } else {
            clauses.push(format!("(max-width: {value}px) {width}"));
        }
    }
    clauses.join(", ")
}

/// Compile the attributes of one image element.
pub fn compile(
    id: &str,
    binding: &ElementBinding,
    records: &MasterRecords,
    table: &MeasurementTable,
    breakpoints: &BreakpointSet,
    options: &CompileOptions,
) -> Result<ImageAttributes, CompileError> {
    let filename = binding
        .get(id)
        .ok_or_else(|| CompileError::UnboundIdentifier(id.to_string()))?;
    let record = records
        .get(filename)
        .ok_or_else(|| CompileError::MissingMasterRecord {
            id: id.to_string(),
            filename: filename.clone(),
        })?;

    Ok(ImageAttributes {
        srcset: compile_srcset(record, &options.variants_dir),
        sizes: compile_sizes(table.row(id), breakpoints, options.collapse),
    })
}

/// Compile every bound element.
pub fn compile_all(
    binding: &ElementBinding,
    records: &MasterRecords,
    table: &MeasurementTable,
    breakpoints: &BreakpointSet,
    options: &CompileOptions,
) -> Result<CompiledAttributes, CompileError> {
    binding
        .keys()
        .map(|id| {
            compile(id, binding, records, table, breakpoints, options)
                .map(|attributes| (id.clone(), attributes))
        })
        .collect()
}
