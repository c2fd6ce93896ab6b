//! Shared types passed between pipeline stages.
//!
//! Every stage reads what the previous one produced and writes exactly one of
//! these values into the per-run [`RunContext`](crate::pipeline::RunContext).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A master image and the variant widths generated from it.
///
/// Created once per master by the generator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterImageRecord {
    /// File name without directory, e.g. `beach.jpg`. Unique within a run.
    pub filename: String,
    pub source_path: PathBuf,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    /// Widths actually written to the variants directory, ascending.
    pub variant_widths: BTreeSet<u32>,
}

/// Master records keyed by filename.
pub type MasterRecords = BTreeMap<String, MasterImageRecord>;

/// Image element id → master filename it displays.
pub type ElementBinding = BTreeMap<String, String>;

/// Compiled attribute values for one `<img>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttributes {
    pub srcset: String,
    pub sizes: String,
}

/// Element id → compiled attributes.
pub type CompiledAttributes = BTreeMap<String, ImageAttributes>;

/// Rendered widths per element, per breakpoint.
///
/// Columns are recorded one breakpoint at a time. A (id, breakpoint) cell is
/// written at most once; later writes for the same cell are ignored. Iteration
/// over a row is always in ascending breakpoint order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementTable {
    rows: BTreeMap<String, BTreeMap<u32, String>>,
}

impl MeasurementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one breakpoint column: element id → CSS width.
    ///
    /// Returns the number of cells actually written.
    pub fn record_column(
        &mut self,
        breakpoint: u32,
        column: impl IntoIterator<Item = (String, String)>,
    ) -> usize {
        let mut written = 0;
        for (id, width) in column {
            let row = self.rows.entry(id).or_default();
            if let std::collections::btree_map::Entry::Vacant(cell) = row.entry(breakpoint) {
                cell.insert(width);
                written += 1;
            }
        }
        written
    }

    /// Measurements for one element, ascending by breakpoint.
    pub fn row(&self, id: &str) -> Option<&BTreeMap<u32, String>> {
        self.rows.get(id)
    }

    pub fn get(&self, id: &str, breakpoint: u32) -> Option<&str> {
        self.rows
            .get(id)
            .and_then(|row| row.get(&breakpoint))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One entry of the [`BreakpointSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    /// A `(max-width: Npx)` media query threshold.
    Query(u32),
    /// The sentinel "maximum viewable" width covering everything above the
    /// last query.
    Max(u32),
}

impl Breakpoint {
    /// Key used in the measurement table and in the compiled output.
    pub fn value(self) -> u32 {
        match self {
            Breakpoint::Query(w) | Breakpoint::Max(w) => w,
        }
    }

    /// Window width used when measuring this breakpoint.
    ///
    /// The sentinel is measured one pixel below its value while still being
    /// keyed by the undecremented value.
    pub fn window_width(self) -> u32 {
        match self {
            Breakpoint::Query(w) => w,
            Breakpoint::Max(w) => w.saturating_sub(1),
        }
    }

    pub fn is_max(self) -> bool {
        matches!(self, Breakpoint::Max(_))
    }
}

/// Ascending media-query breakpoints followed by the sentinel maximum.
///
/// Ordering is validated when the configuration is loaded
/// (see [`Config::validate`](crate::config::Config::validate)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSet {
    queries: Vec<u32>,
    max_viewable: u32,
}

impl BreakpointSet {
    pub fn new(queries: Vec<u32>, max_viewable: u32) -> Self {
        Self {
            queries,
            max_viewable,
        }
    }

    /// All breakpoints in measurement order, sentinel last.
    pub fn iter(&self) -> impl Iterator<Item = Breakpoint> + '_ {
        self.queries
            .iter()
            .map(|&q| Breakpoint::Query(q))
            .chain(std::iter::once(Breakpoint::Max(self.max_viewable)))
    }

    /// Number of breakpoints, sentinel included.
    pub fn count(&self) -> usize {
        self.queries.len() + 1
    }
}
