//! Run configuration.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the source root next to the document and is optional: stock defaults are
//! used for anything it does not set.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! document = "index.html"   # Document to measure, relative to the source root
//! images = "images"         # Master images directory (input and output)
//! variants = "variants"     # Resized variants directory (output only)
//!
//! [images]
//! widths = [500, 800, 1080, 1400, 1800, 2400, 3200]  # Candidate variant widths
//! quality = 90              # JPEG quality (1-100)
//!
//! [breakpoints]
//! queries = [480, 768, 992, 1200]  # (max-width: Npx) thresholds
//! max_viewable = 1920       # Sentinel for the range above the last query
//!
//! [renderer]
//! settle_ms = 100           # Wait after each viewport resize
//! probe_height = 1080       # Viewport height while measuring
//! script_timeout_secs = 60  # Upper bound for every in-page script
//! # chrome_path = "/usr/bin/chromium"
//!
//! [sizes]
//! collapse = false          # Merge adjacent breakpoints with equal widths
//!
//! [processing]
//! max_processes = 4         # Max parallel resize workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::BreakpointSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file looked up in the source root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
///
/// All fields have defaults; user files only override what they need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Input/output directory and file names.
    pub paths: PathsConfig,
    /// Variant width ladder and encoding quality.
    pub images: ImagesConfig,
    /// Media-query breakpoints and the sentinel maximum.
    pub breakpoints: BreakpointsConfig,
    /// Browser timing and viewport settings.
    pub renderer: RendererConfig,
    /// `sizes` attribute compilation options.
    pub sizes: SizesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    ///
    /// Ladder and breakpoint ordering is enforced here so the planner and the
    /// sweep can assume well-formed input.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.widths must not be empty".into(),
            ));
        }
        if self.images.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "images.widths values must be non-zero".into(),
            ));
        }
        if !strictly_ascending(&self.images.widths) {
            return Err(ConfigError::Validation(
                "images.widths must be strictly ascending".into(),
            ));
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.breakpoints.queries.contains(&0) {
            return Err(ConfigError::Validation(
                "breakpoints.queries values must be non-zero".into(),
            ));
        }
        if !strictly_ascending(&self.breakpoints.queries) {
            return Err(ConfigError::Validation(
                "breakpoints.queries must be strictly ascending".into(),
            ));
        }
        let last_query = self.breakpoints.queries.last().copied().unwrap_or(0);
        if self.breakpoints.max_viewable <= last_query.max(1) {
            return Err(ConfigError::Validation(
                "breakpoints.max_viewable must be greater than the last query".into(),
            ));
        }
        if self.renderer.probe_height == 0 {
            return Err(ConfigError::Validation(
                "renderer.probe_height must be non-zero".into(),
            ));
        }
        if self.renderer.script_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "renderer.script_timeout_secs must be non-zero".into(),
            ));
        }
        for (key, value) in [
            ("paths.document", &self.paths.document),
            ("paths.images", &self.paths.images),
            ("paths.variants", &self.paths.variants),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.paths.images == self.paths.variants {
            return Err(ConfigError::Validation(
                "paths.images and paths.variants must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn breakpoint_set(&self) -> BreakpointSet {
        BreakpointSet::new(
            self.breakpoints.queries.clone(),
            self.breakpoints.max_viewable,
        )
    }
}

fn strictly_ascending(values: &[u32]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Directory and file names, relative to the source and output roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub document: String,
    pub images: String,
    pub variants: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            document: "index.html".to_string(),
            images: "images".to_string(),
            variants: "variants".to_string(),
        }
    }
}

/// Variant generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Candidate variant widths, ascending. Only widths below the master's
    /// own width are generated.
    pub widths: Vec<u32>,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            widths: vec![500, 800, 1080, 1400, 1800, 2400, 3200],
            quality: 90,
        }
    }
}

/// Viewport widths at which rendered image widths are sampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakpointsConfig {
    /// `(max-width: Npx)` thresholds, ascending.
    pub queries: Vec<u32>,
    /// Sentinel width standing for "above every query".
    pub max_viewable: u32,
}

impl Default for BreakpointsConfig {
    fn default() -> Self {
        Self {
            queries: vec![480, 768, 992, 1200],
            max_viewable: 1920,
        }
    }
}

/// Browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Milliseconds to wait after a viewport resize before measuring.
    pub settle_ms: u64,
    /// Viewport height used for every measurement.
    pub probe_height: u32,
    /// Upper bound for every script executed in the page.
    pub script_timeout_secs: u64,
    /// Chrome/Chromium binary. Auto-detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
}

impl RendererConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            settle_ms: 100,
            probe_height: 1080,
            script_timeout_secs: 60,
            chrome_path: None,
        }
    }
}

/// `sizes` compilation options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizesConfig {
    /// Merge adjacent breakpoints whose measured widths are identical.
    pub collapse: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel resize workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given source root.
pub fn load_config(root: &Path) -> Result<Config, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# respimg configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Place this file as config.toml in the source root.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the source and output roots)
# ---------------------------------------------------------------------------
[paths]
# HTML document whose <img> elements receive srcset/sizes.
document = "index.html"

# Master images. Copied verbatim to the same directory in the output.
images = "images"

# Resized variants, named {basename}-{width}{ext}. Output only.
variants = "variants"

# ---------------------------------------------------------------------------
# Variant generation
# ---------------------------------------------------------------------------
[images]
# Candidate widths, strictly ascending. A master only gets the widths
# strictly smaller than its own width (never upscaled).
widths = [500, 800, 1080, 1400, 1800, 2400, 3200]

# JPEG quality for JPEG variants (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Breakpoints
# ---------------------------------------------------------------------------
[breakpoints]
# (max-width: Npx) thresholds, strictly ascending.
queries = [480, 768, 992, 1200]

# Sentinel covering every viewport above the last query.
# Emitted as the unconditional last entry of sizes.
max_viewable = 1920

# ---------------------------------------------------------------------------
# Renderer (headless Chrome)
# ---------------------------------------------------------------------------
[renderer]
# Milliseconds to let layout re-flow after each viewport resize.
settle_ms = 100

# Viewport height used while measuring.
probe_height = 1080

# Upper bound for every script run in the page.
script_timeout_secs = 60

# Chrome/Chromium binary. Auto-detected when omitted.
# chrome_path = "/usr/bin/chromium"

# ---------------------------------------------------------------------------
# sizes attribute
# ---------------------------------------------------------------------------
[sizes]
# Merge adjacent breakpoints whose measured widths are identical.
collapse = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel resize workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
