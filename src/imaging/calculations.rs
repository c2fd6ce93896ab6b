//! Pure calculation functions for variant planning.
//!
//! All functions here are pure and testable without any I/O or images.

/// Select the ladder widths to generate for a master `master_width` pixels wide.
///
/// Keeps every ladder width strictly less than the master (variants are never
/// upscaled, and a variant as wide as the master would duplicate it). Ladder
/// order is preserved; the ladder is validated ascending at config load.
///
/// An empty result is valid: the master is smaller than every candidate and
/// only the master itself will be served.
///
/// # Examples
/// ```
/// # use respimg::imaging::plan_variant_widths;
/// let ladder = [500, 800, 1080, 1400, 1800, 2400, 3200];
/// assert_eq!(plan_variant_widths(2000, &ladder), vec![500, 800, 1080, 1400, 1800]);
/// assert!(plan_variant_widths(400, &ladder).is_empty());
/// ```
pub fn plan_variant_widths(master_width: u32, ladder: &[u32]) -> Vec<u32> {
    ladder
        .iter()
        .copied()
        .filter(|&width| width < master_width)
        .collect()
}

/// Height of a `target_width` variant that keeps the master's aspect ratio.
///
/// Never returns zero, so very wide panoramas still produce a 1px-tall image.
pub fn scaled_height(original: (u32, u32), target_width: u32) -> u32 {
    let (orig_w, orig_h) = original;
    if orig_w == 0 {
        return orig_h.max(1);
    }
    let h = (orig_h as f64 * target_width as f64 / orig_w as f64).round() as u32;
    h.max(1)
}
