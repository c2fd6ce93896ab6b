//! Variant filename convention.
//!
//! Every variant is named after its master with the target width inserted
//! before the extension:
//!
//! - `beach.jpg` at 500px → `beach-500.jpg`
//! - `001-dawn.png` at 1080px → `001-dawn-1080.png`
//! - `README` at 800px → `README-800` (no extension, width appended)
//!
//! The scheme is part of the output contract: `srcset` entries are built from
//! it, so [`parse_variant_filename`] must invert [`variant_filename`] exactly.

/// Name of the variant of `filename` at `width` pixels.
pub fn variant_filename(filename: &str, width: u32) -> String {
    match split_extension(filename) {
        (stem, Some(ext)) => format!("{stem}-{width}.{ext}"),
        (stem, None) => format!("{stem}-{width}"),
    }
}

/// Recover `(master filename, width)` from a variant name.
///
/// Returns `None` when the name has no trailing `-{digits}` segment.
pub fn parse_variant_filename(variant: &str) -> Option<(String, u32)> {
    let (stem, ext) = split_extension(variant);
    let dash = stem.rfind('-')?;
    let digits = &stem[dash + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let width = digits.parse().ok()?;
    let master_stem = &stem[..dash];
    let master = match ext {
        Some(ext) => format!("{master_stem}.{ext}"),
        None => master_stem.to_string(),
    };
    Some((master, width))
}

/// Strip any directory prefix from an `<img src>` value.
///
/// `images/beach.jpg` → `beach.jpg`, `/a/b/c.png` → `c.png`, `x.jpg` → `x.jpg`.
pub fn strip_path_prefix(src: &str) -> &str {
    src.rsplit('/').next().unwrap_or(src)
}

/// Split `name.ext` into `("name", Some("ext"))`.
///
/// A leading dot (`.hidden`) is part of the stem, not an extension.
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(0) | None => (filename, None),
        Some(dot) => (&filename[..dot], Some(&filename[dot + 1..])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn width_inserted_before_extension() {
        assert_eq!(variant_filename("beach.jpg", 500), "beach-500.jpg");
        assert_eq!(variant_filename("001-dawn.png", 1080), "001-dawn-1080.png");
    }

    #[test]
    fn only_last_dot_is_the_extension() {
        assert_eq!(
            variant_filename("sunset.final.jpeg", 800),
            "sunset.final-800.jpeg"
        );
    }

    #[test]
    fn no_extension_appends_width() {
        assert_eq!(variant_filename("README", 800), "README-800");
        assert_eq!(variant_filename(".hidden", 800), ".hidden-800");
    }

    #[test]
    fn extension_is_preserved() {
        for name in ["a.jpg", "b.PNG", "c.d.webp", "x-1.tiff"] {
            let ext = name.rsplit('.').next().unwrap();
            assert!(variant_filename(name, 640).ends_with(&format!(".{ext}")));
        }
    }

    #[test]
    fn parse_inverts_variant_filename() {
        for (name, width) in [
            ("beach.jpg", 500),
            ("001-dawn.png", 1080),
            ("a-1.jpg", 2400),
            ("README", 800),
        ] {
            let variant = variant_filename(name, width);
            assert_eq!(
                parse_variant_filename(&variant),
                Some((name.to_string(), width))
            );
        }
    }

    #[test]
    fn parse_rejects_names_without_width() {
        assert_eq!(parse_variant_filename("beach.jpg"), None);
        assert_eq!(parse_variant_filename("beach-.jpg"), None);
        assert_eq!(parse_variant_filename("beach-large.jpg"), None);
    }

    #[test]
    fn variant_names_are_injective() {
        let names = ["a.jpg", "a-1.jpg", "a-10.jpg", "b.jpg", "a1.jpg"];
        let widths = [1, 10, 100, 500];
        let mut seen = HashSet::new();
        for name in names {
            for width in widths {
                assert!(
                    seen.insert(variant_filename(name, width)),
                    "collision for {name} @ {width}"
                );
            }
        }
    }

    #[test]
    fn strips_directory_prefixes() {
        assert_eq!(strip_path_prefix("images/beach.jpg"), "beach.jpg");
        assert_eq!(strip_path_prefix("/a/b/c.png"), "c.png");
        assert_eq!(strip_path_prefix("x.jpg"), "x.jpg");
    }
}
