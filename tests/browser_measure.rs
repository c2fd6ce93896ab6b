//! Full runs against headless Chrome.
//!
//! Needs a Chrome or Chromium binary on the machine.
//!
//! Run with: `cargo test --test browser_measure -- --ignored`

use respimg::config::Config;
use respimg::pipeline::{RunError, run};
use respimg::renderer::RenderError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DOCUMENT: &str = r#"<!DOCTYPE html>
<html>
<head>
<style>
  body { margin: 0; }
  #hero { display: block; width: 100%; max-width: 1000px; }
  #mobile { display: block; width: 50vw; }
  @media (min-width: 769px) { #mobile { display: none; } }
</style>
</head>
<body>
  <img id="hero" src="images/beach.jpg" alt="">
  <img id="mobile" src="images/harbor.png" alt="">
</body>
</html>
"#;

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn write_image(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 160])
    });
    img.save(path).unwrap();
}

fn site(document: &str) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("site");
    let output = tmp.path().join("dist");
    fs::create_dir_all(source.join("images")).unwrap();
    fs::write(source.join("index.html"), document).unwrap();
    write_image(&source.join("images/beach.jpg"), 1200, 600);
    write_image(&source.join("images/harbor.png"), 600, 400);
    (tmp, source, output)
}

fn config() -> Config {
    let mut config = Config::default();
    config.images.widths = vec![300, 500, 800];
    config.renderer.script_timeout_secs = 10;
    config
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn measures_rendered_widths() {
    let (_tmp, source, output) = site(DOCUMENT);
    let ctx = run(&source, &output, &config(), None).expect("run failed");

    let hero = &ctx.compiled["hero"];
    assert_eq!(
        hero.srcset,
        "variants/beach-300.jpg 300w, variants/beach-500.jpg 500w, variants/beach-800.jpg 800w"
    );
    assert!(hero.sizes.starts_with("(max-width: 480px) "), "{}", hero.sizes);
    assert!(hero.sizes.ends_with(", 1000px"), "{}", hero.sizes);

    // Hidden above 768px, so only the narrow breakpoints have a clause
    let mobile = &ctx.compiled["mobile"];
    assert!(mobile.sizes.contains("(max-width: 480px)"), "{}", mobile.sizes);
    assert!(!mobile.sizes.contains("(max-width: 1200px)"), "{}", mobile.sizes);

    let written = fs::read_to_string(output.join("index.html")).unwrap();
    assert!(written.starts_with("<!DOCTYPE html>"));
    assert!(written.contains(r#"srcset="variants/beach-300.jpg 300w"#));
    assert!(written.contains("sizes=\""));
}

#[test]
#[ignore]
fn measuring_leaves_page_overflow_untouched() {
    let document = DOCUMENT.replace("<html>", r#"<html style="overflow: scroll">"#);
    let (_tmp, source, output) = site(&document);
    run(&source, &output, &config(), None).expect("run failed");

    let written = fs::read_to_string(output.join("index.html")).unwrap();
    assert!(written.contains(r#"style="overflow: scroll;""#), "{written}");
}

#[test]
#[ignore]
fn image_without_id_fails_binding() {
    let document = DOCUMENT.replace(r#"<img id="mobile""#, "<img");
    let (_tmp, source, output) = site(&document);

    let result = run(&source, &output, &config(), None);
    assert!(
        matches!(result, Err(RunError::Render(RenderError::Binding(_)))),
        "{result:?}"
    );
    assert!(!output.join("index.html").exists());
}
