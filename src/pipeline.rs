//! End-to-end run.
//!
//! Chains the stages over one [`RunContext`]:
//!
//! ```text
//! 1. Generate   {source}/images/*   →  records        (+ masters, variants written)
//! 2. Bind       {source}/index.html →  binding        (renderer loaded, ready)
//! 3. Measure    binding × breakpoints → measurements
//! 4. Compile    records + measurements → compiled
//! 5. Inject     compiled → {output}/index.html
//! ```
//!
//! Variant generation runs before the renderer is launched, so a failed
//! resize never starts a browser. From stage 2 on the renderer is owned by a
//! [`RendererSession`] scoped to [`run_with`]; it is closed on every exit
//! path.

use crate::compile::{CompileError, CompileOptions, compile_all};
use crate::config::Config;
use crate::imaging::{ImageBackend, RustBackend};
use crate::measure::sweep;
use crate::process::{
    PlannedMaster, ProcessConfig, ProcessError, ProcessEvent, ProcessLayout, discover_masters,
    plan_masters, process_with_backend,
};
use crate::renderer::{ChromeRenderer, RenderError, Renderer, RendererSession};
use crate::types::{CompiledAttributes, ElementBinding, MasterRecords, MeasurementTable};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Variant generation failed")]
    Process(#[from] ProcessError),
    #[error("Renderer failed")]
    Render(#[from] RenderError),
    #[error("Attribute compilation failed")]
    Compile(#[from] CompileError),
    #[error("Source and output directory are the same: {0}")]
    SameRoot(PathBuf),
    #[error("Document not found: {0}")]
    DocumentNotFound(PathBuf),
}

/// State accumulated over one run. Each stage fills exactly one field.
#[derive(Debug, Default)]
pub struct RunContext {
    pub records: MasterRecords,
    pub binding: ElementBinding,
    pub measurements: MeasurementTable,
    pub compiled: CompiledAttributes,
    pub variants_written: usize,
    pub document: PathBuf,
}

/// Input and output locations derived from the two roots and the config.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub document_in: PathBuf,
    pub document_out: PathBuf,
    pub process: ProcessLayout,
}

impl RunPaths {
    pub fn new(source: &Path, output: &Path, config: &Config) -> Self {
        let paths = &config.paths;
        Self {
            document_in: source.join(&paths.document),
            document_out: output.join(&paths.document),
            process: ProcessLayout {
                images_in: source.join(&paths.images),
                images_out: output.join(&paths.images),
                variants_out: output.join(&paths.variants),
            },
        }
    }
}

/// Run the pipeline with the image-crate backend and headless Chrome.
pub fn run(
    source: &Path,
    output: &Path,
    config: &Config,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunContext, RunError> {
    run_with(
        &RustBackend::new(),
        || ChromeRenderer::launch(&config.renderer),
        source,
        output,
        config,
        events,
    )
}

/// Run the pipeline with the given backend and renderer factory.
///
/// `launch` is called once, after variant generation has succeeded.
pub fn run_with<R: Renderer>(
    backend: &impl ImageBackend,
    launch: impl FnOnce() -> Result<R, RenderError>,
    source: &Path,
    output: &Path,
    config: &Config,
    events: Option<Sender<ProcessEvent>>,
) -> Result<RunContext, RunError> {
    check_roots(source, output)?;
    let paths = RunPaths::new(source, output, config);
    if !paths.document_in.is_file() {
        return Err(RunError::DocumentNotFound(paths.document_in));
    }
    let mut ctx = RunContext {
        document: paths.document_out.clone(),
        ..RunContext::default()
    };

    let generated =
        process_with_backend(backend, &paths.process, &ProcessConfig::from_config(config), events)?;
    ctx.records = generated.records;
    ctx.variants_written = generated.variants_written;
    info!(
        "generated {} variants for {} masters",
        ctx.variants_written,
        ctx.records.len()
    );

    let mut session = RendererSession::new(launch()?, config.renderer.settle());
    session.load(&paths.document_in)?;
    session.await_ready()?;
    ctx.binding = session.bind_image_identifiers()?;
    validate_binding(&ctx.binding, &ctx.records)?;

    let breakpoints = config.breakpoint_set();
    ctx.measurements = sweep(&mut session, &breakpoints, config.renderer.probe_height)?;

    ctx.compiled = compile_all(
        &ctx.binding,
        &ctx.records,
        &ctx.measurements,
        &breakpoints,
        &CompileOptions::from_config(config),
    )?;

    let markup = session.inject_attributes_and_serialize(&ctx.compiled)?;
    session.close();

    if let Some(parent) = paths.document_out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&paths.document_out, markup)?;
    info!("wrote {}", paths.document_out.display());

    Ok(ctx)
}

/// Identify masters and plan their variants without writing anything.
pub fn plan(source: &Path, output: &Path, config: &Config) -> Result<Vec<PlannedMaster>, RunError> {
    plan_with(&RustBackend::new(), source, output, config)
}

pub fn plan_with(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &Config,
) -> Result<Vec<PlannedMaster>, RunError> {
    let paths = RunPaths::new(source, output, config);
    let masters = discover_masters(&paths.process.images_in)?;
    let planned = plan_masters(
        backend,
        &masters,
        &paths.process.variants_out,
        &ProcessConfig::from_config(config),
    )?;
    Ok(planned)
}

/// Every bound filename must name a generated master.
pub fn validate_binding(binding: &ElementBinding, records: &MasterRecords) -> Result<(), CompileError> {
    match binding.iter().find(|(_, filename)| !records.contains_key(*filename)) {
        Some((id, filename)) => Err(CompileError::MissingMasterRecord {
            id: id.clone(),
            filename: filename.clone(),
        }),
        None => Ok(()),
    }
}

/// Master copies are written under the output root, so it must not be the
/// source root.
fn check_roots(source: &Path, output: &Path) -> Result<(), RunError> {
    let source_abs = std::path::absolute(source)?;
    let output_abs = std::path::absolute(output)?;
    if source_abs == output_abs {
        return Err(RunError::SameRoot(source_abs));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{FakeRenderer, RendererCall, img, resize_to_measure_gaps};
    use std::time::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn site(images: &[&str]) -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("site");
        let output = tmp.path().join("dist");
        fs::create_dir_all(source.join("images")).unwrap();
        fs::write(source.join("index.html"), "<html></html>").unwrap();
        for name in images {
            fs::write(source.join("images").join(name), b"master").unwrap();
        }
        (tmp, source, output)
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.renderer.settle_ms = 0;
        config
    }

    fn backend() -> MockBackend {
        MockBackend::with_dimensions(&[("beach.jpg", 2000, 1333), ("harbor.png", 900, 600)])
    }

    #[test]
    fn full_run_with_fakes() {
        let (_tmp, source, output) = site(&["beach.jpg", "harbor.png"]);
        let fake = FakeRenderer::new(vec![
            img("hero", "images/beach.jpg"),
            img("side", "images/harbor.png"),
        ]);
        let log = fake.calls();

        let ctx = run_with(
            &backend(),
            move || Ok(fake),
            &source,
            &output,
            &quiet_config(),
            None,
        )
        .unwrap();

        assert_eq!(ctx.binding["hero"], "beach.jpg");
        assert_eq!(ctx.variants_written, 5 + 2);
        assert!(
            ctx.compiled["hero"]
                .srcset
                .starts_with("variants/beach-500.jpg 500w")
        );
        assert_eq!(
            ctx.compiled["side"].srcset,
            "variants/harbor-500.png 500w, variants/harbor-800.png 800w"
        );
        assert_eq!(
            ctx.compiled["hero"].sizes,
            "(max-width: 480px) 480px, (max-width: 768px) 768px, \
             (max-width: 992px) 992px, (max-width: 1200px) 1000px, 1000px"
        );

        let written = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(written.contains(r#"id="hero""#));
        assert!(written.contains("srcset=\"variants/beach-500.jpg 500w"));
        assert!(output.join("images/beach.jpg").exists());
        assert_eq!(log.lock().unwrap().last(), Some(&RendererCall::Close));
    }

    #[test]
    fn configured_settle_precedes_every_measurement() {
        let (_tmp, source, output) = site(&["beach.jpg"]);
        let fake = FakeRenderer::new(vec![img("hero", "images/beach.jpg")]);
        let timeline = fake.timeline();
        let mut config = quiet_config();
        config.renderer.settle_ms = 20;

        run_with(&backend(), move || Ok(fake), &source, &output, &config, None).unwrap();

        let gaps = resize_to_measure_gaps(&timeline.lock().unwrap());
        assert_eq!(gaps.len(), config.breakpoint_set().count());
        for gap in gaps {
            assert!(gap >= Duration::from_millis(20), "measured {gap:?} after resize");
        }
    }

    #[test]
    fn renderer_not_launched_when_generation_fails() {
        let (_tmp, source, output) = site(&["beach.jpg"]);
        let mut backend = backend();
        backend.fail_width = Some(800);

        let mut launched = false;
        let result = run_with(
            &backend,
            || {
                launched = true;
                Ok(FakeRenderer::new(vec![]))
            },
            &source,
            &output,
            &quiet_config(),
            None,
        );
        assert!(matches!(result, Err(RunError::Process(_))));
        assert!(!launched);
        assert!(!output.join("index.html").exists());
    }

    #[test]
    fn dangling_image_reference_fails_before_measuring() {
        let (_tmp, source, output) = site(&["beach.jpg"]);
        let fake = FakeRenderer::new(vec![
            img("hero", "images/beach.jpg"),
            img("ghost", "images/missing.jpg"),
        ]);
        let log = fake.calls();

        let result = run_with(
            &backend(),
            move || Ok(fake),
            &source,
            &output,
            &quiet_config(),
            None,
        );
        assert!(matches!(
            result,
            Err(RunError::Compile(CompileError::MissingMasterRecord { ref filename, .. }))
                if filename == "missing.jpg"
        ));

        let calls = log.lock().unwrap().clone();
        assert!(!calls.contains(&RendererCall::Measure));
        assert_eq!(calls.last(), Some(&RendererCall::Close));
    }

    #[test]
    fn measurement_timeout_aborts_without_output() {
        let (_tmp, source, output) = site(&["beach.jpg"]);
        let mut fake = FakeRenderer::new(vec![img("hero", "images/beach.jpg")]);
        fake.timeout_at_width = Some(992);

        let result = run_with(
            &backend(),
            move || Ok(fake),
            &source,
            &output,
            &quiet_config(),
            None,
        );
        assert!(matches!(result, Err(RunError::Render(RenderError::Timeout(_)))));
        assert!(!output.join("index.html").exists());
    }

    #[test]
    fn same_root_rejected() {
        let (_tmp, source, _) = site(&["beach.jpg"]);
        let result = run_with(
            &backend(),
            || Ok(FakeRenderer::new(vec![])),
            &source,
            &source,
            &quiet_config(),
            None,
        );
        assert!(matches!(result, Err(RunError::SameRoot(_))));
    }

    #[test]
    fn missing_document_rejected() {
        let (_tmp, source, output) = site(&["beach.jpg"]);
        fs::remove_file(source.join("index.html")).unwrap();
        let result = run_with(
            &backend(),
            || Ok(FakeRenderer::new(vec![])),
            &source,
            &output,
            &quiet_config(),
            None,
        );
        assert!(matches!(result, Err(RunError::DocumentNotFound(_))));
    }

    #[test]
    fn plan_writes_nothing() {
        let (_tmp, source, output) = site(&["beach.jpg", "harbor.png"]);
        let planned = plan_with(&backend(), &source, &output, &quiet_config()).unwrap();

        let widths: Vec<(String, usize)> = planned
            .iter()
            .map(|m| (m.record.filename.clone(), m.jobs.len()))
            .collect();
        assert_eq!(
            widths,
            vec![("beach.jpg".to_string(), 5), ("harbor.png".to_string(), 2)]
        );
        assert!(!output.exists());
    }

    #[test]
    fn validate_binding_accepts_known_masters() {
        let binding = ElementBinding::from([("hero".to_string(), "beach.jpg".to_string())]);
        let mut records = MasterRecords::new();
        assert!(validate_binding(&binding, &records).is_err());

        records.insert(
            "beach.jpg".into(),
            crate::types::MasterImageRecord {
                filename: "beach.jpg".into(),
                source_path: PathBuf::from("site/images/beach.jpg"),
                byte_size: 6,
                width: 2000,
                height: 1333,
                variant_widths: Default::default(),
            },
        );
        assert!(validate_binding(&binding, &records).is_ok());
    }
}
