use clap::{Parser, Subcommand};
use respimg::{config, output, pipeline};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "respimg")]
#[command(about = "Responsive srcset/sizes attributes measured in a real browser")]
#[command(long_about = "\
Responsive srcset/sizes attributes measured in a real browser

Resizes every master image to a ladder of widths, loads the document in
headless Chrome, measures how wide each <img> renders at a set of viewport
breakpoints and writes the document back with srcset and sizes filled in.

Site structure:

  site/
  ├── config.toml          # Optional, overrides stock defaults
  ├── index.html           # Every <img> needs a unique id
  └── images/
      ├── beach.jpg        # Master images
      └── harbor.png

  dist/
  ├── index.html           # With srcset + sizes
  ├── images/              # Verbatim master copies
  └── variants/            # beach-500.jpg, beach-800.jpg, ...

Run 'respimg gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site directory
    #[arg(long, default_value = "site", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: generate → measure → compile → inject
    Build,
    /// Show the variants each master would get without writing anything
    Plan,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Build => {
            let config = config::load_config(&cli.source)?;
            init_thread_pool(&config.processing);

            println!(
                "==> Building {} \u{2192} {}",
                cli.source.display(),
                cli.output.display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline::run(&cli.source, &cli.output, &config, Some(tx));
            printer.join().ok();
            let ctx = result?;

            if ctx.measurements.is_empty() {
                println!("==> No rendered <img> elements");
            } else {
                println!("==> Images");
                output::print_binding(&ctx.binding);
                println!("==> Measurements");
                output::print_measurements(&ctx.measurements, &ctx.binding, &config.breakpoint_set());
            }
            println!("==> Attributes");
            output::print_run_summary(&ctx);
        }
        Command::Plan => {
            let config = config::load_config(&cli.source)?;
            init_thread_pool(&config.processing);
            let planned = pipeline::plan(&cli.source, &cli.output, &config)?;
            output::print_plan(&planned, &cli.output);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down,
/// not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
