//! Bundle command - builds every module and publishes the registry

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use sourcepack_core::PipelineConfig;
use sourcepack_generator::{BuildReport, Pipeline, Reporter};

/// Run the bundle command.
///
/// Runs every pipeline phase in the current directory. Fails after all output
/// is written when any module failed.
pub fn run(config_path: &Path, folder: &str) -> Result<()> {
    let repo_root = std::env::current_dir().wrap_err("Failed to read working directory")?;
    tracing::info!(working_dir = %repo_root.display(), ?config_path, folder, "Starting bundle");

    let config = PipelineConfig::load(config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let pipeline = Pipeline::new(config, &repo_root).with_folder(folder);
    let output_root = pipeline.output_root().wrap_err("Invalid --folder")?;
    let report = pipeline
        .run(&Reporter::new("bundle"))
        .wrap_err("Build failed")?;

    print_summary(&report, &output_root);

    if !report.is_success() {
        bail!("{} module failure(s)", report.failures.len());
    }

    Ok(())
}

fn print_summary(report: &BuildReport, output: &Path) {
    println!();
    if report.is_success() {
        println!("  Build completed successfully!");
    } else {
        println!("  Build completed with failures");
    }
    println!();
    println!("  Bundled:   {}", report.bundled);
    println!("  Skipped:   {}", report.skipped);
    println!("  Sources:   {}", report.sources);
    println!("  Failed:    {}", report.failures.len());
    println!();
    println!("  Duration:  {:.2}s", report.duration_ms as f64 / 1000.0);
    println!("  Output:    {}", output.display());
    if let Some(catalogue) = &report.catalogue {
        println!("  Catalogue: {}", catalogue.display());
    }
    println!();

    for failure in &report.failures {
        println!("  ✗ {failure}");
    }
}
