//! Check command - validate configuration and module layout

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use sourcepack_core::{PipelineConfig, RepositoryConfig, config::read_package_version};
use sourcepack_generator::{assets::INCLUDES_DIR, discover_modules};

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates configuration, provenance and every source module.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and modules");

    let repo_root = std::env::current_dir().wrap_err("Failed to read working directory")?;
    let result = check_repository(&repo_root, config_path);

    // Print summary
    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

fn check_repository(repo_root: &Path, config_path: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match PipelineConfig::load(&repo_root.join(config_path)) {
        Ok(c) => {
            println!("  ✓ Configuration valid");
            c
        }
        Err(e) => {
            result.add_error(format!("Configuration error: {e}"));
            println!("  ✗ Configuration invalid: {e}");
            return result;
        }
    };

    println!("\nChecking repository settings...");
    check_repository_config(&repo_root.join(&config.paths.repository_config), &mut result);

    println!("\nChecking type definitions...");
    match read_package_version(&repo_root.join(&config.paths.types_package)) {
        Ok(version) => println!("  ✓ Types package {version}"),
        Err(e) => {
            result.add_error(format!("Types package unreadable: {e}"));
            println!("  ✗ Types package unreadable");
        }
    }

    println!("\nChecking source modules...");
    check_modules(&repo_root.join(&config.paths.source_dir), &mut result);

    result
}

/// Check the repository settings used by the catalogue page.
fn check_repository_config(path: &Path, result: &mut ValidationResult) {
    match RepositoryConfig::load(path) {
        Ok(Some(config)) => {
            if config.repository_name.is_empty() {
                result.add_warning("repositoryName is empty");
            }
            if let Some(base_url) = &config.base_url
                && !base_url.starts_with("http")
            {
                result.add_warning("baseURL should start with http:// or https://");
            }
            println!("  ✓ Repository settings valid");
        }
        Ok(None) => {
            result.add_warning(format!(
                "{} missing, the catalogue page will not be generated",
                path.display()
            ));
            println!("  ⚠ Repository settings missing");
        }
        Err(e) => {
            result.add_error(format!("Repository settings error: {e}"));
            println!("  ✗ Repository settings invalid: {e}");
        }
    }
}

/// Check that every module has an entry file and an includes folder.
fn check_modules(source_root: &Path, result: &mut ValidationResult) {
    let modules = match discover_modules(source_root) {
        Ok(modules) => modules,
        Err(e) => {
            result.add_error(format!(
                "Source directory unreadable: {}: {e}",
                source_root.display()
            ));
            println!("  ✗ {} unreadable", source_root.display());
            return;
        }
    };

    let mut checked = 0;
    for module in modules.iter().filter(|m| m.is_dir()) {
        checked += 1;

        let entry = module.path.join(format!("{}.ts", module.id));
        if !entry.is_file() {
            result.add_warning(format!(
                "[{}] no {}.ts entry, module will be skipped",
                module.id, module.id
            ));
        }

        let includes = module.path.join(INCLUDES_DIR);
        if includes.is_dir() {
            let files = walkdir::WalkDir::new(&includes)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .count();
            println!("  ✓ {} ({files} included files)", module.id);
        } else {
            result.add_warning(format!(
                "[{}] no {INCLUDES_DIR} folder, its icon cannot be published",
                module.id
            ));
            println!("  ⚠ {} (no {INCLUDES_DIR} folder)", module.id);
        }
    }

    println!("  {checked} module(s) found");
}
