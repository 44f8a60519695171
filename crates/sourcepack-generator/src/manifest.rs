//! Manifest aggregation.
//!
//! Extracts every bundled module's descriptor and writes the registry
//! manifest.

use std::{
    fs,
    path::{Path, PathBuf},
};

use sourcepack_core::{BuildManifest, BuiltWith, CoreError, MANIFEST_FILE, PipelineConfig};
use thiserror::Error;
use tracing::info;

use crate::{
    discovery::discover_modules,
    extractor::MetadataExtractor,
    fanout::settle_all,
    report::{ModuleFailure, Phase, Reporter},
};

/// Manifest generation errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Provenance or serialization error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Version of this toolchain recorded in every manifest.
pub const TOOLCHAIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve the provenance record for a repository.
pub fn resolve_built_with(repo_root: &Path, config: &PipelineConfig) -> Result<BuiltWith> {
    let types_package = repo_root.join(&config.paths.types_package);
    let types = sourcepack_core::config::read_package_version(&types_package)?;

    Ok(BuiltWith {
        toolchain: TOOLCHAIN_VERSION.to_string(),
        types,
    })
}

/// A written manifest and the modules left out of it.
#[derive(Debug)]
pub struct ManifestReport {
    pub manifest: BuildManifest,
    pub path: PathBuf,
    pub failures: Vec<ModuleFailure>,
}

/// Builds the registry manifest from a bundle output tree.
pub struct ManifestAggregator<'a> {
    extractor: MetadataExtractor<'a>,
    built_with: BuiltWith,
}

impl<'a> ManifestAggregator<'a> {
    #[must_use]
    pub fn new(extractor: MetadataExtractor<'a>, built_with: BuiltWith) -> Self {
        Self {
            extractor,
            built_with,
        }
    }

    /// Extract all modules under `output_root` and write the manifest there.
    pub fn generate(&self, output_root: &Path, reporter: &Reporter) -> Result<ManifestReport> {
        let modules = discover_modules(output_root)?;
        let ids: Vec<String> = modules.into_iter().map(|m| m.id).collect();

        let settled = settle_all(ids, |id| {
            let _timer = reporter.time(format!("Generating {id} Info"));
            self.extractor.extract(id, output_root)
        });

        let failures: Vec<ModuleFailure> = settled
            .failed
            .iter()
            .map(|(id, error)| reporter.failed(id, Phase::Manifest, error))
            .collect();

        let sources = settled
            .succeeded
            .into_iter()
            .filter_map(|(_, descriptor)| descriptor)
            .collect();

        let manifest = BuildManifest::new(sources, self.built_with.clone());
        let path = output_root.join(MANIFEST_FILE);
        fs::write(&path, manifest.to_json()?)?;

        info!(
            path = %path.display(),
            sources = manifest.sources.len(),
            failed = failures.len(),
            "wrote manifest"
        );

        Ok(ManifestReport {
            manifest,
            path,
            failures,
        })
    }
}
