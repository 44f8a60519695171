//! Build orchestration.
//!
//! Runs the pipeline phases in order: compile, bundle, manifest, catalogue.
//! Each phase finishes completely before the next one starts.

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use sourcepack_core::{BuiltWith, CoreError, PipelineConfig, RepositoryConfig};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::{
    assets::{self, AssetError, EXTERNAL_DIR, INCLUDES_DIR},
    bundler::{BundleError, BundleOutcome, Bundler, CommandBundler, ModuleBundler},
    catalogue::{Catalogue, CatalogueError, CatalogueRenderer, GITHUB_REPOSITORY_ENV},
    compiler::{CommandCompiler, CompileError, Compiler, compile_into},
    discovery::discover_modules,
    extractor::MetadataExtractor,
    fanout::settle_all,
    loader::{DescriptorLoader, NodeDescriptorLoader},
    manifest::{ManifestAggregator, ManifestError, ManifestReport, resolve_built_with},
    report::{ModuleFailure, Phase, Reporter},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compiler error.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Manifest error.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Catalogue error.
    #[error("catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] CoreError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors a single module can hit while bundling.
#[derive(Debug, Error)]
pub enum ModuleBuildError {
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Outcome of the bundle phase.
#[derive(Debug, Default)]
pub struct BundleReport {
    /// Modules that produced both bundle files.
    pub bundled: Vec<String>,

    /// Entries left out on purpose.
    pub skipped: Vec<String>,

    /// Modules that failed.
    pub failures: Vec<ModuleFailure>,
}

/// Summary of a full pipeline run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Modules bundled.
    pub bundled: usize,

    /// Entries skipped during bundling.
    pub skipped: usize,

    /// Modules listed in the manifest.
    pub sources: usize,

    /// Written manifest.
    pub manifest: Option<PathBuf>,

    /// Written catalogue, when a repository config exists.
    pub catalogue: Option<PathBuf>,

    /// Every module failure from every phase.
    pub failures: Vec<ModuleFailure>,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildReport {
    /// Whether every module built cleanly.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the pipeline for one repository.
pub struct Pipeline {
    config: PipelineConfig,
    repo_root: PathBuf,
    folder: String,
    compiler: Box<dyn Compiler>,
    bundler: Box<dyn Bundler>,
    loader: Box<dyn DescriptorLoader>,
    env_repository: Option<String>,
    built_with: Option<BuiltWith>,
    keep_compiled: bool,
}

impl Pipeline {
    /// Create a pipeline using the configured external commands.
    #[must_use]
    pub fn new(config: PipelineConfig, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            compiler: Box::new(CommandCompiler::from_config(&config.compiler)),
            bundler: Box::new(CommandBundler::from_config(&config.bundler)),
            loader: Box::new(NodeDescriptorLoader::from_config(&config.loader)),
            env_repository: std::env::var(GITHUB_REPOSITORY_ENV).ok(),
            config,
            repo_root: repo_root.into(),
            folder: String::new(),
            built_with: None,
            keep_compiled: false,
        }
    }

    /// Publish into a subfolder of the output directory.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    #[must_use]
    pub fn with_bundler(mut self, bundler: impl Bundler + 'static) -> Self {
        self.bundler = Box::new(bundler);
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: impl DescriptorLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Override the CI `owner/repo` value read from the environment.
    #[must_use]
    pub fn with_env_repository(mut self, value: Option<String>) -> Self {
        self.env_repository = value;
        self
    }

    /// Use a fixed provenance record instead of reading it from the repository.
    #[must_use]
    pub fn with_built_with(mut self, built_with: BuiltWith) -> Self {
        self.built_with = Some(built_with);
        self
    }

    /// Leave the intermediate compiled tree in place after bundling.
    #[must_use]
    pub fn keep_compiled(mut self, keep: bool) -> Self {
        self.keep_compiled = keep;
        self
    }

    fn source_root(&self) -> PathBuf {
        self.repo_root.join(&self.config.paths.source_dir)
    }

    fn compiled_root(&self) -> PathBuf {
        self.repo_root.join(&self.config.paths.compiled_dir)
    }

    /// Root the bundles, manifest and catalogue are written to.
    ///
    /// Fails when the subfolder would leave the output directory.
    pub fn output_root(&self) -> Result<PathBuf> {
        Ok(self.config.output_root(&self.repo_root, &self.folder)?)
    }

    /// Execute every phase.
    pub fn run(&self, reporter: &Reporter) -> Result<BuildReport> {
        let start = Instant::now();
        let execution = reporter.time("Execution time");
        let mut report = BuildReport::default();

        // Nothing is deleted until the layout is known to be safe.
        self.config.validate()?;
        let output_root = self.output_root()?;

        info!(
            repo = %self.repo_root.display(),
            output = %output_root.display(),
            "starting build"
        );

        // 1. Compile
        self.compile(&reporter.child("compile"))?;

        // 2. Bundle
        let bundles = self.bundle_modules(&reporter.child("bundle"))?;
        report.bundled = bundles.bundled.len();
        report.skipped = bundles.skipped.len();
        report.failures.extend(bundles.failures);

        if !self.keep_compiled {
            assets::remove_dir(&self.compiled_root())?;
        }

        // 3. Manifest
        let manifest = self.generate_manifest(&reporter.child("manifest"))?;
        report.sources = manifest.manifest.sources.len();
        report.failures.extend(manifest.failures.iter().cloned());
        report.manifest = Some(manifest.path.clone());

        // 4. Catalogue
        report.catalogue = self.generate_catalogue(&manifest, &reporter.child("catalogue"))?;

        drop(execution);
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            bundled = report.bundled,
            skipped = report.skipped,
            sources = report.sources,
            failed = report.failures.len(),
            duration_ms = report.duration_ms,
            "build complete"
        );

        Ok(report)
    }

    /// Compile module sources into the intermediate tree.
    pub fn compile(&self, reporter: &Reporter) -> Result<()> {
        let _timer = reporter.time("Transpiling project");
        compile_into(self.compiler.as_ref(), &self.repo_root, &self.compiled_root())?;
        Ok(())
    }

    /// Bundle every compiled module into a freshly emptied output root.
    pub fn bundle_modules(&self, reporter: &Reporter) -> Result<BundleReport> {
        let _timer = reporter.time("Bundle time");
        let output_root = self.output_root()?;
        let compiled_root = self.compiled_root();
        let source_root = self.source_root();

        debug!(dir = %output_root.display(), "cleaning output directory");
        assets::remove_dir(&output_root)?;
        assets::ensure_dir(&output_root)?;

        let modules = discover_modules(&compiled_root)?;
        let ids: Vec<String> = modules.into_iter().map(|m| m.id).collect();
        let module_bundler =
            ModuleBundler::from_config(self.bundler.as_ref(), &self.config.bundler);

        let settled = settle_all(ids, |id| {
            let _span = info_span!("module", id = %id).entered();
            let _timer = reporter.time(format!("Building {id}"));

            let build = || -> std::result::Result<BundleOutcome, ModuleBuildError> {
                if compiled_root.join(id).is_dir() {
                    let external = source_root.join(id).join(EXTERNAL_DIR);
                    assets::copy_folder(&external, &compiled_root.join(id))?;
                }

                let outcome =
                    module_bundler.bundle_module(id, &compiled_root, &output_root, reporter)?;

                if matches!(outcome, BundleOutcome::Bundled { .. }) {
                    let includes = source_root.join(id).join(INCLUDES_DIR);
                    assets::copy_folder(&includes, &output_root.join(id))?;
                }

                Ok(outcome)
            };

            let result = build();
            if result.is_err() {
                // A failed module publishes nothing, not even a partial bundle.
                if let Err(e) = assets::remove_dir(&output_root.join(id)) {
                    warn!(module = %id, error = %e, "failed to discard partial output");
                }
            }
            result
        });

        let mut bundle_report = BundleReport::default();
        for (id, outcome) in settled.succeeded {
            match outcome {
                BundleOutcome::Bundled { .. } => bundle_report.bundled.push(id),
                BundleOutcome::Skipped(_) => bundle_report.skipped.push(id),
            }
        }
        for (id, error) in &settled.failed {
            bundle_report
                .failures
                .push(reporter.failed(id, Phase::Bundle, error));
        }

        info!(
            bundled = bundle_report.bundled.len(),
            skipped = bundle_report.skipped.len(),
            failed = bundle_report.failures.len(),
            "bundling complete"
        );

        Ok(bundle_report)
    }

    /// Extract descriptors from the output root and write the manifest.
    pub fn generate_manifest(&self, reporter: &Reporter) -> Result<ManifestReport> {
        let _timer = reporter.time("Versioning File");

        let built_with = match &self.built_with {
            Some(built_with) => built_with.clone(),
            None => resolve_built_with(&self.repo_root, &self.config)?,
        };

        let aggregator =
            ManifestAggregator::new(MetadataExtractor::new(self.loader.as_ref()), built_with);
        Ok(aggregator.generate(&self.output_root()?, reporter)?)
    }

    /// Render the catalogue page when the repository has a configuration file.
    pub fn generate_catalogue(
        &self,
        manifest: &ManifestReport,
        reporter: &Reporter,
    ) -> Result<Option<PathBuf>> {
        let config_path = self.repo_root.join(&self.config.paths.repository_config);
        let Some(config) = RepositoryConfig::load(&config_path)? else {
            info!(
                path = %config_path.display(),
                "no repository config, skipping catalogue"
            );
            return Ok(None);
        };

        let _timer = reporter.time("Homepage Generation");
        let catalogue = Catalogue::build(
            &config,
            &manifest.manifest,
            self.env_repository.as_deref(),
            &self.folder,
            reporter,
        );
        let path = CatalogueRenderer::new()?.write(&catalogue, &self.output_root()?)?;
        Ok(Some(path))
    }

    /// Repository root the pipeline runs in.
    #[must_use]
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sourcepack_core::{ContentRating, SourceInfo};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        bundler::{BundleRequest, CURRENT_BUNDLE, LEGACY_BUNDLE},
        loader::LoadError,
    };

    /// Mirrors `src/<id>/<id>.ts` to `<out>/<id>/<id>.js`.
    struct CopyCompiler;

    impl Compiler for CopyCompiler {
        fn compile(
            &self,
            repo_root: &Path,
            out_dir: &Path,
        ) -> std::result::Result<(), CompileError> {
            for entry in fs::read_dir(repo_root.join("src")).unwrap() {
                let path = entry.unwrap().path();
                let id = path.file_name().unwrap().to_string_lossy().to_string();
                let source = path.join(format!("{id}.ts"));
                if source.is_file() {
                    fs::create_dir_all(out_dir.join(&id)).unwrap();
                    fs::copy(&source, out_dir.join(&id).join(format!("{id}.js"))).unwrap();
                }
            }
            Ok(())
        }
    }

    struct CopyBundler;

    impl Bundler for CopyBundler {
        fn bundle(&self, request: &BundleRequest<'_>) -> std::result::Result<(), BundleError> {
            let body = fs::read_to_string(request.entry).unwrap();
            if body.contains("syntax error") {
                return Err(BundleError::Failed {
                    entry: request.entry.to_path_buf(),
                    status: "exit status: 1".to_string(),
                    stderr: "unexpected token".to_string(),
                });
            }
            fs::write(request.output, format!("/* {} */\n{body}", request.standalone)).unwrap();
            Ok(())
        }
    }

    struct NameLoader;

    impl DescriptorLoader for NameLoader {
        fn describe(
            &self,
            module_id: &str,
            _module_dir: &Path,
        ) -> std::result::Result<SourceInfo, LoadError> {
            Ok(SourceInfo {
                name: module_id.to_string(),
                author: "author".to_string(),
                description: String::new(),
                author_website: None,
                content_rating: ContentRating::Everyone,
                version: "1.0.0".to_string(),
                icon: "icon.png".to_string(),
                source_tags: Vec::new(),
                website_base_url: String::new(),
                intents: None,
            })
        }
    }

    fn source_module(repo: &Path, id: &str, body: &str) {
        let dir = repo.join("src").join(id);
        fs::create_dir_all(dir.join(INCLUDES_DIR)).unwrap();
        fs::write(dir.join(format!("{id}.ts")), body).unwrap();
        fs::write(dir.join(INCLUDES_DIR).join("icon.png"), b"png").unwrap();
    }

    fn pipeline(repo: &Path) -> Pipeline {
        Pipeline::new(PipelineConfig::default(), repo)
            .with_compiler(CopyCompiler)
            .with_bundler(CopyBundler)
            .with_loader(NameLoader)
            .with_env_repository(None)
            .with_built_with(BuiltWith {
                toolchain: "0.1.0".to_string(),
                types: "0.8.2".to_string(),
            })
    }

    #[test]
    fn test_build_without_repository_config() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");

        let report = pipeline(repo.path()).run(&Reporter::new("build")).unwrap();

        let output = repo.path().join("bundles");
        assert!(report.is_success());
        assert_eq!(report.bundled, 1);
        assert_eq!(report.sources, 1);
        assert!(report.catalogue.is_none());
        assert!(output.join("alpha").join(CURRENT_BUNDLE).is_file());
        assert!(output.join("alpha").join(LEGACY_BUNDLE).is_file());
        assert!(output.join("alpha/includes/icon.png").is_file());
        assert!(!output.join("index.html").exists());
        assert!(!repo.path().join("tmp").exists());
    }

    #[test]
    fn test_bundle_failure_is_isolated() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");
        source_module(repo.path(), "broken", "syntax error");
        source_module(repo.path(), "gamma", "exports.gamma = 1;");

        let report = pipeline(repo.path()).run(&Reporter::new("build")).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.bundled, 2);
        assert_eq!(report.sources, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].module, "broken");
        assert_eq!(report.failures[0].phase, Phase::Bundle);
        assert!(repo.path().join("bundles/gamma/index.js").is_file());
        assert!(!repo.path().join("bundles/broken").exists());
    }

    #[test]
    fn test_external_folder_reaches_compiled_tree() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");
        let external = repo.path().join("src/alpha").join(EXTERNAL_DIR);
        fs::create_dir_all(&external).unwrap();
        fs::write(external.join("vendor.js"), "vendor").unwrap();

        let pipeline = pipeline(repo.path()).keep_compiled(true);
        pipeline.run(&Reporter::new("build")).unwrap();

        assert!(repo.path().join("tmp/alpha/external/vendor.js").is_file());
        assert!(!repo.path().join("bundles/alpha/external").exists());
    }

    #[test]
    fn test_stale_output_removed() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");
        fs::create_dir_all(repo.path().join("bundles/removed")).unwrap();

        pipeline(repo.path()).run(&Reporter::new("build")).unwrap();

        assert!(!repo.path().join("bundles/removed").exists());
    }

    #[test]
    fn test_folder_output() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");

        let pipeline = pipeline(repo.path()).with_folder("0.8");
        pipeline.run(&Reporter::new("build")).unwrap();

        assert_eq!(pipeline.output_root().unwrap(), repo.path().join("bundles/0.8"));
        assert!(repo.path().join("bundles/0.8/versioning.json").is_file());
    }

    #[test]
    fn test_folder_outside_output_is_rejected() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("keep.txt"), "keep").unwrap();

        let folders = [
            elsewhere.path().to_string_lossy().to_string(),
            "../src".to_string(),
        ];
        for folder in folders {
            let result = pipeline(repo.path())
                .with_folder(folder.as_str())
                .run(&Reporter::new("build"));
            assert!(matches!(result, Err(BuildError::Config(_))), "{folder}");
        }

        assert!(elsewhere.path().join("keep.txt").is_file());
        assert!(repo.path().join("src/alpha/alpha.ts").is_file());
        assert!(!repo.path().join("bundles").exists());
    }

    #[test]
    fn test_overlapping_dirs_are_rejected_before_compiling() {
        let repo = TempDir::new().unwrap();
        source_module(repo.path(), "alpha", "exports.alpha = 1;");

        let mut config = PipelineConfig::default();
        config.paths.compiled_dir = "src".into();
        let result = Pipeline::new(config, repo.path())
            .with_compiler(CopyCompiler)
            .with_bundler(CopyBundler)
            .with_loader(NameLoader)
            .run(&Reporter::new("build"));

        assert!(matches!(result, Err(BuildError::Config(_))));
        assert!(repo.path().join("src/alpha/alpha.ts").is_file());
    }
}
