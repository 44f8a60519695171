//! Module bundling.
//!
//! Every module is bundled twice from the same entry point: `index.js` for
//! current hosts and `source.js` for hosts that still load the old file name.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
    thread,
};

use sourcepack_core::config::BundlerConfig;
use thiserror::Error;
use tracing::debug;

use crate::{
    assets::{self, AssetError},
    report::Reporter,
};

/// File name of the current bundle format.
pub const CURRENT_BUNDLE: &str = "index.js";

/// File name kept for older consumers.
pub const LEGACY_BUNDLE: &str = "source.js";

/// Bundling errors.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The bundler process could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bundler exited unsuccessfully.
    #[error("bundling {entry} exited with {status}: {stderr}")]
    Failed {
        entry: PathBuf,
        status: String,
        stderr: String,
    },

    /// Output directory could not be created.
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// One bundling job: an entry file to a standalone script.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    /// Compiled entry file.
    pub entry: &'a Path,

    /// Bundle file to write.
    pub output: &'a Path,

    /// Global name the bundle exports.
    pub standalone: &'a str,

    /// Dependencies left for the host to supply.
    pub externals: &'a [String],
}

/// Something that turns an entry file into a standalone bundle.
pub trait Bundler: Send + Sync {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<(), BundleError>;
}

/// Runs an external bundler command, `browserify` by default.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
}

impl CommandBundler {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    #[must_use]
    pub fn from_config(config: &BundlerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Arguments passed for one request.
    fn request_args(&self, request: &BundleRequest<'_>) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(request.entry.display().to_string());
        args.push("--standalone".to_string());
        args.push(request.standalone.to_string());
        for external in request.externals {
            args.push("--external".to_string());
            args.push(external.clone());
        }
        args.push("--outfile".to_string());
        args.push(request.output.display().to_string());
        args
    }
}

impl Bundler for CommandBundler {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<(), BundleError> {
        let args = self.request_args(request);
        debug!(program = %self.program, ?args, "running bundler");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| BundleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BundleError::Failed {
                entry: request.entry.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Why a module produced no bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry is a file, not a module directory.
    NotADirectory,

    /// The compiled module has no entry file; it is support code.
    MissingEntry(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotADirectory => f.write_str("not a directory"),
            Self::MissingEntry(path) => write!(f, "entry file {} does not exist", path.display()),
        }
    }
}

/// Result of bundling one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// Both bundle files were written.
    Bundled { current: PathBuf, legacy: PathBuf },

    /// Nothing was written.
    Skipped(SkipReason),
}

/// Produces both bundle formats for a module.
pub struct ModuleBundler<'a> {
    bundler: &'a dyn Bundler,
    standalone: String,
    externals: Vec<String>,
}

impl<'a> ModuleBundler<'a> {
    /// Create a module bundler with an explicit export name and externals.
    #[must_use]
    pub fn new(
        bundler: &'a dyn Bundler,
        standalone: impl Into<String>,
        externals: Vec<String>,
    ) -> Self {
        Self {
            bundler,
            standalone: standalone.into(),
            externals,
        }
    }

    /// Create from pipeline configuration.
    #[must_use]
    pub fn from_config(bundler: &'a dyn Bundler, config: &BundlerConfig) -> Self {
        Self::new(bundler, config.standalone.clone(), config.externals.clone())
    }

    /// Entry file of a compiled module: `<compiled>/<id>/<id>.js`.
    #[must_use]
    pub fn entry_path(compiled_root: &Path, module_id: &str) -> PathBuf {
        compiled_root.join(module_id).join(format!("{module_id}.js"))
    }

    /// Bundle `module_id` from `compiled_root` into `output_root/<module_id>`.
    pub fn bundle_module(
        &self,
        module_id: &str,
        compiled_root: &Path,
        output_root: &Path,
        reporter: &Reporter,
    ) -> Result<BundleOutcome, BundleError> {
        if !compiled_root.join(module_id).is_dir() {
            reporter.skipped(module_id, SkipReason::NotADirectory);
            return Ok(BundleOutcome::Skipped(SkipReason::NotADirectory));
        }

        let entry = Self::entry_path(compiled_root, module_id);
        if !entry.is_file() {
            let reason = SkipReason::MissingEntry(entry);
            reporter.skipped(module_id, &reason);
            return Ok(BundleOutcome::Skipped(reason));
        }

        let output_dir = output_root.join(module_id);
        assets::ensure_dir(&output_dir)?;

        let current = output_dir.join(CURRENT_BUNDLE);
        let legacy = output_dir.join(LEGACY_BUNDLE);

        // The legacy format gets its own thread: every pool thread may already
        // be busy with another module.
        let (current_result, legacy_result) = thread::scope(|scope| {
            let legacy_task = scope.spawn(|| self.bundle_file(&entry, &legacy));
            let current_result = self.bundle_file(&entry, &current);
            let legacy_result = legacy_task
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (current_result, legacy_result)
        });
        current_result?;
        legacy_result?;

        debug!(module = module_id, dir = %output_dir.display(), "bundled module");
        Ok(BundleOutcome::Bundled { current, legacy })
    }

    fn bundle_file(&self, entry: &Path, output: &Path) -> Result<(), BundleError> {
        self.bundler.bundle(&BundleRequest {
            entry,
            output,
            standalone: &self.standalone,
            externals: &self.externals,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use tempfile::TempDir;

    use super::*;

    /// Copies the entry and records every request it sees.
    #[derive(Default)]
    struct RecordingBundler {
        seen: Mutex<Vec<(PathBuf, String, Vec<String>)>>,
    }

    impl Bundler for RecordingBundler {
        fn bundle(&self, request: &BundleRequest<'_>) -> Result<(), BundleError> {
            fs::copy(request.entry, request.output).map_err(|e| AssetError::Io {
                path: request.entry.to_path_buf(),
                source: e,
            })?;
            self.seen.lock().unwrap().push((
                request.output.to_path_buf(),
                request.standalone.to_string(),
                request.externals.to_vec(),
            ));
            Ok(())
        }
    }

    fn compiled_module(root: &Path, id: &str) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{id}.js")), format!("exports.{id}Info = {{}};")).unwrap();
    }

    #[test]
    fn test_bundles_both_formats() {
        let compiled = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        compiled_module(compiled.path(), "alpha");

        let bundler = RecordingBundler::default();
        let module_bundler =
            ModuleBundler::new(&bundler, "Sources", vec!["axios".into(), "fs".into()]);

        let outcome = module_bundler
            .bundle_module("alpha", compiled.path(), output.path(), &Reporter::new("test"))
            .unwrap();

        assert!(matches!(outcome, BundleOutcome::Bundled { .. }));
        assert!(output.path().join("alpha").join(CURRENT_BUNDLE).is_file());
        assert!(output.path().join("alpha").join(LEGACY_BUNDLE).is_file());

        let seen = bundler.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (_, standalone, externals) in seen.iter() {
            assert_eq!(standalone, "Sources");
            assert_eq!(externals, &vec!["axios".to_string(), "fs".to_string()]);
        }
    }

    /// Sleeps inside every request and tracks how many overlap.
    #[derive(Default)]
    struct SlowBundler {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Bundler for SlowBundler {
        fn bundle(&self, request: &BundleRequest<'_>) -> Result<(), BundleError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            self.active.fetch_sub(1, Ordering::SeqCst);
            fs::write(request.output, "").unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_formats_bundle_concurrently() {
        let compiled = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        compiled_module(compiled.path(), "alpha");

        let bundler = SlowBundler::default();
        ModuleBundler::new(&bundler, "Sources", Vec::new())
            .bundle_module("alpha", compiled.path(), output.path(), &Reporter::new("test"))
            .unwrap();

        assert_eq!(bundler.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_entry_is_noop() {
        let compiled = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::create_dir(compiled.path().join("helpers")).unwrap();
        fs::write(compiled.path().join("helpers/util.js"), "").unwrap();

        let bundler = RecordingBundler::default();
        let module_bundler = ModuleBundler::new(&bundler, "Sources", Vec::new());

        let outcome = module_bundler
            .bundle_module("helpers", compiled.path(), output.path(), &Reporter::new("test"))
            .unwrap();

        assert!(matches!(
            outcome,
            BundleOutcome::Skipped(SkipReason::MissingEntry(_))
        ));
        assert!(!output.path().join("helpers").exists());
        assert!(bundler.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_file_entry_is_skipped() {
        let compiled = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(compiled.path().join("index.js"), "").unwrap();

        let bundler = RecordingBundler::default();
        let module_bundler = ModuleBundler::new(&bundler, "Sources", Vec::new());

        let outcome = module_bundler
            .bundle_module("index.js", compiled.path(), output.path(), &Reporter::new("test"))
            .unwrap();

        assert_eq!(outcome, BundleOutcome::Skipped(SkipReason::NotADirectory));
    }

    #[test]
    fn test_command_bundler_args() {
        let bundler = CommandBundler::new("npx", vec!["browserify".to_string()]);
        let externals = vec!["axios".to_string(), "fs".to_string()];
        let request = BundleRequest {
            entry: Path::new("tmp/alpha/alpha.js"),
            output: Path::new("bundles/alpha/index.js"),
            standalone: "Sources",
            externals: &externals,
        };

        assert_eq!(
            bundler.request_args(&request),
            vec![
                "browserify",
                "tmp/alpha/alpha.js",
                "--standalone",
                "Sources",
                "--external",
                "axios",
                "--external",
                "fs",
                "--outfile",
                "bundles/alpha/index.js",
            ]
        );
    }
}
