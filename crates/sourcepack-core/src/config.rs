//! Pipeline and repository configuration.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for the build pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External compiler invocation.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// External bundler invocation.
    #[serde(default)]
    pub bundler: BundlerConfig,

    /// Descriptor loader invocation.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Repository-relative paths used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Module sources, one subdirectory per module.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Intermediate tree written by the compiler.
    #[serde(default = "default_compiled_dir")]
    pub compiled_dir: PathBuf,

    /// Root of the published output.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Repository configuration document.
    #[serde(default = "default_repository_config")]
    pub repository_config: PathBuf,

    /// `package.json` of the shared type definitions, read for provenance.
    #[serde(default = "default_types_package")]
    pub types_package: PathBuf,
}

/// Compiler command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Program to execute.
    #[serde(default = "default_npx")]
    pub program: String,

    /// Leading arguments; `--outDir <compiled_dir>` is appended.
    #[serde(default = "default_compiler_args")]
    pub args: Vec<String>,
}

/// Bundler command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlerConfig {
    /// Program to execute.
    #[serde(default = "default_npx")]
    pub program: String,

    /// Leading arguments placed before the entry file.
    #[serde(default = "default_bundler_args")]
    pub args: Vec<String>,

    /// Global name the standalone bundle is exported under.
    #[serde(default = "default_standalone")]
    pub standalone: String,

    /// Dependencies supplied by the host runtime instead of being inlined.
    #[serde(default = "default_externals")]
    pub externals: Vec<String>,
}

/// Descriptor loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// JavaScript runtime used to evaluate bundled modules.
    #[serde(default = "default_node")]
    pub program: String,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_compiled_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bundles")
}

fn default_repository_config() -> PathBuf {
    PathBuf::from("package.json")
}

fn default_types_package() -> PathBuf {
    PathBuf::from("node_modules/@paperback/types/package.json")
}

fn default_npx() -> String {
    "npx".to_string()
}

fn default_compiler_args() -> Vec<String> {
    vec!["tsc".to_string()]
}

fn default_bundler_args() -> Vec<String> {
    vec!["browserify".to_string()]
}

fn default_standalone() -> String {
    "Sources".to_string()
}

fn default_externals() -> Vec<String> {
    vec!["axios".to_string(), "fs".to_string()]
}

fn default_node() -> String {
    "node".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            compiled_dir: default_compiled_dir(),
            output_dir: default_output_dir(),
            repository_config: default_repository_config(),
            types_package: default_types_package(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: default_npx(),
            args: default_compiler_args(),
        }
    }
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: default_npx(),
            args: default_bundler_args(),
            standalone: default_standalone(),
            externals: default_externals(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            program: default_node(),
        }
    }
}

/// Prefix of environment overrides: `SOURCEPACK__BUNDLER__STANDALONE=Sources`.
const ENV_PREFIX: &str = "SOURCEPACK";

/// Settings read from the environment as comma-separated lists.
const ENV_LIST_KEYS: [&str; 3] = ["compiler.args", "bundler.args", "bundler.externals"];

fn environment() -> config::Environment {
    ENV_LIST_KEYS.into_iter().fold(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
        config::Environment::with_list_parse_key,
    )
}

impl PipelineConfig {
    /// Load configuration from a TOML file and apply environment overrides.
    ///
    /// A missing file is not an error: every setting has a default. List
    /// settings take comma-separated values, as in
    /// `SOURCEPACK__BUNDLER__EXTERNALS=axios,fs`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_from(path, environment())
    }

    fn load_from(path: &Path, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            // Reports syntax and type errors with TOML line information.
            toml::from_str::<PipelineConfig>(&content)?;
            builder =
                builder.add_source(config::File::from_str(&content, config::FileFormat::Toml));
        } else {
            tracing::debug!(path = %path.display(), "no pipeline config, using defaults");
        }

        let config: PipelineConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let dirs = [
            ("paths.source_dir", &self.paths.source_dir),
            ("paths.compiled_dir", &self.paths.compiled_dir),
            ("paths.output_dir", &self.paths.output_dir),
        ];

        for (name, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(CoreError::config(format!("{name} cannot be empty")));
            }
        }

        // The compiled and output directories are wiped on every build.
        for (i, (name, dir)) in dirs.iter().enumerate() {
            let dir = normalized(dir);
            for (other_name, other) in &dirs[i + 1..] {
                let other = normalized(other);
                if dir.starts_with(&other) || other.starts_with(&dir) {
                    return Err(CoreError::config(format!(
                        "{name} and {other_name} must not overlap"
                    )));
                }
            }
        }

        if self.compiler.program.is_empty() {
            return Err(CoreError::config("compiler.program cannot be empty"));
        }

        if self.bundler.program.is_empty() {
            return Err(CoreError::config("bundler.program cannot be empty"));
        }

        if self.bundler.standalone.is_empty() {
            return Err(CoreError::config("bundler.standalone cannot be empty"));
        }

        Ok(())
    }

    /// Output root for a build, optionally nested in a subfolder.
    ///
    /// The subfolder must stay inside the output directory: absolute paths and
    /// `..` are rejected.
    pub fn output_root(&self, repo_root: &Path, folder: &str) -> Result<PathBuf> {
        let base = repo_root.join(&self.paths.output_dir);
        if folder.is_empty() {
            return Ok(base);
        }

        let nested = Path::new(folder);
        let inside = nested
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside {
            return Err(CoreError::config(format!(
                "folder `{folder}` must be a relative path inside {}",
                self.paths.output_dir.display()
            )));
        }

        Ok(base.join(nested))
    }
}

fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Repository-level settings read from the repository configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Display name of the repository.
    #[serde(rename = "repositoryName", default)]
    pub repository_name: String,

    /// Free-text description.
    #[serde(default)]
    pub description: String,

    /// Explicit base URL; takes precedence over CI inference.
    #[serde(rename = "baseURL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Custom logo path or URL.
    #[serde(
        rename = "repositoryLogo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub repository_logo: Option<String>,

    /// Hide the "add repository" call-to-action.
    #[serde(
        rename = "noAddToPaperbackButton",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub no_add_button: Option<bool>,
}

impl RepositoryConfig {
    /// Load the repository configuration, or `None` when the file is absent.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let config: RepositoryConfig = serde_json::from_str(&content)
            .map_err(|e| CoreError::document(path, e.to_string()))?;

        if config.repository_name.is_empty() {
            tracing::warn!(path = %path.display(), "repositoryName is not set");
        }

        Ok(Some(config))
    }
}

#[derive(Deserialize)]
struct PackageVersion {
    version: String,
}

/// Read the `version` field of a `package.json` document.
pub fn read_package_version(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::config_with_source(format!("Cannot read {}", path.display()), e)
    })?;
    let package: PackageVersion = serde_json::from_str(&content)
        .map_err(|e| CoreError::document(path, e.to_string()))?;
    Ok(package.version)
}
