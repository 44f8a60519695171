//! Compiler adapter.
//!
//! Lowers the module source tree into the intermediate tree the bundler reads.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use sourcepack_core::config::CompilerConfig;
use thiserror::Error;
use tracing::debug;

use crate::assets::{self, AssetError};

/// Compilation errors.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler process could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler exited unsuccessfully.
    #[error("`{program}` exited with {status}:\n{output}")]
    Failed {
        program: String,
        status: String,
        output: String,
    },

    /// The intermediate directory could not be reset.
    #[error("cannot prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: AssetError,
    },
}

/// Something that compiles a repository's module sources.
pub trait Compiler: Send + Sync {
    /// Compile the sources of `repo_root` into `out_dir`.
    fn compile(&self, repo_root: &Path, out_dir: &Path) -> Result<(), CompileError>;
}

/// Runs an external compiler command, `tsc` by default.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// Create a compiler that runs `program args... --outDir <out>`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, repo_root: &Path, out_dir: &Path) -> Result<(), CompileError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            out = %out_dir.display(),
            "running compiler"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--outDir")
            .arg(out_dir)
            .current_dir(repo_root)
            .output()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            // tsc reports diagnostics on stdout
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                output: text.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Empty `out_dir` and run `compiler` into it.
pub fn compile_into(
    compiler: &dyn Compiler,
    repo_root: &Path,
    out_dir: &Path,
) -> Result<(), CompileError> {
    let prepare = |source| CompileError::Prepare {
        path: out_dir.to_path_buf(),
        source,
    };
    assets::remove_dir(out_dir).map_err(prepare)?;
    assets::ensure_dir(out_dir).map_err(prepare)?;

    compiler.compile(repo_root, out_dir)
}
