//! Sourcepack CLI Library
//!
//! Command implementations behind the `sourcepack` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (bundle, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sourcepack::cmd;
//!
//! // Bundle the repository in the current directory
//! cmd::bundle::run(Path::new("sourcepack.toml"), "").unwrap();
//! ```

pub mod cmd;

pub use sourcepack_core::{BuildManifest, PipelineConfig, RepositoryConfig};
pub use sourcepack_generator::{BuildReport, Pipeline, Reporter};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
