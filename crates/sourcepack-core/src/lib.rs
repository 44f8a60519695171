//! sourcepack Core Library
//!
//! Configuration, error handling and the registry data model shared by the
//! sourcepack pipeline and CLI.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod manifest;

pub use config::{PipelineConfig, RepositoryConfig};
pub use descriptor::{ContentRating, ModuleDescriptor, SourceInfo, SourceIntents};
pub use error::{CoreError, Result};
pub use manifest::{BuildManifest, BuiltWith, MANIFEST_FILE};
