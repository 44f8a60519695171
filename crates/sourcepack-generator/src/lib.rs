//! Sourcepack Generator Library
//!
//! Build pipeline for a repository of source modules.
//!
//! # Modules
//!
//! - [`compiler`] - Source compilation into an intermediate tree
//! - [`bundler`] - Per-module bundling in both published formats
//! - [`fanout`] - Concurrent settle-all execution over modules
//! - [`loader`] - Descriptor loading from bundled modules
//! - [`extractor`] - Descriptor validation
//! - [`manifest`] - Registry manifest aggregation
//! - [`catalogue`] - Catalogue page rendering
//! - [`template`] - Catalogue page templates
//! - [`assets`] - Asset folder copying
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod bundler;
pub mod catalogue;
pub mod compiler;
pub mod discovery;
pub mod extractor;
pub mod fanout;
pub mod loader;
pub mod manifest;
pub mod report;
pub mod template;

pub use build::{BuildError, BuildReport, Pipeline};
pub use bundler::{BundleOutcome, Bundler, CommandBundler, ModuleBundler};
pub use catalogue::{BaseUrl, Catalogue, CatalogueRenderer};
pub use compiler::{CommandCompiler, Compiler};
pub use discovery::{ModuleEntry, discover_modules};
pub use extractor::MetadataExtractor;
pub use fanout::{Settled, settle_all};
pub use loader::{DescriptorLoader, NodeDescriptorLoader};
pub use manifest::{ManifestAggregator, ManifestReport};
pub use report::{ModuleFailure, Phase, Reporter};
pub use template::Template;
