//! Descriptor loading.
//!
//! A bundled module describes itself through a `describe()` export that
//! returns its [`SourceInfo`]. The shape is checked when the result is
//! deserialized, so a module with a malformed descriptor fails here instead of
//! leaking nulls into the manifest.

use std::{path::Path, process::Command};

use sourcepack_core::{SourceInfo, config::LoaderConfig};
use thiserror::Error;
use tracing::debug;

use crate::bundler::CURRENT_BUNDLE;

/// Descriptor loading errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The runtime could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The module could not be evaluated or exports no descriptor.
    #[error("[{module}] cannot load descriptor: {message}")]
    Evaluate { module: String, message: String },

    /// The descriptor does not have the expected shape.
    #[error("[{module}] invalid descriptor: {source}")]
    Invalid {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the descriptor of a bundled module.
pub trait DescriptorLoader: Send + Sync {
    /// Describe the module bundled in `module_dir`.
    fn describe(&self, module_id: &str, module_dir: &Path) -> Result<SourceInfo, LoadError>;
}

/// Evaluates a module's bundle in Node.js and reads its descriptor.
///
/// Modules built against older type definitions export the descriptor as
/// `<id>Info` instead of `describe()`; both are accepted.
#[derive(Debug, Clone)]
pub struct NodeDescriptorLoader {
    program: String,
}

const DESCRIBE_SCRIPT: &str = r#"
const [entry, id] = process.argv.slice(-2);
const exported = require(entry);
const info = typeof exported.describe === 'function'
    ? exported.describe()
    : exported[`${id}Info`];
if (info === undefined || info === null) {
    console.error(`module exports neither describe() nor ${id}Info`);
    process.exit(2);
}
process.stdout.write(JSON.stringify(info));
"#;

impl NodeDescriptorLoader {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.program.clone())
    }
}

impl DescriptorLoader for NodeDescriptorLoader {
    fn describe(&self, module_id: &str, module_dir: &Path) -> Result<SourceInfo, LoadError> {
        // require() treats relative paths as package names
        let entry = module_dir.join(CURRENT_BUNDLE);
        let entry = std::path::absolute(&entry).unwrap_or(entry);
        debug!(module = module_id, entry = %entry.display(), "loading descriptor");

        let output = Command::new(&self.program)
            .arg("-e")
            .arg(DESCRIBE_SCRIPT)
            .arg(&entry)
            .arg(module_id)
            .output()
            .map_err(|source| LoadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(LoadError::Evaluate {
                module: module_id.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_descriptor(module_id, &output.stdout)
    }
}

/// Parse a JSON descriptor reported by a module.
pub fn parse_descriptor(module_id: &str, json: &[u8]) -> Result<SourceInfo, LoadError> {
    serde_json::from_slice(json).map_err(|source| LoadError::Invalid {
        module: module_id.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use sourcepack_core::ContentRating;

    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let json = br#"{
            "name": "Alpha",
            "author": "someone",
            "description": "Reads alpha",
            "version": "1.0.0",
            "icon": "icon.png",
            "contentRating": "EVERYONE",
            "websiteBaseURL": "https://alpha.example",
            "sourceTags": ["x", "y"]
        }"#;

        let info = parse_descriptor("alpha", json).unwrap();
        assert_eq!(info.name, "Alpha");
        assert_eq!(info.content_rating, ContentRating::Everyone);
        assert_eq!(info.source_tags, vec!["x", "y"]);
    }

    #[test]
    fn test_parse_descriptor_names_module() {
        let err = parse_descriptor("beta", br#"{"name": "Beta"}"#).unwrap_err();
        assert!(err.to_string().contains("[beta]"));
    }

    #[test]
    fn test_missing_runtime() {
        let loader = NodeDescriptorLoader::new("sourcepack-no-such-runtime");
        let err = loader.describe("alpha", Path::new("bundles/alpha")).unwrap_err();
        assert!(matches!(err, LoadError::Spawn { .. }));
    }
}
