//! Registry manifest document.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    descriptor::ModuleDescriptor,
    error::{CoreError, Result},
};

/// File name of the manifest inside the output root.
pub const MANIFEST_FILE: &str = "versioning.json";

/// Versions of the build-time dependencies that shaped the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltWith {
    /// Version of the build tool.
    pub toolchain: String,

    /// Version of the shared type definitions modules were compiled against.
    pub types: String,
}

/// The registry document describing every successfully built module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    #[serde(serialize_with = "serialize_millis")]
    pub build_time: DateTime<Utc>,
    pub sources: Vec<ModuleDescriptor>,
    pub built_with: BuiltWith,
}

fn serialize_millis<S: Serializer>(
    time: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl BuildManifest {
    /// Create a manifest stamped with the current time.
    ///
    /// Sources are ordered by identifier so output does not depend on task
    /// completion order.
    #[must_use]
    pub fn new(mut sources: Vec<ModuleDescriptor>, built_with: BuiltWith) -> Self {
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            build_time: Utc::now(),
            sources,
            built_with,
        }
    }

    /// Identifiers of all listed modules, in manifest order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id.as_str())
    }

    /// Serialize to the compact JSON form written to disk.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a manifest document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a persisted manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::document(path, e.to_string()))
    }
}
