//! Metadata extraction.
//!
//! Reads one bundled module's descriptor and checks the icon it declares is
//! published alongside it.

use std::path::Path;

use sourcepack_core::ModuleDescriptor;
use thiserror::Error;
use tracing::debug;

use crate::{
    assets::INCLUDES_DIR,
    loader::{DescriptorLoader, LoadError},
};

/// Extraction errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The descriptor could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The declared icon is not in the module's includes folder.
    #[error("[{module}] icon `{icon}` must be inside the includes folder")]
    MissingIcon { module: String, icon: String },
}

impl ExtractError {
    /// Identifier of the module the error is about, when known.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Load(LoadError::Evaluate { module, .. } | LoadError::Invalid { module, .. })
            | Self::MissingIcon { module, .. } => Some(module.as_str()),
            Self::Load(LoadError::Spawn { .. }) => None,
        }
    }
}

/// Extracts validated descriptors from bundled modules.
pub struct MetadataExtractor<'a> {
    loader: &'a dyn DescriptorLoader,
}

impl<'a> MetadataExtractor<'a> {
    #[must_use]
    pub fn new(loader: &'a dyn DescriptorLoader) -> Self {
        Self { loader }
    }

    /// Extract the descriptor of `module_id` under `bundles_root`.
    ///
    /// Returns `Ok(None)` when the entry is not a directory.
    pub fn extract(
        &self,
        module_id: &str,
        bundles_root: &Path,
    ) -> Result<Option<ModuleDescriptor>, ExtractError> {
        let module_dir = bundles_root.join(module_id);
        if !module_dir.is_dir() {
            return Ok(None);
        }

        let info = self.loader.describe(module_id, &module_dir)?;

        let icon_path = module_dir.join(INCLUDES_DIR).join(&info.icon);
        if info.icon.is_empty() || !icon_path.is_file() {
            return Err(ExtractError::MissingIcon {
                module: module_id.to_string(),
                icon: info.icon,
            });
        }

        debug!(module = module_id, version = %info.version, "extracted descriptor");
        Ok(Some(ModuleDescriptor::from_info(module_id, info)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sourcepack_core::{ContentRating, SourceInfo};
    use tempfile::TempDir;

    use super::*;

    struct FixedLoader;

    impl DescriptorLoader for FixedLoader {
        fn describe(&self, module_id: &str, _module_dir: &Path) -> Result<SourceInfo, LoadError> {
            Ok(SourceInfo {
                name: module_id.to_uppercase(),
                author: "author".to_string(),
                description: "desc".to_string(),
                author_website: None,
                content_rating: ContentRating::Everyone,
                version: "1.0.0".to_string(),
                icon: "icon.png".to_string(),
                source_tags: vec!["x".to_string()],
                website_base_url: "https://example.com".to_string(),
                intents: None,
            })
        }
    }

    #[test]
    fn test_extract_with_icon() {
        let bundles = TempDir::new().unwrap();
        let includes = bundles.path().join("alpha").join(INCLUDES_DIR);
        fs::create_dir_all(&includes).unwrap();
        fs::write(includes.join("icon.png"), b"png").unwrap();

        let descriptor = MetadataExtractor::new(&FixedLoader)
            .extract("alpha", bundles.path())
            .unwrap()
            .unwrap();

        assert_eq!(descriptor.id, "alpha");
        assert_eq!(descriptor.name, "ALPHA");
        assert_eq!(descriptor.tags, vec!["x"]);
    }

    #[test]
    fn test_missing_icon_names_module() {
        let bundles = TempDir::new().unwrap();
        fs::create_dir_all(bundles.path().join("beta")).unwrap();

        let err = MetadataExtractor::new(&FixedLoader)
            .extract("beta", bundles.path())
            .unwrap_err();

        assert!(matches!(err, ExtractError::MissingIcon { .. }));
        assert_eq!(err.module(), Some("beta"));
        assert!(err.to_string().contains("[beta]"));
    }

    #[test]
    fn test_stray_file_is_ignored() {
        let bundles = TempDir::new().unwrap();
        fs::write(bundles.path().join("versioning.json"), "{}").unwrap();

        let result = MetadataExtractor::new(&FixedLoader)
            .extract("versioning.json", bundles.path())
            .unwrap();

        assert!(result.is_none());
    }
}
