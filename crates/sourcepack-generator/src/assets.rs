//! Static asset folders.
//!
//! Modules ship non-compiled files in two folders next to their sources:
//! `external` (runtime files the bundler must see beside the entry) and
//! `includes` (files published with the bundle, such as the icon).

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Folder copied into the compiled module before bundling.
pub const EXTERNAL_DIR: &str = "external";

/// Folder copied into the published module after bundling.
pub const INCLUDES_DIR: &str = "includes";

/// Asset copy errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error copying {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError + '_ {
    move |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copy the folder `source` into `dest_parent`, keeping its name.
///
/// `src/alpha/includes` copied into `bundles/alpha` lands in
/// `bundles/alpha/includes`. A missing source folder copies nothing.
/// Returns the number of files copied.
pub fn copy_folder(source: &Path, dest_parent: &Path) -> Result<usize> {
    if !source.is_dir() {
        debug!(source = %source.display(), "asset folder absent, nothing to copy");
        return Ok(0);
    }

    let name = source
        .file_name()
        .ok_or_else(|| AssetError::InvalidPath(source.to_path_buf()))?;
    let dest_root = dest_parent.join(name);
    let mut copied = 0;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| AssetError::InvalidPath(entry.path().to_path_buf()))?;
        let dest = dest_root.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&dest)?;
        } else {
            copy_file(entry.path(), &dest)?;
            copied += 1;
        }
    }

    debug!(
        source = %source.display(),
        dest = %dest_root.display(),
        files = copied,
        "copied asset folder"
    );

    Ok(copied)
}

/// Copy a single file, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(source, dest).map_err(io_error(source))?;
    Ok(())
}

/// Create a directory if it doesn't exist.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(io_error(path))?;
    }
    Ok(())
}

/// Remove a directory tree if it exists.
pub fn remove_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(io_error(path))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_copy_folder_keeps_name() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let includes = source.path().join("alpha").join(INCLUDES_DIR);
        fs::create_dir_all(includes.join("img")).unwrap();
        fs::write(includes.join("icon.png"), b"png").unwrap();
        fs::write(includes.join("img/banner.jpg"), b"jpg").unwrap();

        let copied = copy_folder(&includes, dest.path()).unwrap();

        assert_eq!(copied, 2);
        assert!(dest.path().join("includes/icon.png").exists());
        assert!(dest.path().join("includes/img/banner.jpg").exists());
    }

    #[test]
    fn test_copy_missing_folder() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let copied = copy_folder(&source.path().join(EXTERNAL_DIR), dest.path()).unwrap();

        assert_eq!(copied, 0);
        assert!(!dest.path().join(EXTERNAL_DIR).exists());
    }

    #[test]
    fn test_copy_folder_overwrites() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let external = source.path().join(EXTERNAL_DIR);
        fs::create_dir(&external).unwrap();
        fs::write(external.join("lib.js"), "new").unwrap();
        fs::create_dir(dest.path().join(EXTERNAL_DIR)).unwrap();
        fs::write(dest.path().join("external/lib.js"), "old").unwrap();

        copy_folder(&external, dest.path()).unwrap();

        let content = fs::read_to_string(dest.path().join("external/lib.js")).unwrap();
        assert_eq!(content, "new");
    }

    #[test]
    fn test_ensure_and_remove_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");

        ensure_dir(&nested).unwrap();
        assert!(nested.exists());

        remove_dir(&dir.path().join("a")).unwrap();
        assert!(!dir.path().join("a").exists());
        remove_dir(&dir.path().join("a")).unwrap();
    }
}
