//! Module discovery.
//!
//! Lists the candidate module entries directly under a root directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

/// Directory name reserved for repository tests, never a module.
pub const TESTS_DIR: &str = "tests";

/// One entry under a module root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// Entry name, which is the module identifier.
    pub id: String,

    /// Full path of the entry.
    pub path: PathBuf,
}

impl ModuleEntry {
    /// Whether the entry is a directory. Only directories can be modules.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }
}

/// Whether an entry name is excluded from discovery.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    name.starts_with('.') || name == TESTS_DIR
}

/// List the non-reserved entries of `root`, sorted by name.
///
/// Stray files are returned too; callers decide how to treat them.
pub fn discover_modules(root: &Path) -> std::io::Result<Vec<ModuleEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let Ok(id) = entry.file_name().into_string() else {
            warn!(path = %entry.path().display(), "skipping entry with non UTF-8 name");
            continue;
        };

        if is_reserved(&id) {
            debug!(entry = %id, "skipping reserved entry");
            continue;
        }

        entries.push(ModuleEntry {
            id,
            path: entry.path(),
        });
    }

    entries.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(root = %root.display(), count = entries.len(), "discovered module entries");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved(".git"));
        assert!(is_reserved(".DS_Store"));
        assert!(is_reserved("tests"));
        assert!(!is_reserved("testsource"));
        assert!(!is_reserved("alpha"));
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let root = TempDir::new().unwrap();
        for dir in ["zeta", "alpha", ".hidden", "tests"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("README.md"), "notes").unwrap();

        let entries = discover_modules(root.path()).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec!["README.md", "alpha", "zeta"]);
        assert!(!entries[0].is_dir());
        assert!(entries[1].is_dir());
    }

    #[test]
    fn test_discover_missing_root() {
        let root = TempDir::new().unwrap();
        assert!(discover_modules(&root.path().join("missing")).is_err());
    }
}
