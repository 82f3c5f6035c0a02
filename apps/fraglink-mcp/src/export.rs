//! # Export Directory
//!
//! Resolves report filenames against the configured export directory.
//! Relative names land inside the export directory (created on demand);
//! absolute paths are honored as given.

use std::path::{Path, PathBuf};

/// Base directory for generated report files.
#[derive(Debug, Clone)]
pub struct ExportDir {
    base: PathBuf,
}

impl ExportDir {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolve a filename to its final location.
    #[must_use]
    pub fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }

    /// Write report contents, creating parent directories as needed.
    /// Returns the final path.
    pub fn write(&self, filename: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.resolve(filename);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

// =============================================================================
// TESTS
// =============================================================================
