//! Safe manifest write operations

use crate::Result;
use codep_fs::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes manifests via a temporary sibling file and a rename
pub struct FileUpdater {
    fs: Arc<dyn FileSystem>,
}

impl FileUpdater {
    /// Create an updater writing through `fs`
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Replace the contents of `path`.
    ///
    /// Strategy:
    /// 1. Write to `<name>.tmp` in the same directory (same filesystem)
    /// 2. Rename over the original (atomic on POSIX, best-effort on Windows)
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or renamed
    pub async fn update_file(&self, path: &Path, new_contents: &str) -> Result<()> {
        let temp_path = temp_path(path);
        self.fs.write(&temp_path, new_contents).await?;
        self.fs.rename(&temp_path, path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
