//! FileSystem trait for root-scoped manifest I/O.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// Options for manifest discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Follow symbolic links (default: false).
    pub follow_symlinks: bool,

    /// Maximum directory depth (default: 32).
    pub max_depth: usize,

    /// Include hidden files and directories (default: false).
    pub include_hidden: bool,

    /// Respect .gitignore files (default: true).
    pub respect_gitignore: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: 32,
            include_hidden: false,
            respect_gitignore: true,
        }
    }
}

/// Filesystem abstraction used for manifest reads and writes.
///
/// All methods are async so the native implementation can offload blocking
/// `std::fs` calls with `tokio::task::spawn_blocking`, while the in-memory
/// implementation completes immediately.
///
/// Every path is validated against [`FileSystem::project_root`]; operations
/// that would escape it fail with `io::ErrorKind::PermissionDenied`.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read file contents as a string.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if file doesn't exist.
    /// Returns `io::ErrorKind::InvalidData` if file is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string contents to a file, overwriting it.
    ///
    /// Parent directories are NOT created automatically.
    async fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Rename a file. Used for write-then-rename manifest updates.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Discover files under `root` whose root-relative path matches one of
    /// `patterns` and none of `ignore_patterns`.
    ///
    /// Patterns are globs evaluated against `/`-separated relative paths, so
    /// `package.json` only matches at the root while `**/package.json`
    /// matches at any depth.
    ///
    /// # Returns
    ///
    /// Sorted set of absolute paths to discovered files.
    async fn discover_files(
        &self,
        root: &Path,
        patterns: &[String],
        ignore_patterns: &[String],
        options: &DiscoveryOptions,
    ) -> io::Result<BTreeSet<PathBuf>>;

    /// Get the project root this filesystem is scoped to.
    fn project_root(&self) -> &Path;
}
