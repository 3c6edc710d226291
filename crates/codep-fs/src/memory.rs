//! In-memory filesystem implementation.

use crate::{DiscoveryOptions, FileSystem, PatternSet};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// In-memory filesystem.
///
/// Files live in a shared map keyed by normalized absolute path, so clones
/// observe each other's writes. Used by tests and by callers that already
/// hold manifest contents.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    project_root: PathBuf,
    files: Arc<RwLock<BTreeMap<PathBuf, String>>>,
}

impl MemoryFileSystem {
    /// Create an in-memory filesystem from pre-loaded files.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::InvalidInput` if any file lies outside
    /// `project_root`.
    pub fn new(
        project_root: impl AsRef<Path>,
        files: impl IntoIterator<Item = (PathBuf, String)>,
    ) -> io::Result<Self> {
        let project_root = normalize(project_root.as_ref())?;

        let mut stored = BTreeMap::new();
        for (path, contents) in files {
            let normalized = normalize(&project_root.join(&path))?;
            if !normalized.starts_with(&project_root) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("File path outside project root: {}", path.display()),
                ));
            }
            stored.insert(normalized, contents);
        }

        Ok(Self {
            project_root,
            files: Arc::new(RwLock::new(stored)),
        })
    }

    /// Create an empty in-memory filesystem.
    pub fn empty(project_root: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(project_root, std::iter::empty())
    }

    /// Add or replace a file.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<String>) -> io::Result<()> {
        let normalized = self.validate_path(path.as_ref())?;
        self.files.write().insert(normalized, contents.into());
        Ok(())
    }

    /// Snapshot a file's contents, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let normalized = self.validate_path(path.as_ref()).ok()?;
        self.files.read().get(&normalized).cloned()
    }

    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let normalized = normalize(&self.project_root.join(path))?;

        if !normalized.starts_with(&self.project_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside {}",
                    normalized.display(),
                    self.project_root.display()
                ),
            ));
        }

        Ok(normalized)
    }
}

/// Syntactic normalization; `..` above the filesystem root is rejected.
fn normalize(path: &Path) -> io::Result<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                result = PathBuf::from(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() || result.as_os_str().is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        "Path attempts to escape root using ..",
                    ));
                }
            }
            Component::Normal(name) => result.push(name),
        }
    }
    Ok(result)
}

#[async_trait::async_trait]
impl FileSystem for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let normalized = self.validate_path(path)?;
        Ok(self.files.read().contains_key(&normalized))
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let normalized = self.validate_path(path)?;
        self.files.read().get(&normalized).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", normalized.display()),
            )
        })
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let normalized = self.validate_path(path)?;
        self.files.write().insert(normalized, contents.to_string());
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_normalized = self.validate_path(from)?;
        let to_normalized = self.validate_path(to)?;

        let mut files = self.files.write();
        let contents = files
            .remove(&from_normalized)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Source file not found"))?;
        files.insert(to_normalized, contents);
        Ok(())
    }

    async fn discover_files(
        &self,
        root: &Path,
        patterns: &[String],
        ignore_patterns: &[String],
        _options: &DiscoveryOptions,
    ) -> io::Result<BTreeSet<PathBuf>> {
        let normalized_root = self.validate_path(root)?;
        let pattern_set = PatternSet::new(patterns, ignore_patterns)?;

        let files = self.files.read();
        let discovered = files
            .keys()
            .filter_map(|path| {
                let relative = path.strip_prefix(&normalized_root).ok()?;
                pattern_set.matches(relative).then(|| path.clone())
            })
            .collect();

        Ok(discovered)
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}
