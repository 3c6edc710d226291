//! Native filesystem implementation using std::fs + tokio.

use crate::{DiscoveryOptions, FileSystem, PatternSet};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::task;

/// Native filesystem implementation using std::fs + tokio.
///
/// Blocking std::fs calls are wrapped with `tokio::task::spawn_blocking` so
/// manifest I/O never stalls the runtime driving registry lookups.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    project_root: PathBuf,
}

impl NativeFileSystem {
    /// Create a new native filesystem scoped to a project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or can't be canonicalized.
    pub fn new(project_root: impl AsRef<Path>) -> io::Result<Self> {
        let project_root = project_root.as_ref().canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!(
                    "Project root does not exist: {}",
                    project_root.as_ref().display()
                ),
            )
        })?;

        Ok(Self { project_root })
    }

    /// Validate that a path is within the project root.
    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        // Files about to be created don't canonicalize; resolve the parent instead
        let resolved = match absolute.canonicalize() {
            Ok(path) => path,
            Err(_) => match (absolute.parent(), absolute.file_name()) {
                (Some(parent), Some(name)) => match parent.canonicalize() {
                    Ok(parent) => parent.join(name),
                    Err(_) => normalize_lexically(&absolute),
                },
                _ => normalize_lexically(&absolute),
            },
        };

        if !resolved.starts_with(&self.project_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside project root {}",
                    resolved.display(),
                    self.project_root.display()
                ),
            ));
        }

        Ok(resolved)
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

fn join_error(e: task::JoinError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

#[async_trait::async_trait]
impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || Ok(validated.exists()))
            .await
            .map_err(join_error)?
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::read_to_string(&validated))
            .await
            .map_err(join_error)?
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        let contents = contents.to_string();
        task::spawn_blocking(move || std::fs::write(&validated, contents))
            .await
            .map_err(join_error)?
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_validated = self.validate_path(from)?;
        let to_validated = self.validate_path(to)?;
        task::spawn_blocking(move || std::fs::rename(&from_validated, &to_validated))
            .await
            .map_err(join_error)?
    }

    async fn discover_files(
        &self,
        root: &Path,
        patterns: &[String],
        ignore_patterns: &[String],
        options: &DiscoveryOptions,
    ) -> io::Result<BTreeSet<PathBuf>> {
        let validated_root = self.validate_path(root)?;
        let pattern_set = PatternSet::new(patterns, ignore_patterns)?;
        let opts = options.clone();

        task::spawn_blocking(move || discover_files_sync(&validated_root, &pattern_set, &opts))
            .await
            .map_err(join_error)?
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}

fn discover_files_sync(
    root: &Path,
    patterns: &PatternSet,
    options: &DiscoveryOptions,
) -> io::Result<BTreeSet<PathBuf>> {
    let mut discovered = BTreeSet::new();

    let mut walker = WalkBuilder::new(root);
    walker
        .follow_links(options.follow_symlinks)
        .hidden(!options.include_hidden)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .max_depth(Some(options.max_depth));

    for result in walker.build() {
        let entry = result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        if patterns.matches(relative) {
            discovered.insert(path.to_path_buf());
        }
    }

    Ok(discovered)
}
