//! Core traits for ecosystem providers

use crate::command::CommandRunner;
use crate::types::{Language, Manifest, ValidationResult};
use crate::Result;
use codep_fs::FileSystem;
use std::path::Path;
use std::sync::Arc;

/// Per-ecosystem capability set.
///
/// Each ecosystem (Node, Go, Python) implements the full contract
/// independently. Manifest formats and registry queries live behind this
/// trait.
#[async_trait::async_trait]
pub trait EcosystemProvider: Send + Sync {
    /// Ecosystem this provider handles
    fn language(&self) -> Language;

    /// Lookup backend name (`npm`, `yarn`, `go`, `pip`, ...), part of cache keys
    fn backend(&self) -> &str;

    /// Latest published version of `name`
    ///
    /// Returns an empty string when the package cannot be found.
    ///
    /// # Errors
    /// Returns an error if the registry query itself fails (process spawn,
    /// timeout, unreachable registry).
    async fn get_latest_version(&self, name: &str) -> Result<String>;

    /// Every published version of `name`, oldest first
    ///
    /// Same failure policy as [`EcosystemProvider::get_latest_version`].
    async fn get_all_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Parse the manifest at `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn read_manifest(&self, path: &Path) -> Result<Manifest>;

    /// Write `manifest` back to `path`, preserving the file's conventions
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written
    async fn write_manifest(&self, path: &Path, manifest: &Manifest) -> Result<()>;

    /// Check `name` against the ecosystem's package naming rules
    fn validate_package_name(&self, name: &str) -> ValidationResult;
}

/// Shared collaborators handed to every provider
#[derive(Clone)]
pub struct ProviderContext {
    /// Manifest I/O
    pub fs: Arc<dyn FileSystem>,
    /// Registry queries and toolchain commands
    pub runner: Arc<dyn CommandRunner>,
    /// Skip side-effecting post-write tooling
    pub testing: bool,
}

impl ProviderContext {
    /// Bundle the collaborators
    pub fn new(fs: Arc<dyn FileSystem>, runner: Arc<dyn CommandRunner>, testing: bool) -> Self {
        Self { fs, runner, testing }
    }
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("project_root", &self.fs.project_root())
            .field("testing", &self.testing)
            .finish()
    }
}
