//! Reconciliation pass: Scan → Resolve → Compare → Report → Apply

use crate::cache::ResponseCache;
use crate::dedupe::RequestDeduplicator;
use crate::diff::{build_version_diff, collect_all_diffs, VersionDiff};
use crate::registry::ProviderRegistry;
use crate::resolver::{LookupResult, ProgressCallback, ResolveOptions, VersionResolver};
use crate::traits::EcosystemProvider;
use crate::types::{DependencySection, Language, Manifest, SectionUpdates, VersionMap};
use crate::version::{construct_deps_to_update_list, construct_permissive_deps_to_update_list};
use crate::{Error, Result};
use codep_config::CodepConfig;
use codep_fs::{DiscoveryOptions, FileSystem};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Overall outcome of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Nothing needed updating
    UpToDate,
    /// Updates were needed and the run was in update mode
    Updated,
    /// Updates were needed but not requested
    Outdated,
}

impl Verdict {
    /// Process exit code for this verdict
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UpToDate | Self::Updated => 0,
            Self::Outdated => 1,
        }
    }

    /// Label used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpToDate => "up-to-date",
            Self::Updated => "updated",
            Self::Outdated => "outdated",
        }
    }
}

/// Outcome for one manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// Manifest path
    pub path: PathBuf,
    /// Changes computed for each section
    pub updates: SectionUpdates,
    /// The manifest was rewritten
    pub written: bool,
}

impl FileReport {
    /// Whether any section has pending changes
    pub fn needs_update(&self) -> bool {
        self.updates.needs_update()
    }
}

/// Result of [`ReconciliationEngine::reconcile`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Overall verdict
    pub verdict: Verdict,
    /// Per-manifest outcomes, in discovery order
    pub files: Vec<FileReport>,
    /// Cross-file diffs, first occurrence of each package
    pub diffs: Vec<VersionDiff>,
    /// Resolved codependency targets
    pub version_map: VersionMap,
}

impl ReconciliationReport {
    /// Manifests with pending changes
    pub fn outdated_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| file.needs_update())
    }
}

/// Drives one reconciliation pass over a configured project.
///
/// The cache and de-duplicator are shared instances so several engines (or
/// repeated passes) reuse lookups.
pub struct ReconciliationEngine {
    config: CodepConfig,
    registry: ProviderRegistry,
    fs: Arc<dyn FileSystem>,
    cache: Arc<ResponseCache>,
    dedupe: Arc<RequestDeduplicator<LookupResult>>,
    progress: Option<ProgressCallback>,
}

impl ReconciliationEngine {
    /// Create an engine
    pub fn new(
        config: CodepConfig,
        registry: ProviderRegistry,
        fs: Arc<dyn FileSystem>,
        cache: Arc<ResponseCache>,
        dedupe: Arc<RequestDeduplicator<LookupResult>>,
    ) -> Self {
        Self {
            config,
            registry,
            fs,
            cache,
            dedupe,
            progress: None,
        }
    }

    /// Report resolution progress through `progress`
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Configuration this engine runs with
    pub fn config(&self) -> &CodepConfig {
        &self.config
    }

    fn ensure_policy(&self) -> Result<()> {
        if self.config.codependencies().is_empty() && !self.config.permissive {
            return Err(Error::Policy(
                "no codependencies configured; add codependencies or enable permissive mode"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn pinned_names(&self) -> BTreeSet<String> {
        self.config.codependency_names().into_iter().collect()
    }

    /// Discover the manifests to reconcile.
    ///
    /// # Errors
    /// Returns [`Error::Policy`] before touching the filesystem when neither
    /// codependencies nor permissive mode are configured.
    pub async fn check_files(&self) -> Result<Vec<PathBuf>> {
        self.ensure_policy()?;

        let root = self.config.root_dir();
        let patterns = self.config.file_patterns();
        let ignore = self.config.ignore_patterns();
        debug!(
            "Scanning {} for {:?} (ignoring {:?})",
            root.display(),
            patterns,
            ignore
        );

        let files = self
            .fs
            .discover_files(&root, &patterns, &ignore, &DiscoveryOptions::default())
            .await?;
        debug!("Found {} manifest(s)", files.len());
        Ok(files.into_iter().collect())
    }

    /// Update lists for one manifest, per the configured mode
    pub fn check_dependencies_for_version(
        &self,
        version_map: &VersionMap,
        manifest: &Manifest,
    ) -> SectionUpdates {
        let pinned = self.pinned_names();
        let compute = |section: DependencySection| {
            let Some(deps) = manifest.section(section) else {
                return vec![];
            };
            if self.config.permissive {
                construct_permissive_deps_to_update_list(deps, &pinned)
            } else {
                construct_deps_to_update_list(deps, version_map)
            }
        };

        SectionUpdates {
            dependencies: compute(DependencySection::Dependencies),
            dev_dependencies: compute(DependencySection::DevDependencies),
            peer_dependencies: compute(DependencySection::PeerDependencies),
        }
    }

    fn language(&self, files: &[PathBuf]) -> Language {
        self.config
            .language
            .or_else(|| files.first().and_then(|f| ProviderRegistry::detect_language(f)))
            .unwrap_or(Language::NodeJs)
    }

    fn provider_for(&self, path: &Path, language: Language) -> Result<Arc<dyn EcosystemProvider>> {
        match ProviderRegistry::detect_language(path) {
            Some(_) => self.registry.provider_for_path(path),
            None => self.registry.provider_for_language(language),
        }
    }

    /// Compare every manifest against `version_map`, report, and apply.
    ///
    /// # Errors
    /// Manifest read, parse and write errors propagate.
    pub async fn check_matches(
        &self,
        files: &[PathBuf],
        version_map: &VersionMap,
    ) -> Result<ReconciliationReport> {
        let language = self.language(files);
        let pinned = self.pinned_names();
        let mut reports = Vec::with_capacity(files.len());
        let mut per_file_diffs = Vec::with_capacity(files.len());

        for path in files {
            let provider = self.provider_for(path, language)?;
            let mut manifest = provider.read_manifest(path).await?;
            let updates = self.check_dependencies_for_version(version_map, &manifest);
            per_file_diffs.push(build_version_diff(
                version_map,
                &manifest,
                &pinned,
                self.config.permissive,
            ));

            let mut written = false;
            if updates.needs_update() && self.config.update {
                if self.config.writes_enabled() {
                    for section in DependencySection::ALL {
                        manifest.apply_updates(section, updates.get(section));
                    }
                    provider.write_manifest(path, &manifest).await?;
                    info!("Updated {} ({} change(s))", path.display(), updates.len());
                    written = true;
                } else {
                    info!(
                        "Would update {} ({} change(s))",
                        path.display(),
                        updates.len()
                    );
                }
            } else if updates.needs_update() {
                for section in DependencySection::ALL {
                    for item in updates.get(section) {
                        info!(
                            "{}: {} {} should be {}",
                            path.display(),
                            item.name,
                            item.actual,
                            item.expected
                        );
                    }
                }
            }

            reports.push(FileReport {
                path: path.clone(),
                updates,
                written,
            });
        }

        let needs_update = reports.iter().any(FileReport::needs_update);
        let verdict = match (needs_update, self.config.update) {
            (true, false) => {
                error!("Dependencies are not correct. Run with --update to fix them.");
                Verdict::Outdated
            }
            (true, true) => {
                info!("Dependencies were updated");
                Verdict::Updated
            }
            (false, _) => {
                info!("No dependency issues found");
                Verdict::UpToDate
            }
        };

        Ok(ReconciliationReport {
            verdict,
            files: reports,
            diffs: collect_all_diffs(per_file_diffs),
            version_map: version_map.clone(),
        })
    }

    /// Run the full pass.
    ///
    /// Resolution is skipped in permissive mode without codependencies.
    ///
    /// # Errors
    /// Policy errors come first, before any I/O; then discovery, resolution
    /// and manifest errors propagate.
    pub async fn reconcile(&self) -> Result<ReconciliationReport> {
        let files = self.check_files().await?;
        if files.is_empty() {
            warn!(
                "No manifests matched {:?} under {}",
                self.config.file_patterns(),
                self.config.root_dir().display()
            );
        }

        let items = self.config.codependencies();
        let version_map = if items.is_empty() {
            debug!("Permissive mode without codependencies; skipping resolution");
            VersionMap::new()
        } else {
            let provider = self.registry.provider_for_language(self.language(&files))?;
            let resolver =
                VersionResolver::new(provider, self.cache.clone(), self.dedupe.clone());
            let options = ResolveOptions {
                no_cache: self.config.no_cache,
                testing: self.config.testing,
                progress: self.progress.clone(),
            };
            resolver.construct_version_map(items, &options).await?
        };

        self.check_matches(&files, &version_map).await
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cache", &self.cache.stats())
            .finish()
    }
}
