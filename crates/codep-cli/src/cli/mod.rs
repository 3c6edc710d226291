//! Reconciliation run wiring.

use anyhow::{Context, Result};
use codep_config::{CodependencyItem, CodepConfig, ConfigManager, LoadedConfig};
use codep_deps::{
    render_report, ProviderContext, ProviderRegistry, ReconciliationEngine, RequestDeduplicator,
    ResponseCache, TokioCommandRunner,
};
use codep_fs::NativeFileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// `name` or `name@version`; a leading `@` belongs to a scoped npm name
pub fn parse_codependency(arg: &str) -> CodependencyItem {
    match arg.rfind('@') {
        Some(at) if at > 0 => CodependencyItem::Pinned {
            name: arg[..at].to_string(),
            version: arg[at + 1..].to_string(),
        },
        _ => CodependencyItem::Name(arg.to_string()),
    }
}

/// Where configuration is read from for one invocation.
///
/// Relative `--root-dir` and `--config` paths resolve against the working
/// directory.
pub struct ConfigScope {
    /// Directory searched for a config file when none is given
    pub root: PathBuf,
    /// Explicit config file, if any
    pub explicit: Option<PathBuf>,
    manager: ConfigManager<NativeFileSystem>,
}

impl ConfigScope {
    /// Resolve the scope for `overrides` from `cwd`
    pub fn new(cwd: &Path, explicit: Option<PathBuf>, overrides: &CodepConfig) -> Result<Self> {
        let root = cwd.join(overrides.root_dir());
        let explicit = explicit.map(|path| cwd.join(path));
        // An explicit file may live outside the scanned tree
        let scope = explicit.as_deref().and_then(Path::parent).unwrap_or(&root);
        let fs = NativeFileSystem::new(scope)
            .with_context(|| format!("Failed to open {}", scope.display()))?;

        Ok(Self {
            root,
            explicit,
            manager: ConfigManager::new(Arc::new(fs)),
        })
    }

    /// Find and parse the config file, without merging
    pub async fn load(&self) -> Result<LoadedConfig> {
        let loaded = self
            .manager
            .load(&self.root, self.explicit.as_deref())
            .await
            .context("Failed to load configuration")?;
        if let Some(source) = &loaded.source {
            debug!("Using configuration from {}", source.display());
        }
        Ok(loaded)
    }
}

/// Load, merge and validate the configuration for this run.
///
/// The returned record carries the canonical root directory.
pub async fn load_config(
    cwd: &Path,
    explicit: Option<PathBuf>,
    overrides: CodepConfig,
) -> Result<CodepConfig> {
    let loaded = ConfigScope::new(cwd, explicit, &overrides)?.load().await?;

    let (mut config, validation) = ConfigManager::<NativeFileSystem>::resolve(loaded, overrides)?;
    for warning in &validation.warnings {
        warn!("{}", warning);
    }

    let root = cwd.join(config.root_dir());
    let root = root
        .canonicalize()
        .with_context(|| format!("Root directory does not exist: {}", root.display()))?;
    config.root_dir = Some(root);
    Ok(config)
}

/// Run one reconciliation pass and print the report.
///
/// Returns the process exit code for the verdict.
pub fn run_reconcile(explicit: Option<PathBuf>, overrides: CodepConfig) -> Result<u8> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let working_dir = std::env::current_dir().context("Failed to get current working directory")?;

    runtime.block_on(reconcile_in(&working_dir, explicit, overrides))
}

/// Reconcile with relative paths taken from `cwd`.
///
/// The filesystem is scoped to the resolved root directory, which may sit
/// outside `cwd`.
pub async fn reconcile_in(
    cwd: &Path,
    explicit: Option<PathBuf>,
    overrides: CodepConfig,
) -> Result<u8> {
    let config = load_config(cwd, explicit, overrides).await?;
    let fs = Arc::new(NativeFileSystem::new(config.root_dir())?);

    let runner = Arc::new(TokioCommandRunner::new(config.timeout()));
    let ctx = ProviderContext::new(fs.clone(), runner, config.testing);
    let registry = ProviderRegistry::with_defaults(
        ctx,
        config.yarn_config,
        config.python_backend.unwrap_or_default(),
    );
    let format = config.format;
    let cache = Arc::new(ResponseCache::new(config.cache_ttl()));

    let engine = ReconciliationEngine::new(
        config,
        registry,
        fs,
        cache,
        Arc::new(RequestDeduplicator::new()),
    )
    .with_progress(Arc::new(|done: usize, total: usize, name: &str| {
        debug!("Resolved {}/{}: {}", done, total, name);
    }));

    let report = engine.reconcile().await?;
    print!("{}", render_report(format, &report)?);

    Ok(u8::try_from(report.verdict.exit_code()).unwrap_or(1))
}
