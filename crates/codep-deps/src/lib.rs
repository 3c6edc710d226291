//! # codep-deps
//!
//! Keeps codependencies aligned across Node, Go and Python manifests.
//!
//! This crate provides functionality to:
//! - Read and rewrite `package.json`, `go.mod`, `requirements*.txt`,
//!   `pyproject.toml` and `Pipfile` manifests
//! - Resolve target versions through the ecosystem's own tooling, with a TTL
//!   cache and de-duplication of in-flight lookups
//! - Compute specifier-preserving update lists in pinned or permissive mode
//! - Report per-package diffs as a table, JSON or markdown
//!
//! ## Architecture
//!
//! One [`EcosystemProvider`] per ecosystem, selected through the
//! [`ProviderRegistry`]. Providers reach the outside world only through the
//! [`FileSystem`](codep_fs::FileSystem) and [`CommandRunner`] traits, so the
//! whole pass runs against in-memory fakes in tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use codep_config::{CodepConfig, PythonBackend};
//! use codep_deps::{
//!     ProviderContext, ProviderRegistry, ReconciliationEngine, RequestDeduplicator,
//!     ResponseCache, TokioCommandRunner,
//! };
//! use codep_fs::NativeFileSystem;
//! use std::sync::Arc;
//!
//! # async fn example() -> codep_deps::Result<()> {
//! let config = CodepConfig {
//!     codependencies: Some(vec!["react".into()]),
//!     ..Default::default()
//! };
//! let fs = Arc::new(NativeFileSystem::new(".")?);
//! let runner = Arc::new(TokioCommandRunner::new(config.timeout()));
//! let ctx = ProviderContext::new(fs.clone(), runner, false);
//! let registry = ProviderRegistry::with_defaults(ctx, false, PythonBackend::Pip);
//!
//! let engine = ReconciliationEngine::new(
//!     config,
//!     registry,
//!     fs,
//!     Arc::new(ResponseCache::default()),
//!     Arc::new(RequestDeduplicator::new()),
//! );
//! let report = engine.reconcile().await?;
//! println!("{}", report.verdict.as_str());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod command;
pub mod dedupe;
pub mod diff;
pub mod engine;
pub mod error;
pub mod go;
pub mod node;
pub mod python;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod suggest;
pub mod traits;
pub mod types;
pub mod update;
pub mod version;

// Re-export main types and traits
pub use error::{Error, ResolutionErrorKind, ResolutionFailure, Result};
pub use traits::{EcosystemProvider, ProviderContext};
pub use types::{
    CodependencyItem, DepUpdateItem, DependencyMap, DependencySection, Language, Manifest,
    SectionUpdates, ValidationResult, VersionMap,
};

// Re-export providers and the command seam
pub use command::{CommandOutput, CommandRunner, TokioCommandRunner};
#[cfg(any(test, feature = "test-utils"))]
pub use command::ScriptedCommandRunner;
pub use go::GoProvider;
pub use node::{NodeBackend, NodeProvider};
pub use python::{PythonFormat, PythonProvider};
pub use registry::ProviderRegistry;

// Re-export resolution
pub use cache::{CacheStats, ResponseCache};
pub use dedupe::RequestDeduplicator;
pub use resolver::{LookupResult, ProgressCallback, ResolveOptions, VersionResolver};

// Re-export comparison, reconciliation and reporting
pub use diff::{build_version_diff, collect_all_diffs, VersionDiff};
pub use engine::{FileReport, ReconciliationEngine, ReconciliationReport, Verdict};
pub use report::{render_report, summarize, DiffSummary, ReportFormatter};
pub use version::{
    classify_update, construct_deps_to_update_list, construct_permissive_deps_to_update_list,
    construct_version_types, is_current, UpdateType, VersionTypes,
};
