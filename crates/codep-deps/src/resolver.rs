//! Resolves codependencies to target versions through the provider, the
//! shared cache and the request de-duplicator

use crate::cache::ResponseCache;
use crate::dedupe::RequestDeduplicator;
use crate::error::{ResolutionErrorKind, ResolutionFailure};
use crate::suggest::suggest_package;
use crate::traits::EcosystemProvider;
use crate::types::{CodependencyItem, VersionMap};
use crate::{Error, Result};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one de-duplicated lookup, shared by every waiting caller
pub type LookupResult = std::result::Result<String, ResolutionFailure>;

/// Progress callback: `(done, total, package)`
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Substrings marking a lookup failure as a connectivity problem
const NETWORK_MARKERS: &[&str] = &[
    "econnrefused",
    "etimedout",
    "enotfound",
    "eai_again",
    "econnreset",
    "timed out",
    "connection refused",
    "getaddrinfo",
    "could not resolve host",
    "temporary failure in name resolution",
    "network is unreachable",
];

/// Options for one resolution pass
#[derive(Clone, Default)]
pub struct ResolveOptions {
    /// Bypass the cache for reads and writes
    pub no_cache: bool,
    /// Drop failed items instead of failing the pass
    pub testing: bool,
    /// Called after each cache hit or successful lookup
    pub progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("no_cache", &self.no_cache)
            .field("testing", &self.testing)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Network-class when the registry could not be reached, validation-class
/// for everything else
pub fn classify_error(error: &Error) -> ResolutionErrorKind {
    if matches!(error, Error::CommandTimeout { .. }) {
        return ResolutionErrorKind::Network;
    }

    let message = error.to_string().to_lowercase();
    if NETWORK_MARKERS.iter().any(|marker| message.contains(marker)) {
        ResolutionErrorKind::Network
    } else {
        ResolutionErrorKind::Validation
    }
}

fn validation_failure(name: &str, message: impl Into<String>) -> ResolutionFailure {
    ResolutionFailure {
        name: name.to_string(),
        kind: ResolutionErrorKind::Validation,
        message: message.into(),
        suggestion: suggest_package(name).map(String::from),
    }
}

/// Ask the registry; never touches the cache
async fn lookup(provider: Arc<dyn EcosystemProvider>, name: String) -> LookupResult {
    match provider.get_latest_version(&name).await {
        Ok(version) if !version.trim().is_empty() => Ok(version.trim().to_string()),
        Ok(_) => Err(validation_failure(&name, "package not found in the registry")),
        Err(error) => {
            let kind = classify_error(&error);
            Err(ResolutionFailure {
                suggestion: match kind {
                    ResolutionErrorKind::Validation => suggest_package(&name).map(String::from),
                    ResolutionErrorKind::Network => None,
                },
                name,
                kind,
                message: error.to_string(),
            })
        }
    }
}

/// Builds the name → target version map for one ecosystem
pub struct VersionResolver {
    provider: Arc<dyn EcosystemProvider>,
    cache: Arc<ResponseCache>,
    dedupe: Arc<RequestDeduplicator<LookupResult>>,
}

impl VersionResolver {
    /// Create a resolver over shared cache and de-duplicator instances
    pub fn new(
        provider: Arc<dyn EcosystemProvider>,
        cache: Arc<ResponseCache>,
        dedupe: Arc<RequestDeduplicator<LookupResult>>,
    ) -> Self {
        Self {
            provider,
            cache,
            dedupe,
        }
    }

    /// Resolve every item concurrently and fold the results in input order.
    ///
    /// Pinned items pass through without a lookup. Later duplicates
    /// overwrite earlier ones.
    ///
    /// # Errors
    /// Outside testing mode the first failed item (in input order) is
    /// returned as [`Error::Resolution`]. In testing mode failed items are
    /// logged and left out of the map.
    pub async fn construct_version_map(
        &self,
        items: &[CodependencyItem],
        options: &ResolveOptions,
    ) -> Result<VersionMap> {
        let total = items.len();
        let done = AtomicUsize::new(0);

        let results = join_all(
            items
                .iter()
                .map(|item| self.resolve_item(item, options, &done, total)),
        )
        .await;

        let mut version_map = VersionMap::new();
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(version) => {
                    version_map.insert(item.name().to_string(), version);
                }
                Err(failure) if options.testing => {
                    warn!("{}", failure);
                }
                Err(failure) => return Err(failure.into()),
            }
        }

        debug!(
            "Resolved {} of {} codependencies",
            version_map.len(),
            items.len()
        );
        Ok(version_map)
    }

    async fn resolve_item(
        &self,
        item: &CodependencyItem,
        options: &ResolveOptions,
        done: &AtomicUsize,
        total: usize,
    ) -> LookupResult {
        let name = match item {
            CodependencyItem::Pinned { version, .. } => return Ok(version.clone()),
            CodependencyItem::Name(name) => name,
        };

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(validation_failure(
                name,
                "package name must be non-empty and contain no spaces",
            ));
        }

        let validation = self.provider.validate_package_name(name);
        if !validation.is_valid() {
            return Err(validation_failure(name, validation.summary()));
        }

        let report = || {
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = &options.progress {
                progress(finished, total, name);
            }
        };

        let key = format!("{}:{}", self.provider.backend(), name);
        if !options.no_cache {
            if let Some(version) = self.cache.get(&key) {
                report();
                return Ok(version);
            }
        }

        let provider = self.provider.clone();
        let owned_name = name.clone();
        let result = self
            .dedupe
            .dedupe(&key, move || lookup(provider, owned_name))
            .await;

        if let Ok(version) = &result {
            if !options.no_cache {
                self.cache.set(key, version.clone());
            }
            report();
        }
        result
    }
}

impl std::fmt::Debug for VersionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionResolver")
            .field("backend", &self.provider.backend())
            .field("cache", &self.cache.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, ScriptedCommandRunner};
    use crate::node::{NodeBackend, NodeProvider};
    use crate::traits::ProviderContext;
    use codep_fs::MemoryFileSystem;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn resolver(runner: Arc<ScriptedCommandRunner>) -> (VersionResolver, Arc<ResponseCache>) {
        let fs = Arc::new(MemoryFileSystem::empty("/repo").unwrap());
        let provider = Arc::new(NodeProvider::new(
            ProviderContext::new(fs, runner, true),
            NodeBackend::Npm,
        ));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(300)));
        (
            VersionResolver::new(provider, cache.clone(), Arc::new(RequestDeduplicator::new())),
            cache,
        )
    }

    fn npm_latest(name: &str) -> String {
        format!("npm view {} version latest", name)
    }

    #[tokio::test]
    async fn test_pinned_items_skip_lookup() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        let (resolver, _) = resolver(runner.clone());

        let items = vec![CodependencyItem::Pinned {
            name: "react".into(),
            version: "17.0.2".into(),
        }];
        let map = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(map["react"], "17.0.2");
        assert_eq!(runner.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolves_and_caches() {
        let runner = Arc::new(
            ScriptedCommandRunner::new()
                .respond(&npm_latest("react"), CommandOutput::ok("18.2.0\n"))
                .respond(&npm_latest("lodash"), CommandOutput::ok("4.17.21\n")),
        );
        let (resolver, cache) = resolver(runner.clone());
        let items: Vec<CodependencyItem> = vec!["react".into(), "lodash".into()];

        let first = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await
            .unwrap();
        let second = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first["lodash"], "4.17.21");
        assert_eq!(runner.total_calls(), 2);
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_no_cache_always_queries() {
        let runner = Arc::new(
            ScriptedCommandRunner::new().respond(&npm_latest("react"), CommandOutput::ok("18.2.0")),
        );
        let (resolver, cache) = resolver(runner.clone());
        let options = ResolveOptions {
            no_cache: true,
            ..Default::default()
        };
        let items: Vec<CodependencyItem> = vec!["react".into()];

        resolver.construct_version_map(&items, &options).await.unwrap();
        resolver.construct_version_map(&items, &options).await.unwrap();

        assert_eq!(runner.calls(&npm_latest("react")), 2);
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_names_share_one_lookup() {
        let runner = Arc::new(
            ScriptedCommandRunner::new()
                .with_delay(Duration::from_millis(100))
                .respond(&npm_latest("react"), CommandOutput::ok("18.2.0")),
        );
        let (resolver, _) = resolver(runner.clone());
        let items: Vec<CodependencyItem> = vec!["react".into(), "react".into(), "react".into()];

        let map = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(runner.calls(&npm_latest("react")), 1);
    }

    #[tokio::test]
    async fn test_not_found_fails_with_suggestion() {
        let runner = Arc::new(ScriptedCommandRunner::new().respond(
            &npm_latest("reactt"),
            CommandOutput::failed(1, "npm ERR! 404 Not Found"),
        ));
        let (resolver, cache) = resolver(runner);
        let items: Vec<CodependencyItem> = vec!["reactt".into()];

        let err = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await
            .unwrap_err();

        let failure = match err {
            Error::Resolution(failure) => failure,
            other => panic!("expected resolution error, got {other:?}"),
        };
        assert_eq!(failure.kind, ResolutionErrorKind::Validation);
        assert_eq!(failure.suggestion.as_deref(), Some("react"));
        assert!(failure.to_string().contains("Did you mean 'react'?"));
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_network_failure_is_classified() {
        let runner = Arc::new(ScriptedCommandRunner::new().respond(
            &npm_latest("react"),
            CommandOutput::failed(1, "npm ERR! code ECONNREFUSED"),
        ));
        let (resolver, _) = resolver(runner);
        let items: Vec<CodependencyItem> = vec!["react".into()];

        let err = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionFailure {
                kind: ResolutionErrorKind::Network,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_testing_mode_drops_failures() {
        let runner = Arc::new(
            ScriptedCommandRunner::new()
                .respond(&npm_latest("react"), CommandOutput::ok("18.2.0"))
                .respond(
                    &npm_latest("reactt"),
                    CommandOutput::failed(1, "npm ERR! code E404"),
                ),
        );
        let (resolver, _) = resolver(runner);
        let options = ResolveOptions {
            testing: true,
            ..Default::default()
        };
        let items: Vec<CodependencyItem> =
            vec!["react".into(), "reactt".into(), "has space".into()];

        let map = resolver.construct_version_map(&items, &options).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["react"], "18.2.0");
    }

    #[tokio::test]
    async fn test_invalid_name_never_queries() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        let (resolver, _) = resolver(runner.clone());
        let items: Vec<CodependencyItem> = vec!["_private".into()];

        let result = resolver
            .construct_version_map(&items, &ResolveOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Resolution(_))));
        assert_eq!(runner.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_reports_each_resolution() {
        let runner = Arc::new(
            ScriptedCommandRunner::new()
                .respond(&npm_latest("react"), CommandOutput::ok("18.2.0"))
                .respond(&npm_latest("vue"), CommandOutput::ok("3.4.0")),
        );
        let (resolver, _) = resolver(runner);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = ResolveOptions {
            progress: Some(Arc::new(move |done: usize, total: usize, name: &str| {
                sink.lock().push((done, total, name.to_string()));
            })),
            ..Default::default()
        };
        let items: Vec<CodependencyItem> = vec!["react".into(), "vue".into()];

        resolver.construct_version_map(&items, &options).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(_, total, _)| *total == 2));
        assert_eq!(seen.iter().map(|(done, _, _)| *done).max(), Some(2));
    }

    #[test]
    fn test_classify_error() {
        let timeout = Error::CommandTimeout {
            command: "npm view react version latest".into(),
            timeout_secs: 30,
        };
        assert_eq!(classify_error(&timeout), ResolutionErrorKind::Network);

        let dns = Error::CommandFailed {
            command: "pip index versions flask".into(),
            status: "status 1".into(),
            stderr: "Temporary failure in name resolution".into(),
        };
        assert_eq!(classify_error(&dns), ResolutionErrorKind::Network);

        let invalid = Error::InvalidFormat("package.json".into(), "bad".into());
        assert_eq!(classify_error(&invalid), ResolutionErrorKind::Validation);
    }
}
