//! Provider selection by manifest file name or configured language

use crate::go::GoProvider;
use crate::node::{NodeBackend, NodeProvider};
use crate::python::{PythonFormat, PythonProvider};
use crate::traits::{EcosystemProvider, ProviderContext};
use crate::types::Language;
use crate::{Error, Result};
use codep_config::PythonBackend;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Maps manifests and languages to their providers
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Language, Arc<dyn EcosystemProvider>>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Node, Go and Python providers.
    ///
    /// `yarn` switches Node lookups to yarn; `python_backend` picks the
    /// Python lookup tool.
    pub fn with_defaults(ctx: ProviderContext, yarn: bool, python_backend: PythonBackend) -> Self {
        let node_backend = if yarn { NodeBackend::Yarn } else { NodeBackend::Npm };

        let mut registry = Self::new();
        registry.register(Arc::new(NodeProvider::new(ctx.clone(), node_backend)));
        registry.register(Arc::new(GoProvider::new(ctx.clone())));
        registry.register(Arc::new(PythonProvider::new(ctx, python_backend)));
        registry
    }

    /// Add or replace the provider for its language
    pub fn register(&mut self, provider: Arc<dyn EcosystemProvider>) {
        self.providers.insert(provider.language(), provider);
    }

    /// Language of a manifest, from its file name
    pub fn detect_language(path: &Path) -> Option<Language> {
        match path.file_name()?.to_str()? {
            "package.json" => Some(Language::NodeJs),
            "go.mod" => Some(Language::Go),
            _ if PythonFormat::from_path(path).is_some() => Some(Language::Python),
            _ => None,
        }
    }

    /// Provider for a language
    ///
    /// # Errors
    /// Returns [`Error::Policy`] when nothing is registered for `language`
    pub fn provider_for_language(&self, language: Language) -> Result<Arc<dyn EcosystemProvider>> {
        self.providers
            .get(&language)
            .cloned()
            .ok_or_else(|| Error::Policy(format!("no provider registered for {}", language)))
    }

    /// Provider for a manifest path
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedManifest`] for unknown file names
    pub fn provider_for_path(&self, path: &Path) -> Result<Arc<dyn EcosystemProvider>> {
        let language = Self::detect_language(path)
            .ok_or_else(|| Error::UnsupportedManifest(path.to_path_buf()))?;
        self.provider_for_language(language)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<String> = self.providers.keys().map(|l| l.to_string()).collect();
        languages.sort();
        f.debug_struct("ProviderRegistry")
            .field("languages", &languages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ScriptedCommandRunner;
    use codep_fs::MemoryFileSystem;

    fn registry(yarn: bool) -> ProviderRegistry {
        let fs = Arc::new(MemoryFileSystem::empty("/repo").unwrap());
        let ctx = ProviderContext::new(fs, Arc::new(ScriptedCommandRunner::new()), true);
        ProviderRegistry::with_defaults(ctx, yarn, PythonBackend::Uv)
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(
            ProviderRegistry::detect_language(Path::new("web/package.json")),
            Some(Language::NodeJs)
        );
        assert_eq!(
            ProviderRegistry::detect_language(Path::new("svc/go.mod")),
            Some(Language::Go)
        );
        assert_eq!(
            ProviderRegistry::detect_language(Path::new("requirements-dev.txt")),
            Some(Language::Python)
        );
        assert_eq!(ProviderRegistry::detect_language(Path::new("Cargo.toml")), None);
    }

    #[test]
    fn test_provider_for_path() {
        let registry = registry(false);
        assert_eq!(
            registry
                .provider_for_path(Path::new("/repo/Pipfile"))
                .unwrap()
                .backend(),
            "uv"
        );
        assert!(matches!(
            registry.provider_for_path(Path::new("/repo/Cargo.toml")),
            Err(Error::UnsupportedManifest(_))
        ));
    }

    #[test]
    fn test_yarn_backend() {
        let provider = registry(true)
            .provider_for_language(Language::NodeJs)
            .unwrap();
        assert_eq!(provider.backend(), "yarn");
    }

    #[test]
    fn test_empty_registry() {
        let result = ProviderRegistry::new().provider_for_language(Language::Go);
        assert!(matches!(result, Err(Error::Policy(_))));
    }
}
