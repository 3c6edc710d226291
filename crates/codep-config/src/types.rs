use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A tracked package: either a bare name resolved against the registry, or a
/// name pinned to an explicit version.
///
/// In configuration files this is either a string (`"react"`) or a
/// single-key object (`{ "react": "18.2.0" }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCodependency", into = "RawCodependency")]
pub enum CodependencyItem {
    /// Resolve the latest version of this package
    Name(String),
    /// Use this exact version without any lookup
    Pinned {
        /// Package name
        name: String,
        /// Target version
        version: String,
    },
}

impl CodependencyItem {
    /// Package name regardless of variant
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Pinned { name, .. } => name,
        }
    }
}

impl From<&str> for CodependencyItem {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCodependency {
    Name(String),
    Pinned(BTreeMap<String, String>),
}

impl TryFrom<RawCodependency> for CodependencyItem {
    type Error = String;

    fn try_from(raw: RawCodependency) -> Result<Self, Self::Error> {
        match raw {
            RawCodependency::Name(name) => Ok(Self::Name(name)),
            RawCodependency::Pinned(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "pinned codependency must have exactly one key, found {}",
                        map.len()
                    ));
                }
                let (name, version) = map.into_iter().next().ok_or("empty codependency")?;
                Ok(Self::Pinned { name, version })
            }
        }
    }
}

impl From<CodependencyItem> for RawCodependency {
    fn from(item: CodependencyItem) -> Self {
        match item {
            CodependencyItem::Name(name) => Self::Name(name),
            CodependencyItem::Pinned { name, version } => {
                Self::Pinned(BTreeMap::from([(name, version)]))
            }
        }
    }
}

/// Ecosystem selected for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// package.json manifests
    #[serde(alias = "node")]
    NodeJs,
    /// go.mod manifests
    Go,
    /// requirements.txt, pyproject.toml and Pipfile manifests
    Python,
}

impl Language {
    /// Default manifest patterns for this language
    pub fn default_patterns(&self) -> Vec<String> {
        let patterns: &[&str] = match self {
            Self::NodeJs => &["package.json"],
            Self::Go => &["go.mod"],
            Self::Python => &["requirements.txt", "pyproject.toml", "Pipfile"],
        };
        patterns.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeJs => write!(f, "nodejs"),
            Self::Go => write!(f, "go"),
            Self::Python => write!(f, "python"),
        }
    }
}

/// Package-manager used for Python version lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PythonBackend {
    /// `pip index versions`
    #[default]
    Pip,
    /// `uv pip index versions`
    Uv,
    /// `conda search --json`
    Conda,
}

/// Rendering of the version diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Box-drawn terminal table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Markdown table, suitable for PR comments
    Markdown,
}

/// Resolved configuration record consumed by the reconciliation engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodepConfig {
    /// Packages to track
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codependencies: Option<Vec<CodependencyItem>>,

    /// Update every dependency to latest except the codependencies
    pub permissive: bool,

    /// Manifest glob patterns relative to `root_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,

    /// Directory manifests are discovered from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    /// Glob patterns excluded from discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,

    /// Rewrite outdated manifests
    pub update: bool,

    /// Report the writes `update` would perform without performing them
    pub dry_run: bool,

    /// Query versions through yarn instead of npm
    pub yarn_config: bool,

    /// Disable the in-process version cache
    pub no_cache: bool,

    /// Ecosystem; detected from manifest file names when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,

    /// Python lookup backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_backend: Option<PythonBackend>,

    /// Diff rendering
    pub format: OutputFormat,

    /// Degrade failed lookups instead of failing, and never write or spawn
    /// post-write tooling
    #[serde(alias = "isTesting")]
    pub testing: bool,

    /// Per external command timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Version cache time-to-live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,

    /// Verbose logging
    pub debug: bool,

    /// Errors only
    pub quiet: bool,
}

/// Default external command timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default version cache time-to-live
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Patterns ignored during discovery unless `ignore` is configured
pub const DEFAULT_IGNORE: &[&str] = &["**/node_modules/**", "**/vendor/**", "**/.venv/**"];

impl CodepConfig {
    /// Codependency list, empty when not configured
    pub fn codependencies(&self) -> &[CodependencyItem] {
        self.codependencies.as_deref().unwrap_or(&[])
    }

    /// Names of all codependencies, in order
    pub fn codependency_names(&self) -> Vec<String> {
        self.codependencies()
            .iter()
            .map(|item| item.name().to_string())
            .collect()
    }

    /// Manifest patterns, falling back to the language defaults
    pub fn file_patterns(&self) -> Vec<String> {
        match (&self.files, self.language) {
            (Some(files), _) => files.clone(),
            (None, Some(language)) => language.default_patterns(),
            (None, None) => Language::NodeJs.default_patterns(),
        }
    }

    /// Ignore patterns, falling back to [`DEFAULT_IGNORE`]
    pub fn ignore_patterns(&self) -> Vec<String> {
        self.ignore
            .clone()
            .unwrap_or_else(|| DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect())
    }

    /// Discovery root
    pub fn root_dir(&self) -> PathBuf {
        self.root_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// External command timeout
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Version cache time-to-live
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    /// Whether manifests are rewritten this run
    pub fn writes_enabled(&self) -> bool {
        self.update && !self.dry_run && !self.testing
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Flags are OR-ed, optional values replace when present, and a
    /// non-default format replaces the file's format.
    pub fn merge(mut self, overrides: CodepConfig) -> Self {
        if overrides.codependencies.is_some() {
            self.codependencies = overrides.codependencies;
        }
        if overrides.files.is_some() {
            self.files = overrides.files;
        }
        if overrides.root_dir.is_some() {
            self.root_dir = overrides.root_dir;
        }
        if overrides.ignore.is_some() {
            self.ignore = overrides.ignore;
        }
        if overrides.language.is_some() {
            self.language = overrides.language;
        }
        if overrides.python_backend.is_some() {
            self.python_backend = overrides.python_backend;
        }
        if overrides.timeout_secs.is_some() {
            self.timeout_secs = overrides.timeout_secs;
        }
        if overrides.cache_ttl_secs.is_some() {
            self.cache_ttl_secs = overrides.cache_ttl_secs;
        }
        if overrides.format != OutputFormat::default() {
            self.format = overrides.format;
        }

        self.permissive |= overrides.permissive;
        self.update |= overrides.update;
        self.dry_run |= overrides.dry_run;
        self.yarn_config |= overrides.yarn_config;
        self.no_cache |= overrides.no_cache;
        self.testing |= overrides.testing;
        self.debug |= overrides.debug;
        self.quiet |= overrides.quiet;
        self
    }
}
