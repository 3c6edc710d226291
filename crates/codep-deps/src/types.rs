//! Core types for reconciliation

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use codep_config::{CodependencyItem, Language, ValidationResult};

/// Package name to specifier, one manifest section
pub type DependencyMap = BTreeMap<String, String>;

/// Package name to resolved target version
pub type VersionMap = BTreeMap<String, String>;

/// A dependency section of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DependencySection {
    /// Runtime dependencies
    Dependencies,
    /// Development dependencies
    DevDependencies,
    /// Peer dependencies (npm only)
    PeerDependencies,
}

impl DependencySection {
    /// All sections, in reconciliation order
    pub const ALL: [DependencySection; 3] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::PeerDependencies,
    ];

    /// package.json key for this section
    pub fn key(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
        }
    }
}

/// A parsed manifest file (package.json, go.mod, requirements.txt, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Path to the file
    pub path: PathBuf,
    /// Package or module name
    pub name: Option<String>,
    /// Package version, or the `go` directive for go.mod
    pub version: Option<String>,
    /// Runtime dependencies
    pub dependencies: DependencyMap,
    /// Development dependencies, `None` when the manifest has no such section
    pub dev_dependencies: Option<DependencyMap>,
    /// Peer dependencies, `None` when the manifest has no such section
    pub peer_dependencies: Option<DependencyMap>,
}

impl Manifest {
    /// Empty manifest for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Get a section, `None` if absent
    pub fn section(&self, section: DependencySection) -> Option<&DependencyMap> {
        match section {
            DependencySection::Dependencies => Some(&self.dependencies),
            DependencySection::DevDependencies => self.dev_dependencies.as_ref(),
            DependencySection::PeerDependencies => self.peer_dependencies.as_ref(),
        }
    }

    fn section_mut(&mut self, section: DependencySection) -> Option<&mut DependencyMap> {
        match section {
            DependencySection::Dependencies => Some(&mut self.dependencies),
            DependencySection::DevDependencies => self.dev_dependencies.as_mut(),
            DependencySection::PeerDependencies => self.peer_dependencies.as_mut(),
        }
    }

    /// Iterate every dependency across all present sections
    pub fn all_dependencies(&self) -> impl Iterator<Item = (&String, &String)> {
        DependencySection::ALL
            .into_iter()
            .filter_map(move |section| self.section(section))
            .flatten()
    }

    /// Overwrite the listed names in `section` with their expected
    /// specifiers. Other keys are kept; absent sections stay absent.
    pub fn apply_updates(&mut self, section: DependencySection, updates: &[DepUpdateItem]) {
        if let Some(deps) = self.section_mut(section) {
            for update in updates {
                deps.insert(update.name.clone(), update.expected.clone());
            }
        }
    }
}

/// One dependency whose specifier should change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepUpdateItem {
    /// Package name
    pub name: String,
    /// Specifier currently in the manifest
    pub actual: String,
    /// Target version without a range prefix
    pub exact: String,
    /// Target version with the original prefix re-applied
    pub expected: String,
}

/// Update lists for one manifest, one per section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionUpdates {
    /// `dependencies` updates
    pub dependencies: Vec<DepUpdateItem>,
    /// `devDependencies` updates
    pub dev_dependencies: Vec<DepUpdateItem>,
    /// `peerDependencies` updates
    pub peer_dependencies: Vec<DepUpdateItem>,
}

impl SectionUpdates {
    /// Updates for one section
    pub fn get(&self, section: DependencySection) -> &[DepUpdateItem] {
        match section {
            DependencySection::Dependencies => &self.dependencies,
            DependencySection::DevDependencies => &self.dev_dependencies,
            DependencySection::PeerDependencies => &self.peer_dependencies,
        }
    }

    /// A manifest needs updating iff any section list is non-empty
    pub fn needs_update(&self) -> bool {
        DependencySection::ALL
            .iter()
            .any(|section| !self.get(*section).is_empty())
    }

    /// Total number of updates
    pub fn len(&self) -> usize {
        DependencySection::ALL
            .iter()
            .map(|section| self.get(*section).len())
            .sum()
    }

    /// No updates in any section
    pub fn is_empty(&self) -> bool {
        !self.needs_update()
    }
}
