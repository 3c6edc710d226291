//! Specifier arithmetic: splitting range prefixes from versions and
//! computing per-section update lists

use crate::types::{DepUpdateItem, DependencyMap, VersionMap};
use serde::Serialize;
use std::collections::BTreeSet;

/// Comparison operators that may follow a range prefix, longest first
const OPERATORS: &[&str] = &["===", "==", "~=", "!=", ">=", "<=", ">", "<", "="];

/// Range prefix characters tracked as the bump character
const BUMP_CHARS: &[char] = &['^', '~'];

/// A specifier split into its range prefix and bare version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTypes {
    /// First leading `^` or `~`, or empty
    pub bump_character: String,
    /// The specifier exactly as written
    pub bump_version: String,
    /// The specifier with every leading `^`/`~` removed
    pub exact_version: String,
}

/// Split a specifier into bump character and exact version.
///
/// `"^~^1.2.3"` yields bump `"^"` and exact `"1.2.3"`; a specifier without
/// a leading `^`/`~` is its own exact version.
pub fn construct_version_types(specifier: &str) -> VersionTypes {
    let exact = specifier.trim_start_matches(BUMP_CHARS);
    let bump_character = if exact.len() == specifier.len() {
        String::new()
    } else {
        specifier.chars().take(1).collect()
    };

    VersionTypes {
        bump_character,
        bump_version: specifier.to_string(),
        exact_version: exact.to_string(),
    }
}

/// Split a leading comparison operator (`>=`, `==`, ...) from a version
pub fn split_operator(version: &str) -> (&str, &str) {
    OPERATORS
        .iter()
        .find_map(|op| version.strip_prefix(op).map(|rest| (*op, rest.trim_start())))
        .unwrap_or(("", version))
}

/// Whether `specifier` already names `target`, ignoring any bump character
/// and comparison operator: `^2.0.0`, `>=2.0.0` and `==2.0.0` all match
/// `2.0.0`.
pub fn is_current(specifier: &str, target: &str) -> bool {
    let exact = construct_version_types(specifier).exact_version;
    let (_, bare) = split_operator(&exact);
    exact == target || bare == target
}

/// Update items for one section against resolved targets.
///
/// Names missing from `version_map` and names already at their target are
/// skipped. The emitted `expected` keeps the original prefix: `^1.0.0`
/// against `2.0.0` becomes `^2.0.0`, `>=2.0.0` becomes `>=3.0.0`.
pub fn construct_deps_to_update_list(
    section: &DependencyMap,
    version_map: &VersionMap,
) -> Vec<DepUpdateItem> {
    section
        .iter()
        .filter_map(|(name, specifier)| {
            let target = version_map.get(name)?;
            if target.is_empty() {
                return None;
            }

            if is_current(specifier, target) {
                return None;
            }

            let types = construct_version_types(specifier);
            let (operator, _) = split_operator(&types.exact_version);

            Some(DepUpdateItem {
                name: name.clone(),
                actual: specifier.clone(),
                exact: target.clone(),
                expected: format!("{}{}{}", types.bump_character, operator, target),
            })
        })
        .collect()
}

/// Permissive branch: every dependency not in `pinned` moves to `latest`
pub fn construct_permissive_deps_to_update_list(
    section: &DependencyMap,
    pinned: &BTreeSet<String>,
) -> Vec<DepUpdateItem> {
    section
        .iter()
        .filter(|(name, _)| !pinned.contains(*name))
        .map(|(name, specifier)| DepUpdateItem {
            name: name.clone(),
            actual: specifier.clone(),
            exact: "latest".to_string(),
            expected: "latest".to_string(),
        })
        .collect()
}

/// Type of version update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// Major version bump (1.0.0 -> 2.0.0) - potentially breaking
    Major,
    /// Minor version bump (1.0.0 -> 1.1.0) - new features
    Minor,
    /// Patch version bump (1.0.0 -> 1.0.1) - bug fixes
    Patch,
    /// No update needed - already on latest
    None,
}

impl UpdateType {
    /// Check if this is a breaking change
    pub fn is_breaking(&self) -> bool {
        matches!(self, UpdateType::Major)
    }

    /// Lowercase label used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::None => "none",
        }
    }
}

/// Strip range prefixes, comparison operators and a `v` tag prefix
fn bare_version(specifier: &str) -> &str {
    let exact = specifier.trim().trim_start_matches(BUMP_CHARS);
    let (_, bare) = split_operator(exact);
    bare.trim_start_matches(BUMP_CHARS).trim_start_matches('v')
}

/// Classify the move from `current` to `latest` by the first differing
/// dot-separated segment: index 0 is major, 1 minor, anything later patch.
pub fn classify_update(current: &str, latest: &str) -> UpdateType {
    let current: Vec<&str> = bare_version(current).split('.').collect();
    let latest: Vec<&str> = bare_version(latest).split('.').collect();

    let first_difference = (0..current.len().max(latest.len()))
        .find(|&i| current.get(i).copied().unwrap_or("") != latest.get(i).copied().unwrap_or(""));

    match first_difference {
        None => UpdateType::None,
        Some(0) => UpdateType::Major,
        Some(1) => UpdateType::Minor,
        Some(_) => UpdateType::Patch,
    }
}
