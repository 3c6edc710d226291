//! Per-package version diffs across manifests

use crate::types::{Manifest, VersionMap};
use crate::version::{classify_update, is_current, UpdateType};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Current vs. target version of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiff {
    /// Package name
    pub package: String,
    /// Specifier found in the manifest
    pub current: String,
    /// Resolved target version
    pub latest: String,
    /// Listed as a codependency
    pub is_pinned: bool,
    /// The run would change this package
    pub will_update: bool,
}

impl VersionDiff {
    /// Size of the move from `current` to `latest`
    pub fn severity(&self) -> UpdateType {
        classify_update(&self.current, &self.latest)
    }
}

/// Diff every manifest dependency that also has a resolved target.
///
/// Pinned mode updates pinned packages not already at the target, by the
/// same [`is_current`] rule as the update lists; permissive mode updates
/// everything that is not pinned.
pub fn build_version_diff(
    version_map: &VersionMap,
    manifest: &Manifest,
    pinned: &BTreeSet<String>,
    permissive: bool,
) -> Vec<VersionDiff> {
    manifest
        .all_dependencies()
        .filter_map(|(name, current)| {
            let latest = version_map.get(name)?;
            let is_pinned = pinned.contains(name);
            let will_update = if permissive {
                !is_pinned
            } else {
                is_pinned && !latest.is_empty() && !is_current(current, latest)
            };

            Some(VersionDiff {
                package: name.clone(),
                current: current.clone(),
                latest: latest.clone(),
                is_pinned,
                will_update,
            })
        })
        .collect()
}

/// Union of per-file diffs; the first occurrence of a package wins
pub fn collect_all_diffs<I>(per_file: I) -> Vec<VersionDiff>
where
    I: IntoIterator<Item = Vec<VersionDiff>>,
{
    let mut seen = HashSet::new();
    per_file
        .into_iter()
        .flatten()
        .filter(|diff| seen.insert(diff.package.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyMap;

    fn manifest(deps: &[(&str, &str)]) -> Manifest {
        let mut manifest = Manifest::new("package.json");
        manifest.dependencies = deps
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        manifest
    }

    fn manifest_with(flask: &str) -> Manifest {
        manifest(&[("flask", flask)])
    }

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_pinned_mode_diff() {
        let version_map = VersionMap::from([
            ("react".to_string(), "18.2.0".to_string()),
            ("lodash".to_string(), "4.17.21".to_string()),
        ]);
        let manifest = manifest(&[
            ("react", "^17.0.2"),
            ("lodash", "4.17.21"),
            ("express", "^4.0.0"),
        ]);

        let diffs = build_version_diff(&version_map, &manifest, &names(&["react", "lodash"]), false);

        assert_eq!(diffs.len(), 2);
        let react = diffs.iter().find(|d| d.package == "react").unwrap();
        assert!(react.will_update);
        assert_eq!(react.severity(), UpdateType::Major);
        let lodash = diffs.iter().find(|d| d.package == "lodash").unwrap();
        assert!(!lodash.will_update);
    }

    #[test]
    fn test_operator_specifier_at_target_is_not_outdated() {
        let version_map = VersionMap::from([("flask".to_string(), "3.0.0".to_string())]);

        for specifier in [">=3.0.0", "==3.0.0", "~=3.0.0", ">= 3.0.0"] {
            let manifest = manifest_with(specifier);
            let updates = crate::version::construct_deps_to_update_list(
                &manifest.dependencies,
                &version_map,
            );
            let diffs = build_version_diff(&version_map, &manifest, &names(&["flask"]), false);

            assert!(updates.is_empty(), "{}", specifier);
            assert!(!diffs[0].will_update, "{}", specifier);
            assert_eq!(diffs[0].severity(), UpdateType::None, "{}", specifier);
        }

        let diffs = build_version_diff(
            &version_map,
            &manifest_with("==2.0.0"),
            &names(&["flask"]),
            false,
        );
        assert!(diffs[0].will_update);
    }

    #[test]
    fn test_permissive_mode_diff() {
        let version_map = VersionMap::from([("react".to_string(), "18.2.0".to_string())]);
        let mut manifest = manifest(&[("react", "18.2.0")]);
        manifest.dev_dependencies = Some(DependencyMap::from([(
            "react".to_string(),
            "17.0.0".to_string(),
        )]));

        let diffs = build_version_diff(&version_map, &manifest, &names(&["react"]), true);
        assert!(diffs.iter().all(|d| d.is_pinned && !d.will_update));
    }

    #[test]
    fn test_collect_all_diffs_first_wins() {
        let first = VersionDiff {
            package: "react".into(),
            current: "^17.0.0".into(),
            latest: "18.2.0".into(),
            is_pinned: true,
            will_update: true,
        };
        let second = VersionDiff {
            current: "^18.0.0".into(),
            ..first.clone()
        };

        let all = collect_all_diffs(vec![vec![first.clone()], vec![second]]);
        assert_eq!(all, vec![first]);
    }
}
