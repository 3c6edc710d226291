//! package.json provider with npm/yarn registry lookups

use super::naming::validate_npm_name;
use crate::command::command_line;
use crate::traits::{EcosystemProvider, ProviderContext};
use crate::types::{DependencyMap, DependencySection, Language, Manifest, ValidationResult};
use crate::update::FileUpdater;
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Registry query tool for Node packages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBackend {
    /// `npm view`
    Npm,
    /// `yarn npm info`
    Yarn,
}

/// Node.js provider: package.json manifests, npm or yarn lookups
#[derive(Debug, Clone)]
pub struct NodeProvider {
    ctx: ProviderContext,
    backend: NodeBackend,
}

impl NodeProvider {
    /// Create a provider querying through `backend`
    pub fn new(ctx: ProviderContext, backend: NodeBackend) -> Self {
        Self { ctx, backend }
    }

    async fn query(&self, args: &[&str]) -> Result<Option<String>> {
        let program = match self.backend {
            NodeBackend::Npm => "npm",
            NodeBackend::Yarn => "yarn",
        };
        let output = self.ctx.runner.run(program, args, None).await?;
        output.found_stdout(&command_line(program, args), NOT_FOUND)
    }
}

const NOT_FOUND: &[&str] = &["E404", "404 Not Found", "not found", "No matching version"];

/// Last non-empty line, stripped of JSON quoting
fn parse_plain_version(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// `{"version": "1.2.3"}` from `yarn npm info --fields version --json`
fn parse_yarn_field(stdout: &str, field: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(stdout.trim())?;
    Ok(value.get(field).cloned().unwrap_or(Value::Null))
}

/// npm prints a bare string instead of an array for single-version packages
fn versions_from_json(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Value::String(single) => vec![single],
        _ => vec![],
    }
}

fn section_from_json(value: Option<&Value>) -> Option<DependencyMap> {
    let object = value?.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(name, spec)| spec.as_str().map(|s| (name.clone(), s.to_string())))
            .collect(),
    )
}

#[async_trait::async_trait]
impl EcosystemProvider for NodeProvider {
    fn language(&self) -> Language {
        Language::NodeJs
    }

    fn backend(&self) -> &str {
        match self.backend {
            NodeBackend::Npm => "npm",
            NodeBackend::Yarn => "yarn",
        }
    }

    async fn get_latest_version(&self, name: &str) -> Result<String> {
        match self.backend {
            NodeBackend::Npm => {
                let stdout = self.query(&["view", name, "version", "latest"]).await?;
                Ok(stdout.map(|s| parse_plain_version(&s)).unwrap_or_default())
            }
            NodeBackend::Yarn => {
                let Some(stdout) = self
                    .query(&["npm", "info", name, "--fields", "version", "--json"])
                    .await?
                else {
                    return Ok(String::new());
                };
                let version = parse_yarn_field(&stdout, "version")?;
                Ok(version.as_str().unwrap_or_default().to_string())
            }
        }
    }

    async fn get_all_versions(&self, name: &str) -> Result<Vec<String>> {
        let versions = match self.backend {
            NodeBackend::Npm => match self.query(&["view", name, "versions", "--json"]).await? {
                Some(stdout) => serde_json::from_str(stdout.trim())?,
                None => Value::Null,
            },
            NodeBackend::Yarn => match self
                .query(&["npm", "info", name, "--fields", "versions", "--json"])
                .await?
            {
                Some(stdout) => parse_yarn_field(&stdout, "versions")?,
                None => Value::Null,
            },
        };
        Ok(versions_from_json(versions))
    }

    async fn read_manifest(&self, path: &Path) -> Result<Manifest> {
        let content = self.ctx.fs.read_to_string(path).await?;
        let pkg: Value = serde_json::from_str(&content)?;

        if !pkg.is_object() {
            return Err(Error::InvalidFormat(
                path.to_path_buf(),
                "package.json root must be an object".to_string(),
            ));
        }

        Ok(Manifest {
            path: path.to_path_buf(),
            name: pkg.get("name").and_then(Value::as_str).map(String::from),
            version: pkg.get("version").and_then(Value::as_str).map(String::from),
            dependencies: section_from_json(pkg.get("dependencies")).unwrap_or_default(),
            dev_dependencies: section_from_json(pkg.get("devDependencies")),
            peer_dependencies: section_from_json(pkg.get("peerDependencies")),
        })
    }

    async fn write_manifest(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        let content = self.ctx.fs.read_to_string(path).await?;
        let mut pkg: Value = serde_json::from_str(&content)?;
        let Some(root) = pkg.as_object_mut() else {
            return Err(Error::InvalidFormat(
                path.to_path_buf(),
                "package.json root must be an object".to_string(),
            ));
        };

        for section in DependencySection::ALL {
            let Some(deps) = manifest.section(section) else {
                continue;
            };
            if deps.is_empty() && !root.contains_key(section.key()) {
                continue;
            }

            let entry = root
                .entry(section.key())
                .or_insert_with(|| Value::Object(Default::default()));
            let Some(object) = entry.as_object_mut() else {
                return Err(Error::InvalidFormat(
                    path.to_path_buf(),
                    format!("{} must be an object", section.key()),
                ));
            };
            // Existing keys keep their position; new keys are appended
            for (name, spec) in deps {
                object.insert(name.clone(), Value::String(spec.clone()));
            }
        }

        // Pretty print with 2-space indentation (npm standard)
        let mut formatted = serde_json::to_string_pretty(&pkg)?;
        formatted.push('\n');
        FileUpdater::new(self.ctx.fs.clone())
            .update_file(path, &formatted)
            .await
    }

    fn validate_package_name(&self, name: &str) -> ValidationResult {
        validate_npm_name(name)
    }
}
