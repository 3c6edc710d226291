//! Python provider: requirements.txt, pyproject.toml (poetry) and Pipfile

use super::requirements::{parse_requirements, render_requirements};
use super::sections::{has_section, parse_section, render_section};
use crate::command::command_line;
use crate::traits::{EcosystemProvider, ProviderContext};
use crate::types::{Language, Manifest, ValidationResult};
use crate::update::FileUpdater;
use crate::{Error, Result};
use codep_config::PythonBackend;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

static PEP508_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)[A-Z0-9]([A-Z0-9._-]*[A-Z0-9])?$").expect("valid PEP 508 regex")
});

const NOT_FOUND: &[&str] = &[
    "No matching distribution",
    "PackagesNotFoundError",
    "not found",
];

const POETRY: &[&str] = &["tool.poetry"];
const POETRY_DEPENDENCIES: &[&str] = &["tool.poetry.dependencies"];
const POETRY_DEV_DEPENDENCIES: &[&str] = &[
    "tool.poetry.dev-dependencies",
    "tool.poetry.group.dev.dependencies",
];
const PIPFILE_PACKAGES: &[&str] = &["packages"];
const PIPFILE_DEV_PACKAGES: &[&str] = &["dev-packages"];

/// Python manifest flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PythonFormat {
    /// `requirements*.txt`
    Requirements,
    /// `pyproject.toml` with poetry tables
    Pyproject,
    /// `Pipfile`
    Pipfile,
}

impl PythonFormat {
    /// Detect the format from a manifest file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        match name {
            "pyproject.toml" => Some(Self::Pyproject),
            "Pipfile" => Some(Self::Pipfile),
            _ if name.starts_with("requirements") && name.ends_with(".txt") => {
                Some(Self::Requirements)
            }
            _ => None,
        }
    }
}

/// PEP 508 distribution name check
pub fn validate_python_name(name: &str) -> ValidationResult {
    if PEP508_NAME_RE.is_match(name) {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(format!("'{}' is not a valid PEP 508 package name", name))
    }
}

/// pyproject.toml values: `latest` becomes the poetry wildcard
fn pyproject_value(value: &str) -> String {
    if value == "latest" {
        "*".to_string()
    } else {
        value.to_string()
    }
}

/// Pipfile values: wildcard for `latest`, bare versions pinned with `==`
fn pipfile_value(value: &str) -> String {
    if value == "latest" {
        "*".to_string()
    } else if value.starts_with(|c: char| c.is_ascii_digit()) {
        format!("=={}", value)
    } else {
        value.to_string()
    }
}

/// `flask (3.0.0)` on the first line of `pip index versions`
fn parse_pip_latest(stdout: &str) -> String {
    stdout
        .lines()
        .next()
        .and_then(|line| {
            let (_, rest) = line.split_once('(')?;
            rest.split_once(')').map(|(version, _)| version.trim().to_string())
        })
        .unwrap_or_default()
}

/// `Available versions: 3.0.0, 2.3.3, ...`, returned oldest first
fn parse_pip_versions(stdout: &str) -> Vec<String> {
    let mut versions: Vec<String> = stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Available versions:"))
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    versions.reverse();
    versions
}

/// Every `version` of the package array in `conda search --json` output
fn parse_conda_versions(stdout: &str, name: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(stdout.trim())?;
    let entries = value
        .get(name)
        .or_else(|| value.as_object().and_then(|o| o.values().next()))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut versions: Vec<String> = Vec::new();
    for version in entries
        .iter()
        .filter_map(|entry| entry.get("version").and_then(Value::as_str))
    {
        // One entry per build; keep the first of each run
        if versions.last().map(String::as_str) != Some(version) {
            versions.push(version.to_string());
        }
    }
    Ok(versions)
}

/// Python ecosystem provider
#[derive(Debug, Clone)]
pub struct PythonProvider {
    ctx: ProviderContext,
    backend: PythonBackend,
    format: Option<PythonFormat>,
}

impl PythonProvider {
    /// Create a provider; the manifest format is detected per file
    pub fn new(ctx: ProviderContext, backend: PythonBackend) -> Self {
        Self {
            ctx,
            backend,
            format: None,
        }
    }

    /// Force one manifest format regardless of file names
    pub fn with_format(mut self, format: PythonFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn format_for(&self, path: &Path) -> Result<PythonFormat> {
        self.format
            .or_else(|| PythonFormat::from_path(path))
            .ok_or_else(|| Error::UnsupportedManifest(path.to_path_buf()))
    }

    /// Raw lookup output, `None` when the package does not exist
    async fn lookup(&self, name: &str) -> Result<Option<String>> {
        let (program, args): (&str, Vec<&str>) = match self.backend {
            PythonBackend::Pip => ("pip", vec!["index", "versions", name]),
            PythonBackend::Uv => ("uv", vec!["pip", "index", "versions", name]),
            PythonBackend::Conda => ("conda", vec!["search", name, "--json"]),
        };
        let output = self.ctx.runner.run(program, &args, None).await?;
        output.found_stdout(&command_line(program, &args), NOT_FOUND)
    }
}

#[async_trait::async_trait]
impl EcosystemProvider for PythonProvider {
    fn language(&self) -> Language {
        Language::Python
    }

    fn backend(&self) -> &str {
        match self.backend {
            PythonBackend::Pip => "pip",
            PythonBackend::Uv => "uv",
            PythonBackend::Conda => "conda",
        }
    }

    async fn get_latest_version(&self, name: &str) -> Result<String> {
        let Some(stdout) = self.lookup(name).await? else {
            return Ok(String::new());
        };
        match self.backend {
            PythonBackend::Pip | PythonBackend::Uv => Ok(parse_pip_latest(&stdout)),
            PythonBackend::Conda => Ok(parse_conda_versions(&stdout, name)?
                .pop()
                .unwrap_or_default()),
        }
    }

    async fn get_all_versions(&self, name: &str) -> Result<Vec<String>> {
        let Some(stdout) = self.lookup(name).await? else {
            return Ok(vec![]);
        };
        match self.backend {
            PythonBackend::Pip | PythonBackend::Uv => Ok(parse_pip_versions(&stdout)),
            PythonBackend::Conda => parse_conda_versions(&stdout, name),
        }
    }

    async fn read_manifest(&self, path: &Path) -> Result<Manifest> {
        let content = self.ctx.fs.read_to_string(path).await?;
        let mut manifest = Manifest::new(path);

        match self.format_for(path)? {
            PythonFormat::Requirements => {
                manifest.dependencies = parse_requirements(&content);
            }
            PythonFormat::Pyproject => {
                if let Some(poetry) = parse_section(&content, POETRY, &[]) {
                    manifest.name = poetry.get("name").cloned();
                    manifest.version = poetry.get("version").cloned();
                }
                manifest.dependencies =
                    parse_section(&content, POETRY_DEPENDENCIES, &["python"]).unwrap_or_default();
                manifest.dev_dependencies =
                    parse_section(&content, POETRY_DEV_DEPENDENCIES, &["python"]);
            }
            PythonFormat::Pipfile => {
                manifest.dependencies =
                    parse_section(&content, PIPFILE_PACKAGES, &[]).unwrap_or_default();
                manifest.dev_dependencies = parse_section(&content, PIPFILE_DEV_PACKAGES, &[]);
            }
        }

        Ok(manifest)
    }

    async fn write_manifest(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        let content = self.ctx.fs.read_to_string(path).await?;
        let dev = manifest.dev_dependencies.clone().unwrap_or_default();

        let rendered = match self.format_for(path)? {
            PythonFormat::Requirements => render_requirements(&content, &manifest.dependencies),
            PythonFormat::Pyproject => {
                let updated = render_section(
                    &content,
                    POETRY_DEPENDENCIES,
                    &manifest.dependencies,
                    pyproject_value,
                );
                if has_section(&updated, POETRY_DEV_DEPENDENCIES) {
                    render_section(&updated, POETRY_DEV_DEPENDENCIES, &dev, pyproject_value)
                } else {
                    updated
                }
            }
            PythonFormat::Pipfile => {
                let updated = render_section(
                    &content,
                    PIPFILE_PACKAGES,
                    &manifest.dependencies,
                    pipfile_value,
                );
                render_section(&updated, PIPFILE_DEV_PACKAGES, &dev, pipfile_value)
            }
        };

        if rendered == content {
            return Ok(());
        }
        FileUpdater::new(self.ctx.fs.clone())
            .update_file(path, &rendered)
            .await
    }

    fn validate_package_name(&self, name: &str) -> ValidationResult {
        validate_python_name(name)
    }
}
