//! go.mod provider with `go list` lookups

use super::parser::{parse_go_mod, render_go_mod};
use crate::command::command_line;
use crate::traits::{EcosystemProvider, ProviderContext};
use crate::types::{Language, Manifest, ValidationResult};
use crate::update::FileUpdater;
use crate::Result;
use std::path::Path;
use tracing::debug;

const NOT_FOUND: &[&str] = &[
    "not found",
    "no matching versions",
    "unrecognized import path",
];

/// Go modules provider
#[derive(Debug, Clone)]
pub struct GoProvider {
    ctx: ProviderContext,
}

impl GoProvider {
    /// Create a provider
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    /// Tokens after the module path in `go list -m -versions` output
    async fn list_versions(&self, module: &str) -> Result<Vec<String>> {
        let args = ["list", "-m", "-versions", module];
        let output = self.ctx.runner.run("go", &args, None).await?;
        let Some(stdout) = output.found_stdout(&command_line("go", &args), NOT_FOUND)? else {
            return Ok(vec![]);
        };

        Ok(stdout
            .split_whitespace()
            .skip(1)
            .map(String::from)
            .collect())
    }

    /// `go mod tidy` next to the manifest; failures never fail the write
    async fn tidy(&self, path: &Path) {
        if self.ctx.testing {
            debug!("Skipping go mod tidy for {} in testing mode", path.display());
            return;
        }

        let dir = path.parent().unwrap_or(self.ctx.fs.project_root());
        match self.ctx.runner.run("go", &["mod", "tidy"], Some(dir)).await {
            Ok(output) if output.success() => debug!("go mod tidy succeeded in {}", dir.display()),
            Ok(output) => debug!(
                "go mod tidy exited with {} in {}: {}",
                output.status_text(),
                dir.display(),
                output.stderr.trim()
            ),
            Err(e) => debug!("go mod tidy failed in {}: {}", dir.display(), e),
        }
    }
}

/// Module path rules: `domain.tld/path`, no empty elements
pub fn validate_module_path(path: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if path.is_empty() {
        errors.push("module path must not be empty".to_string());
    } else {
        let allowed = |c: char| c.is_ascii_alphanumeric() || "._~/-".contains(c);
        if let Some(bad) = path.chars().find(|c| !allowed(*c)) {
            errors.push(format!("module path contains invalid character '{}'", bad));
        }
        if path.split('/').any(str::is_empty) {
            errors.push("module path must not contain empty elements".to_string());
        }
        let first = path.split('/').next().unwrap_or_default();
        if !first.contains('.') {
            errors.push(format!(
                "first path element '{}' must be a domain (contain a dot)",
                first
            ));
        }
    }

    ValidationResult {
        valid_for_new_packages: errors.is_empty(),
        valid_for_old_packages: errors.is_empty(),
        errors,
        warnings: vec![],
    }
}

#[async_trait::async_trait]
impl EcosystemProvider for GoProvider {
    fn language(&self) -> Language {
        Language::Go
    }

    fn backend(&self) -> &str {
        "go"
    }

    async fn get_latest_version(&self, name: &str) -> Result<String> {
        Ok(self.list_versions(name).await?.pop().unwrap_or_default())
    }

    async fn get_all_versions(&self, name: &str) -> Result<Vec<String>> {
        self.list_versions(name).await
    }

    async fn read_manifest(&self, path: &Path) -> Result<Manifest> {
        let content = self.ctx.fs.read_to_string(path).await?;
        let go_mod = parse_go_mod(&content);

        Ok(Manifest {
            path: path.to_path_buf(),
            name: go_mod.module,
            version: go_mod.go_version,
            dependencies: go_mod.requires,
            dev_dependencies: None,
            peer_dependencies: None,
        })
    }

    async fn write_manifest(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        let content = self.ctx.fs.read_to_string(path).await?;
        let original = parse_go_mod(&content);

        let mut requires = original.requires;
        requires.extend(
            manifest
                .dependencies
                .iter()
                .map(|(name, version)| (name.clone(), version.clone())),
        );

        let rendered = render_go_mod(&content, &requires, &original.indirect);
        FileUpdater::new(self.ctx.fs.clone())
            .update_file(path, &rendered)
            .await?;

        self.tidy(path).await;
        Ok(())
    }

    fn validate_package_name(&self, name: &str) -> ValidationResult {
        validate_module_path(name)
    }
}
