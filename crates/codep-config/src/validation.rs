//! Validation of configuration records and package names.

use crate::types::{CodepConfig, CodependencyItem};
use serde::Serialize;

/// Outcome of validating a configuration record or a package name.
///
/// Package-name validators distinguish names acceptable for newly published
/// packages from names that only legacy packages may carry; configuration
/// validation sets both flags together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Acceptable for a new package / a fresh configuration
    pub valid_for_new_packages: bool,
    /// Acceptable for an existing package
    pub valid_for_old_packages: bool,
    /// Problems that make the subject unusable
    pub errors: Vec<String>,
    /// Problems worth reporting that don't block the run
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no messages
    pub fn valid() -> Self {
        Self {
            valid_for_new_packages: true,
            valid_for_old_packages: true,
            errors: vec![],
            warnings: vec![],
        }
    }

    /// A failing result with a single error
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid_for_new_packages: false,
            valid_for_old_packages: false,
            errors: vec![error.into()],
            warnings: vec![],
        }
    }

    /// Usable for lookups: valid at least for existing packages
    pub fn is_valid(&self) -> bool {
        self.valid_for_old_packages
    }

    /// All errors joined into one line
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Validate a configuration record before any resolution work.
pub fn validate_config(config: &CodepConfig) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.codependencies().is_empty() && !config.permissive {
        errors.push(
            "codependencies are required unless permissive mode is enabled".to_string(),
        );
    }

    for item in config.codependencies() {
        match item {
            CodependencyItem::Name(name) => {
                if name.trim().is_empty() {
                    errors.push("codependency names must not be empty".to_string());
                } else if name.contains(char::is_whitespace) {
                    errors.push(format!("codependency '{}' must not contain spaces", name));
                }
            }
            CodependencyItem::Pinned { name, version } => {
                if name.trim().is_empty() {
                    errors.push("pinned codependency names must not be empty".to_string());
                }
                if version.trim().is_empty() {
                    errors.push(format!("pinned codependency '{}' has no version", name));
                }
            }
        }
    }

    if let Some(files) = &config.files {
        if files.is_empty() {
            errors.push("files must contain at least one pattern".to_string());
        }
    }

    if config.update && config.dry_run {
        warnings.push("dryRun is set; update will not write any files".to_string());
    }

    if config.debug && config.quiet {
        warnings.push("debug and quiet are both set; debug wins".to_string());
    }

    let valid = errors.is_empty();
    ValidationResult {
        valid_for_new_packages: valid,
        valid_for_old_packages: valid,
        errors,
        warnings,
    }
}
