use crate::types::CodepConfig;
use crate::validation::{validate_config, ValidationResult};
use codep_fs::FileSystem;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Dedicated JSON config file name
pub const RC_FILE: &str = ".codependencerc";

/// Key holding the config record inside package.json
pub const PACKAGE_JSON_KEY: &str = "codependence";

/// TOML config file name
pub const TOML_FILE: &str = "codep.toml";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON config error in {0}: {1}")]
    Json(PathBuf, serde_json::Error),

    #[error("TOML config error in {0}: {1}")]
    Toml(PathBuf, toml::de::Error),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {}", .0.summary())]
    Invalid(ValidationResult),
}

/// A configuration record and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// File the record was read from, `None` when no file was found
    pub source: Option<PathBuf>,
    /// The record
    pub config: CodepConfig,
}

/// Locates and parses codep configuration through a [`FileSystem`].
///
/// Lookup order inside the root directory: `.codependencerc` (JSON), the
/// `"codependence"` key of `package.json`, then `codep.toml`.
pub struct ConfigManager<F: FileSystem> {
    fs: Arc<F>,
}

impl<F: FileSystem> ConfigManager<F> {
    /// Create a manager reading through `fs`
    pub fn new(fs: Arc<F>) -> Self {
        Self { fs }
    }

    /// Load configuration for `root`, or from `explicit` when given.
    ///
    /// A missing explicit file is an error; finding no file during discovery
    /// yields the default record with `source: None`.
    pub async fn load(
        &self,
        root: &Path,
        explicit: Option<&Path>,
    ) -> Result<LoadedConfig, ConfigError> {
        if let Some(path) = explicit {
            if !self.fs.exists(path).await? {
                return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
            }
            let config = self.load_file(path).await?.unwrap_or_default();
            return Ok(LoadedConfig {
                source: Some(path.to_path_buf()),
                config,
            });
        }

        for name in [RC_FILE, "package.json", TOML_FILE] {
            let candidate = root.join(name);
            if !self.fs.exists(&candidate).await? {
                continue;
            }
            if let Some(config) = self.load_file(&candidate).await? {
                debug!("Loaded configuration from {}", candidate.display());
                return Ok(LoadedConfig {
                    source: Some(candidate),
                    config,
                });
            }
        }

        debug!("No configuration file found under {}", root.display());
        Ok(LoadedConfig {
            source: None,
            config: CodepConfig::default(),
        })
    }

    /// Parse one config file by its name.
    ///
    /// Returns `None` for a package.json without a `"codependence"` key.
    pub async fn load_file(&self, path: &Path) -> Result<Option<CodepConfig>, ConfigError> {
        let contents = self.fs.read_to_string(path).await?;
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        if file_name.ends_with(".toml") {
            let config =
                toml::from_str(&contents).map_err(|e| ConfigError::Toml(path.to_path_buf(), e))?;
            return Ok(Some(config));
        }

        if file_name == "package.json" {
            let mut manifest: serde_json::Value = serde_json::from_str(&contents)
                .map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;
            return match manifest.get_mut(PACKAGE_JSON_KEY).map(serde_json::Value::take) {
                Some(section) => serde_json::from_value(section)
                    .map(Some)
                    .map_err(|e| ConfigError::Json(path.to_path_buf(), e)),
                None => Ok(None),
            };
        }

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| ConfigError::Json(path.to_path_buf(), e))
    }

    /// Merge CLI overrides onto the loaded record and reject invalid results.
    pub fn resolve(
        loaded: LoadedConfig,
        overrides: CodepConfig,
    ) -> Result<(CodepConfig, ValidationResult), ConfigError> {
        let config = loaded.config.merge(overrides);
        let validation = validate_config(&config);
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation));
        }
        Ok((config, validation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodependencyItem, Language};
    use codep_fs::{MemoryFileSystem, NativeFileSystem};
    use tempfile::TempDir;

    fn memory(files: &[(&str, &str)]) -> Arc<MemoryFileSystem> {
        let fs = MemoryFileSystem::empty("/repo").unwrap();
        for (path, contents) in files {
            fs.add_file(path, *contents).unwrap();
        }
        Arc::new(fs)
    }

    #[tokio::test]
    async fn test_rc_file_wins_over_package_json() {
        let fs = memory(&[
            (".codependencerc", r#"{"codependencies": ["react"]}"#),
            ("package.json", r#"{"codependence": {"codependencies": ["vue"]}}"#),
        ]);

        let loaded = ConfigManager::new(fs)
            .load(Path::new("/repo"), None)
            .await
            .unwrap();

        assert_eq!(loaded.source, Some(PathBuf::from("/repo/.codependencerc")));
        assert_eq!(loaded.config.codependency_names(), vec!["react"]);
    }

    #[tokio::test]
    async fn test_package_json_key() {
        let fs = memory(&[(
            "package.json",
            r#"{"name": "app", "codependence": {"codependencies": [{"lodash": "4.17.21"}], "permissive": true}}"#,
        )]);

        let loaded = ConfigManager::new(fs)
            .load(Path::new("/repo"), None)
            .await
            .unwrap();

        assert!(loaded.config.permissive);
        assert_eq!(
            loaded.config.codependencies(),
            &[CodependencyItem::Pinned {
                name: "lodash".to_string(),
                version: "4.17.21".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_package_json_without_key_falls_through_to_toml() {
        let fs = memory(&[
            ("package.json", r#"{"name": "app"}"#),
            (
                "codep.toml",
                "codependencies = [\"requests\"]\nlanguage = \"python\"\n",
            ),
        ]);

        let loaded = ConfigManager::new(fs)
            .load(Path::new("/repo"), None)
            .await
            .unwrap();

        assert_eq!(loaded.source, Some(PathBuf::from("/repo/codep.toml")));
        assert_eq!(loaded.config.language, Some(Language::Python));
    }

    #[tokio::test]
    async fn test_no_config_found() {
        let loaded = ConfigManager::new(memory(&[]))
            .load(Path::new("/repo"), None)
            .await
            .unwrap();

        assert_eq!(loaded.source, None);
        assert_eq!(loaded.config, CodepConfig::default());
    }

    #[tokio::test]
    async fn test_missing_explicit_config() {
        let result = ConfigManager::new(memory(&[]))
            .load(Path::new("/repo"), Some(Path::new("/repo/custom.json")))
            .await;

        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[tokio::test]
    async fn test_malformed_rc_reports_path() {
        let fs = memory(&[(".codependencerc", "{ not json")]);

        let err = ConfigManager::new(fs)
            .load(Path::new("/repo"), None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains(".codependencerc"));
    }

    #[tokio::test]
    async fn test_native_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deps.json");
        std::fs::write(&path, r#"{"codependencies": ["express"], "update": true}"#).unwrap();

        let fs = Arc::new(NativeFileSystem::new(temp_dir.path()).unwrap());
        let loaded = ConfigManager::new(fs)
            .load(temp_dir.path(), Some(&path))
            .await
            .unwrap();

        assert!(loaded.config.update);
    }

    #[test]
    fn test_resolve_rejects_invalid_merge() {
        let loaded = LoadedConfig {
            source: None,
            config: CodepConfig::default(),
        };

        let result = ConfigManager::<MemoryFileSystem>::resolve(loaded, CodepConfig::default());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
