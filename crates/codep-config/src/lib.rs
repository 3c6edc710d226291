//! Configuration for codep: the record the reconciliation engine consumes,
//! config file discovery, and validation.

pub mod manager;
pub mod types;
pub mod validation;

pub use manager::{ConfigError, ConfigManager, LoadedConfig, PACKAGE_JSON_KEY, RC_FILE, TOML_FILE};
pub use types::{
    CodepConfig, CodependencyItem, Language, OutputFormat, PythonBackend, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_IGNORE, DEFAULT_TIMEOUT_SECS,
};
pub use validation::{validate_config, ValidationResult};
