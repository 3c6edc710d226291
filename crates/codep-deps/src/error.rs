//! Error types for codep-deps

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using codep-deps Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in codep-deps
#[derive(Debug, Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid manifest contents
    #[error("Invalid file format for {0}: {1}")]
    InvalidFormat(PathBuf, String),

    /// No provider handles this manifest
    #[error("Unsupported manifest: {0}")]
    UnsupportedManifest(PathBuf),

    /// The run was configured without anything to reconcile
    #[error("Policy error: {0}")]
    Policy(String),

    /// A codependency could not be resolved to a version
    #[error("{0}")]
    Resolution(ResolutionFailure),

    /// An external command could not be started
    #[error("Failed to run `{command}`: {source}")]
    CommandSpawn {
        /// Command line
        command: String,
        /// Underlying spawn error
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        /// Command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured stderr
        stderr: String,
    },

    /// An external command did not finish in time
    #[error("`{command}` timed out after {timeout_secs}s")]
    CommandTimeout {
        /// Command line
        command: String,
        /// Configured timeout
        timeout_secs: u64,
    },
}

/// Class of a failed version lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionErrorKind {
    /// Registry unreachable: connection refused, timeout, DNS failure
    Network,
    /// Bad or unknown package name
    Validation,
}

/// A diagnosed version lookup failure.
///
/// Cloneable so every caller sharing a de-duplicated lookup receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    /// Package that failed
    pub name: String,
    /// Failure class
    pub kind: ResolutionErrorKind,
    /// Underlying message
    pub message: String,
    /// Closest known package name, if any
    pub suggestion: Option<String>,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResolutionErrorKind::Network => write!(
                f,
                "Network error while resolving '{}': {}. Check your connection and registry configuration.",
                self.name, self.message
            )?,
            ResolutionErrorKind::Validation => {
                write!(f, "Could not resolve '{}': {}", self.name, self.message)?
            }
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " Did you mean '{}'?", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionFailure {}

impl From<ResolutionFailure> for Error {
    fn from(failure: ResolutionFailure) -> Self {
        Self::Resolution(failure)
    }
}
