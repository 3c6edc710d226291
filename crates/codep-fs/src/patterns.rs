//! Glob pattern sets for manifest discovery.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::io;
use std::path::Path;

/// Compiled include/ignore glob pair.
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: GlobSet,
    ignore: GlobSet,
}

impl PatternSet {
    /// Compile include and ignore patterns.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::InvalidInput` for a malformed glob.
    pub fn new(patterns: &[String], ignore_patterns: &[String]) -> io::Result<Self> {
        Ok(Self {
            include: build(patterns)?,
            ignore: build(ignore_patterns)?,
        })
    }

    /// Check a root-relative path against the set.
    pub fn matches(&self, relative: &Path) -> bool {
        let normalized = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        self.include.is_match(&normalized) && !self.ignore.is_match(&normalized)
    }
}

fn build(patterns: &[String]) -> io::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile(pattern)?);
    }
    builder
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn compile(pattern: &str) -> io::Result<Glob> {
    let trimmed = pattern.trim_start_matches("./");
    GlobBuilder::new(trimmed)
        .literal_separator(true)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}
