//! Root-scoped filesystem abstraction for codep.
//!
//! This crate provides a `FileSystem` trait used for every manifest read and
//! write, with a native implementation (using `std::fs` on the blocking pool)
//! and an in-memory implementation for tests and embedding.
//!
//! # Example
//!
//! ```no_run
//! use codep_fs::{FileSystem, NativeFileSystem};
//! use std::sync::Arc;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let fs = Arc::new(NativeFileSystem::new(".")?);
//! let contents = fs.read_to_string(Path::new("package.json")).await?;
//! println!("{}", contents);
//! # Ok(())
//! # }
//! ```

mod file_system;
mod patterns;

pub use file_system::{DiscoveryOptions, FileSystem};
pub use patterns::PatternSet;

pub mod memory;
pub use memory::MemoryFileSystem;

#[cfg(feature = "native")]
pub mod native;
#[cfg(feature = "native")]
pub use native::NativeFileSystem;
