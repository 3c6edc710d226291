//! Node.js ecosystem support

pub mod naming;
pub mod provider;

pub use naming::validate_npm_name;
pub use provider::{NodeBackend, NodeProvider};
