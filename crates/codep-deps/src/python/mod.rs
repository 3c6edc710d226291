//! Python ecosystem support

pub mod provider;
pub mod requirements;
pub mod sections;

pub use provider::{validate_python_name, PythonFormat, PythonProvider};
