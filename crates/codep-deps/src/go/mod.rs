//! Go modules support

pub mod parser;
pub mod provider;

pub use parser::{parse_go_mod, render_go_mod, GoMod};
pub use provider::{validate_module_path, GoProvider};
