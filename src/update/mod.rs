// Submodules for separation of concerns
mod apply;
mod parse;
mod path;
mod types;

// Public API re-exports
pub use apply::{apply_update, apply_update_with};
pub use parse::{UpdateSerde, has_dynamic_operators, parse_update_json};
pub use types::{Operand, UpdateSpec};
