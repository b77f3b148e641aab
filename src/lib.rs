pub mod document;
pub mod errors;
pub mod matcher;
pub mod update;

pub use document::{Document, DocumentId, Metadata};
pub use errors::UpdateError;
pub use matcher::{ElementMatcher, FilterMatcher};
pub use update::{
    Operand, UpdateSpec, apply_update, apply_update_with, has_dynamic_operators, parse_update_json,
};
