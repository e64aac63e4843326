pub mod format;
pub mod validate;

pub use format::{render, FieldsQuery};
pub use validate::{json_object, not_found_if_empty, require_json_fields};
