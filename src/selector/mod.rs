//! Field-selection mini-language.
//!
//! Tokens control which fields are emitted at each nesting level:
//!
//! - `name` force-includes a field, private ones included
//! - `!name` excludes a field
//! - `^name` restricts the level to the `^`-marked fields
//! - `parent.rest` applies `rest` one level beneath `parent`
//!
//! Hidden fields are never emitted, whatever the tokens say.

pub mod field;
pub mod types;

pub use field::{FieldDef, FieldKind, Visibility};
pub use types::{FieldSelector, Selected};
