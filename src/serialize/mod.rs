//! Selective object-to-JSON serialization.
//!
//! Entities declare their fields once through a static table (see
//! [`fields!`](crate::fields)); the [`Serializer`] walks entities,
//! containers and scalars and applies a [`FieldSelector`](crate::selector::FieldSelector)
//! at every entity level.

pub mod error;
pub mod node;
pub mod serializer;

pub use error::{BoxError, SerializeError};
pub use node::{Entity, LazyQuery, Node, QuerySource};
pub use serializer::{entity_to_json, to_json, SerializeOptions, Serializer, DEFAULT_MAX_DEPTH};
