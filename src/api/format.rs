use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::selector::FieldSelector;
use crate::serialize::{Node, SerializeOptions, Serializer};

/// Query parameters controlling the shape of a serialized response.
///
/// `?fields=^id,^name,child.!name` adds selector tokens on top of the
/// handler's defaults. `?private=true` emits private fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldsQuery {
    pub fields: Option<String>,
    pub private: Option<bool>,
}

impl FieldsQuery {
    pub fn selector(&self) -> FieldSelector {
        self.fields
            .as_deref()
            .map(FieldSelector::from_query)
            .unwrap_or_default()
    }

    pub fn allow_private(&self) -> bool {
        self.private.unwrap_or(false)
    }
}

/// Serialize a response node with the handler's default tokens merged with
/// the ones requested in the query string.
pub fn render(node: &Node, defaults: &[&str], query: &FieldsQuery) -> Result<Value, ApiError> {
    let selector = FieldSelector::merge(&FieldSelector::parse(defaults), &query.selector());
    let options = SerializeOptions::from_config().with_private(query.allow_private());

    tracing::trace!(selector = %selector, private = options.allow_private, "Rendering response");
    Ok(Serializer::new(options).serialize(node, &selector)?)
}
