use std::borrow::Cow;

use chrono::SecondsFormat;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value};

use super::error::SerializeError;
use super::node::{Entity, Node};
use crate::selector::{FieldKind, FieldSelector};

/// Entity nesting limit applied when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Caller-controlled serialization flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Emit `private` fields without naming them
    pub allow_private: bool,
    /// Maximum entity nesting; `None` walks until relations run out
    pub max_depth: Option<usize>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            allow_private: false,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl SerializeOptions {
    /// Options seeded from the serializer section of the app config
    pub fn from_config() -> Self {
        let config = &crate::config::config().serializer;
        Self {
            allow_private: false,
            max_depth: config.max_depth,
        }
    }

    pub fn with_private(mut self, allow_private: bool) -> Self {
        self.allow_private = allow_private;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Walks a [`Node`] tree and produces JSON, applying field visibility and a
/// [`FieldSelector`] at every entity level.
///
/// The walk never mutates the graph. Lazy queries execute when reached.
/// Self-referential relations terminate when they reach null or an empty
/// sequence, or when `max_depth` is hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer {
    options: SerializeOptions,
}

impl Serializer {
    pub fn new(options: SerializeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    pub fn serialize(&self, node: &Node, selector: &FieldSelector) -> Result<Value, SerializeError> {
        self.walk(node, selector, 0)
    }

    fn walk(&self, node: &Node, selector: &FieldSelector, depth: usize) -> Result<Value, SerializeError> {
        let value = match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Map(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.walk(item, selector, depth)?);
                }
                Value::Object(out)
            }
            Node::Seq(items) => self.walk_seq(items, selector, depth)?,
            Node::Query(query) => self.walk_seq(&query.materialize()?, selector, depth)?,
            Node::Entity(entity) => self.walk_entity(entity.as_ref(), selector, depth)?,
            Node::Decimal(d) => d
                .to_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Node::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Node::NaiveDateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Node::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        };
        Ok(value)
    }

    fn walk_seq(&self, items: &[Node], selector: &FieldSelector, depth: usize) -> Result<Value, SerializeError> {
        items
            .iter()
            .map(|item| self.walk(item, selector, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn walk_entity(
        &self,
        entity: &dyn Entity,
        selector: &FieldSelector,
        depth: usize,
    ) -> Result<Value, SerializeError> {
        let depth = depth + 1;
        if let Some(max_depth) = self.options.max_depth {
            if depth > max_depth {
                tracing::warn!(
                    entity = entity.entity_name(),
                    max_depth,
                    "Entity nesting exceeded maximum depth"
                );
                return Err(SerializeError::DepthExceeded { max_depth });
            }
        }

        let mut out = Map::new();
        for selected in selector.resolve(entity.fields(), self.options.allow_private) {
            let name = selected.def.name;
            let value = entity.field(name).ok_or(SerializeError::UndeclaredField {
                entity: entity.entity_name(),
                field: name,
            })?;

            let json = match (selected.def.kind, selected.nested.exclusive_target()) {
                (FieldKind::Many, Some(target)) => {
                    self.collapse(&value, selected.nested, target, depth)?
                }
                _ => self.walk(&value, selected.nested, depth)?,
            };
            out.insert(name.to_string(), json);
        }
        Ok(Value::Object(out))
    }

    /// Reduce a relation to the bare values of one attribute per element
    fn collapse(
        &self,
        value: &Node,
        selector: &FieldSelector,
        target: &str,
        depth: usize,
    ) -> Result<Value, SerializeError> {
        let items: Cow<'_, [Node]> = match value {
            Node::Seq(items) => Cow::Borrowed(items),
            Node::Query(query) => Cow::Owned(query.materialize()?),
            other => return self.walk(other, selector, depth),
        };

        items
            .iter()
            .map(|item| {
                Ok(match self.walk(item, selector, depth)? {
                    Value::Object(mut map) => map.remove(target).unwrap_or(Value::Null),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, SerializeError>>()
            .map(Value::Array)
    }
}

/// Serialize with an explicit private flag and raw selector tokens
pub fn to_json<S: AsRef<str>>(
    node: &Node,
    allow_private: bool,
    extra_fields: &[S],
) -> Result<Value, SerializeError> {
    let options = SerializeOptions::from_config().with_private(allow_private);
    Serializer::new(options).serialize(node, &FieldSelector::parse(extra_fields))
}

/// Serialize one entity with an explicit private flag and raw selector tokens
pub fn entity_to_json<E: Entity, S: AsRef<str>>(
    entity: &E,
    allow_private: bool,
    extra_fields: &[S],
) -> Result<Value, SerializeError> {
    let options = SerializeOptions::from_config().with_private(allow_private);
    Serializer::new(options).walk_entity(entity, &FieldSelector::parse(extra_fields), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::selector::FieldDef;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Tag {
        id: i64,
        label: &'static str,
    }

    impl Entity for Tag {
        fn entity_name(&self) -> &'static str {
            "tag"
        }

        fn fields(&self) -> &'static [FieldDef] {
            fields![public id, public label]
        }

        fn field(&self, name: &str) -> Option<Node> {
            match name {
                "id" => Some(self.id.into()),
                "label" => Some(self.label.into()),
                _ => None,
            }
        }
    }

    struct Broken;

    impl Entity for Broken {
        fn entity_name(&self) -> &'static str {
            "broken"
        }

        fn fields(&self) -> &'static [FieldDef] {
            fields![public missing]
        }

        fn field(&self, _name: &str) -> Option<Node> {
            None
        }
    }

    struct Link {
        next: Option<Arc<Link>>,
    }

    impl Entity for Link {
        fn entity_name(&self) -> &'static str {
            "link"
        }

        fn fields(&self) -> &'static [FieldDef] {
            fields![public next: one]
        }

        fn field(&self, name: &str) -> Option<Node> {
            match name {
                "next" => Some(self.next.clone().into()),
                _ => None,
            }
        }
    }

    fn chain(len: usize) -> Link {
        let mut link = Link { next: None };
        for _ in 1..len {
            link = Link { next: Some(Arc::new(link)) };
        }
        link
    }

    fn tags() -> Vec<Node> {
        vec![
            Node::entity(Tag { id: 1, label: "a" }),
            Node::entity(Tag { id: 2, label: "b" }),
        ]
    }

    #[test]
    fn scalars_pass_through() {
        let s = Serializer::default();
        let empty = FieldSelector::new();
        assert_eq!(s.serialize(&Node::from("x"), &empty).unwrap(), json!("x"));
        assert_eq!(s.serialize(&Node::from(3_i64), &empty).unwrap(), json!(3));
        assert_eq!(s.serialize(&Node::from(true), &empty).unwrap(), json!(true));
        assert_eq!(s.serialize(&Node::Null, &empty).unwrap(), Value::Null);
    }

    #[test]
    fn temporal_and_decimal_values() {
        let s = Serializer::default();
        let empty = FieldSelector::new();

        let date = NaiveDate::from_ymd_opt(2010, 9, 10).unwrap();
        assert_eq!(s.serialize(&date.into(), &empty).unwrap(), json!("2010-09-10"));

        let naive = date.and_hms_opt(6, 51, 25).unwrap();
        assert_eq!(s.serialize(&naive.into(), &empty).unwrap(), json!("2010-09-10T06:51:25"));

        let utc = Utc.timestamp_opt(1284101485, 0).unwrap();
        assert_eq!(s.serialize(&utc.into(), &empty).unwrap(), json!("2010-09-10T06:51:25Z"));

        let price = Decimal::from_str("12.50").unwrap();
        assert_eq!(s.serialize(&price.into(), &empty).unwrap(), json!(12.5));
    }

    #[test]
    fn containers_are_transparent_to_selectors() {
        let node: Node = vec![("items".to_string(), Node::Seq(tags()))].into_iter().collect();
        let out = Serializer::default()
            .serialize(&node, &FieldSelector::parse(["^id"]))
            .unwrap();
        assert_eq!(out, json!({ "items": [{ "id": 1 }, { "id": 2 }] }));
    }

    #[test]
    fn lazy_query_runs_once_per_walk() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let node = Node::query_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(tags())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let out = Serializer::default().serialize(&node, &FieldSelector::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(out, json!([{ "id": 1, "label": "a" }, { "id": 2, "label": "b" }]));
    }

    #[test]
    fn failing_query_propagates() {
        let node = Node::query_fn(|| Err("connection reset".into()));
        let err = Serializer::default().serialize(&node, &FieldSelector::new()).unwrap_err();
        assert!(matches!(err, SerializeError::Query(_)));
    }

    #[test]
    fn undeclared_field_is_fatal() {
        let err = Serializer::default()
            .serialize(&Node::entity(Broken), &FieldSelector::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SerializeError::UndeclaredField { entity: "broken", field: "missing" }
        ));
    }

    #[test]
    fn self_relation_stops_at_null() {
        let out = Serializer::default()
            .serialize(&Node::entity(chain(3)), &FieldSelector::new())
            .unwrap();
        assert_eq!(out, json!({ "next": { "next": { "next": null } } }));
    }

    #[test]
    fn depth_guard_rejects_deep_graphs() {
        let options = SerializeOptions::default().with_max_depth(Some(2));
        let err = Serializer::new(options)
            .serialize(&Node::entity(chain(3)), &FieldSelector::new())
            .unwrap_err();
        assert!(matches!(err, SerializeError::DepthExceeded { max_depth: 2 }));

        let unbounded = SerializeOptions::default().with_max_depth(None);
        assert!(Serializer::new(unbounded)
            .serialize(&Node::entity(chain(64)), &FieldSelector::new())
            .is_ok());
    }
}
