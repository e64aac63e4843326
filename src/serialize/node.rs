use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use super::error::{BoxError, SerializeError};
use crate::selector::FieldDef;

/// A domain object with a static, visibility-tagged field table
pub trait Entity: Send + Sync {
    /// Type name used in logs and errors
    fn entity_name(&self) -> &'static str;

    /// Declared fields, in emission order
    fn fields(&self) -> &'static [FieldDef];

    /// Current value of a declared field. Returning `None` for a declared
    /// name is a declaration bug and fails serialization.
    fn field(&self, name: &str) -> Option<Node>;
}

impl fmt::Debug for dyn Entity + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.entity_name())
    }
}

/// Producer behind a [`LazyQuery`]
pub trait QuerySource: Send + Sync {
    fn fetch(&self) -> Result<Vec<Node>, BoxError>;
}

impl<F> QuerySource for F
where
    F: Fn() -> Result<Vec<Node>, BoxError> + Send + Sync,
{
    fn fetch(&self) -> Result<Vec<Node>, BoxError> {
        self()
    }
}

/// A sequence whose rows are only fetched when serialized
#[derive(Clone)]
pub struct LazyQuery {
    source: Arc<dyn QuerySource>,
}

impl LazyQuery {
    pub fn new(source: impl QuerySource + 'static) -> Self {
        Self { source: Arc::new(source) }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<Vec<Node>, BoxError> + Send + Sync + 'static,
    {
        Self::new(f)
    }

    /// Run the query once and return its rows
    pub fn materialize(&self) -> Result<Vec<Node>, SerializeError> {
        self.source.fetch().map_err(SerializeError::Query)
    }
}

impl fmt::Debug for LazyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyQuery")
    }
}

/// Any value the serializer can walk
#[derive(Debug, Clone, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Emitted as a float; precision beyond `f64` is lost
    Decimal(Decimal),
    Date(NaiveDate),
    NaiveDateTime(NaiveDateTime),
    DateTime(DateTime<FixedOffset>),
    Map(IndexMap<String, Node>),
    Seq(Vec<Node>),
    Query(LazyQuery),
    Entity(Arc<dyn Entity>),
}

impl Node {
    pub fn entity(entity: impl Entity + 'static) -> Self {
        Node::Entity(Arc::new(entity))
    }

    pub fn query(source: impl QuerySource + 'static) -> Self {
        Node::Query(LazyQuery::new(source))
    }

    pub fn query_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<Vec<Node>, BoxError> + Send + Sync + 'static,
    {
        Node::Query(LazyQuery::from_fn(f))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Node {
            fn from(v: $t) -> Self {
                Node::Number(Number::from(v))
            }
        })*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Number::from_f64(v).map(Node::Number).unwrap_or(Node::Null)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_string())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl From<Decimal> for Node {
    fn from(v: Decimal) -> Self {
        Node::Decimal(v)
    }
}

impl From<NaiveDate> for Node {
    fn from(v: NaiveDate) -> Self {
        Node::Date(v)
    }
}

impl From<NaiveDateTime> for Node {
    fn from(v: NaiveDateTime) -> Self {
        Node::NaiveDateTime(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Node {
    fn from(v: DateTime<Tz>) -> Self {
        Node::DateTime(v.fixed_offset())
    }
}

impl From<uuid::Uuid> for Node {
    fn from(v: uuid::Uuid) -> Self {
        Node::String(v.to_string())
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Node::Null)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(v: Vec<T>) -> Self {
        Node::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<E: Entity + 'static> From<Arc<E>> for Node {
    fn from(v: Arc<E>) -> Self {
        Node::Entity(v)
    }
}

impl From<LazyQuery> for Node {
    fn from(v: LazyQuery) -> Self {
        Node::Query(v)
    }
}

impl From<Value> for Node {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl FromIterator<(String, Node)> for Node {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Node::Map(iter.into_iter().collect())
    }
}
