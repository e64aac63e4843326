use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::fields;
use crate::selector::FieldDef;
use crate::serialize::{Entity, Node};

tokio::task_local! {
    static CURRENT: Arc<ScopeData>;
}

static NO_SCOPE: Lazy<Arc<ScopeData>> = Lazy::new(|| Arc::new(ScopeData::default()));

/// Identity of one inbound request, stable for the request's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub access: String,
}

impl Entity for CurrentUser {
    fn entity_name(&self) -> &'static str {
        "current_user"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![public id, public name, private access]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "access" => Some(self.access.as_str().into()),
            _ => None,
        }
    }
}

/// Contextual data visible to all code running inside one request scope
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScopeData {
    /// `None` only outside any scope; entering a scope assigns one
    pub request: Option<RequestId>,
    pub current_user: Option<CurrentUser>,
    pub values: HashMap<String, Value>,
}

impl ScopeData {
    pub fn new(request: RequestId) -> Self {
        Self {
            request: Some(request),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: Option<CurrentUser>) -> Self {
        self.current_user = user;
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn identified(mut self) -> Self {
        self.request.get_or_insert_with(RequestId::new);
        self
    }

    pub fn is_active(&self) -> bool {
        self.request.is_some()
    }
}

/// Run `fut` inside a new scope. The previous scope, if any, is visible
/// again once `fut` completes or is dropped.
///
/// Data without a request identity is given a fresh [`RequestId`], so an
/// entered scope always has a key.
pub async fn scoped<F: Future>(data: ScopeData, fut: F) -> F::Output {
    let data = Arc::new(data.identified());
    tracing::trace!(request = ?data.request, "Entering request scope");
    let output = CURRENT.scope(data.clone(), fut).await;
    tracing::trace!(request = ?data.request, "Leaving request scope");
    output
}

/// Synchronous variant of [`scoped`] for code on blocking worker threads
pub fn scoped_sync<R>(data: ScopeData, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(Arc::new(data.identified()), f)
}

/// Data of the innermost active scope; empty when none is active
pub fn current_scope() -> Arc<ScopeData> {
    CURRENT
        .try_with(Arc::clone)
        .unwrap_or_else(|_| NO_SCOPE.clone())
}

/// Request identity of the active scope
pub fn scope_key() -> Option<RequestId> {
    CURRENT.try_with(|data| data.request).ok().flatten()
}

pub fn current_user() -> Option<CurrentUser> {
    CURRENT
        .try_with(|data| data.current_user.clone())
        .ok()
        .flatten()
}

/// `tokio::spawn` carrying the caller's scope into the new task
pub fn spawn_scoped<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let data = current_scope();
    tokio::spawn(CURRENT.scope(data, fut))
}

/// `tokio::task::spawn_blocking` carrying the caller's scope onto the worker thread
pub fn spawn_blocking_scoped<F, R>(f: F) -> tokio::task::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let data = current_scope();
    tokio::task::spawn_blocking(move || CURRENT.sync_scope(data, f))
}
