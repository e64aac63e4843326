use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::error::ContextError;
use super::scope::{scope_key, scoped, RequestId, ScopeData};
use crate::serialize::Node;

/// Registry key a session is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Request(RequestId),
    /// Used for access outside any request scope. Shared by every such
    /// caller, so it is not request-isolated.
    Global,
}

impl ScopeKey {
    pub fn current() -> Self {
        scope_key().map(ScopeKey::Request).unwrap_or(ScopeKey::Global)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Request(id) => write!(f, "request:{}", id),
            ScopeKey::Global => f.write_str("global"),
        }
    }
}

/// Creates and releases the mutable resource bound to a scope
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    type Session: Send + Sync + 'static;

    async fn create(&self) -> Result<Self::Session, ContextError>;

    async fn release(&self, session: Arc<Self::Session>) -> Result<(), ContextError>;

    /// Whether new sessions can currently be created
    async fn health_check(&self) -> Result<(), ContextError> {
        Ok(())
    }

    /// Server-side details of a live session, for `GET /api/session`
    async fn describe(&self, _session: &Self::Session) -> Result<Node, ContextError> {
        Ok(Node::Null)
    }
}

/// Scopes currently open through [`SessionBinder::run`] and the sessions bound to them
struct Registry<S> {
    live: HashSet<RequestId>,
    sessions: HashMap<ScopeKey, Arc<S>>,
}

impl<S> Registry<S> {
    fn accepts(&self, key: &ScopeKey) -> bool {
        match key {
            ScopeKey::Request(id) => self.live.contains(id),
            ScopeKey::Global => true,
        }
    }
}

/// Binds one lazily created session to each request scope.
///
/// A session is created on first access inside a scope and released exactly
/// once when [`SessionBinder::run`] tears the scope down. Once a scope has
/// ended, work still carrying its identity gets [`ContextError::Unavailable`]
/// instead of a new session.
pub struct SessionBinder<P: SessionProvider> {
    provider: Arc<P>,
    registry: Arc<RwLock<Registry<P::Session>>>,
    unscoped: Arc<AtomicU64>,
}

impl<P: SessionProvider> Clone for SessionBinder<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            registry: self.registry.clone(),
            unscoped: self.unscoped.clone(),
        }
    }
}

impl<P: SessionProvider> SessionBinder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            registry: Arc::new(RwLock::new(Registry {
                live: HashSet::new(),
                sessions: HashMap::new(),
            })),
            unscoped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Session for the active scope, created on first access
    pub async fn session(&self) -> Result<Arc<P::Session>, ContextError> {
        let key = ScopeKey::current();
        if key == ScopeKey::Global {
            let count = self.unscoped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                target: "bbweb::context",
                unscoped_accesses = count,
                "Session requested outside a request scope, using the shared global session"
            );
        }

        // Fast path: try read lock
        {
            let registry = self.registry.read().await;
            if let Some(session) = registry.sessions.get(&key) {
                return Ok(session.clone());
            }
            if !registry.accepts(&key) {
                return Err(Self::closed(key));
            }
        }

        let created = Arc::new(self.provider.create().await?);

        let mut registry = self.registry.write().await;
        if let Some(existing) = registry.sessions.get(&key) {
            let existing = existing.clone();
            drop(registry);
            debug!("Concurrent session creation for {}, releasing duplicate", key);
            self.release_detached(key, created).await?;
            return Ok(existing);
        }
        if !registry.accepts(&key) {
            drop(registry);
            debug!("Scope {} ended while its session was being created", key);
            self.release_detached(key, created).await?;
            return Err(Self::closed(key));
        }
        registry.sessions.insert(key, created.clone());
        debug!("Created session for {}", key);
        Ok(created)
    }

    fn closed(key: ScopeKey) -> ContextError {
        warn!(target: "bbweb::context", "Session requested for {} which is not open", key);
        ContextError::Unavailable(format!("{} is not an open request scope", key))
    }

    /// Remove and release the session bound to `key`.
    /// Returns `false` when no session was bound.
    pub async fn release(&self, key: ScopeKey) -> Result<bool, ContextError> {
        let session = self.registry.write().await.sessions.remove(&key);
        match session {
            Some(session) => {
                self.release_detached(key, session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn release_current(&self) -> Result<bool, ContextError> {
        self.release(ScopeKey::current()).await
    }

    /// Hand a removed session back to the provider on its own task, so the
    /// release completes even if the caller is dropped while waiting.
    async fn release_detached(&self, key: ScopeKey, session: Arc<P::Session>) -> Result<(), ContextError> {
        let provider = self.provider.clone();
        tokio::spawn(async move { provider.release(session).await })
            .await
            .map_err(|e| ContextError::Release(format!("release task for {} failed: {}", key, e)))??;
        debug!("Released session for {}", key);
        Ok(())
    }

    /// Close the scope and take its session out of the registry in one step
    async fn end_scope(&self, request: RequestId) -> Option<Arc<P::Session>> {
        let mut registry = self.registry.write().await;
        registry.live.remove(&request);
        registry.sessions.remove(&ScopeKey::Request(request))
    }

    pub async fn is_bound(&self, key: ScopeKey) -> bool {
        self.registry.read().await.sessions.contains_key(&key)
    }

    pub async fn bound_sessions(&self) -> usize {
        self.registry.read().await.sessions.len()
    }

    /// Number of scopes currently open through [`SessionBinder::run`]
    pub async fn open_scopes(&self) -> usize {
        self.registry.read().await.live.len()
    }

    /// Number of session accesses made outside any request scope
    pub fn unscoped_accesses(&self) -> u64 {
        self.unscoped.load(Ordering::Relaxed)
    }

    /// Run `work` inside a new request scope and release its session afterwards.
    ///
    /// Teardown runs on success, on error and when the returned future is
    /// dropped early. An error from `work` takes precedence over a release
    /// failure, which is then only logged.
    pub async fn run<F, T, E>(&self, mut data: ScopeData, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<ContextError>,
    {
        let request = *data.request.get_or_insert_with(RequestId::new);
        let key = ScopeKey::Request(request);

        let mut teardown = Teardown {
            binder: Some(self.clone()),
            request,
        };
        self.registry.write().await.live.insert(request);

        let result = scoped(data, work).await;
        let removed = self.end_scope(request).await;
        teardown.disarm();

        let cleanup = match removed {
            Some(session) => self.release_detached(key, session).await,
            None => Ok(()),
        };

        match (result, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                error!("Session teardown for {} failed after request error: {}", key, cleanup_err);
                Err(e)
            }
        }
    }
}

/// Ends a scope and releases its session if [`SessionBinder::run`] is dropped
/// before teardown
struct Teardown<P: SessionProvider> {
    binder: Option<SessionBinder<P>>,
    request: RequestId,
}

impl<P: SessionProvider> Teardown<P> {
    fn disarm(&mut self) {
        self.binder = None;
    }
}

impl<P: SessionProvider> Drop for Teardown<P> {
    fn drop(&mut self) {
        let Some(binder) = self.binder.take() else {
            return;
        };
        let request = self.request;
        let key = ScopeKey::Request(request);

        warn!("Request scope {} ended without teardown, releasing session in background", key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(session) = binder.end_scope(request).await {
                        if let Err(e) = binder.provider.release(session).await {
                            error!("Background session release for {} failed: {}", key, e);
                        }
                    }
                });
            }
            Err(_) => error!("No runtime available to release session for {}", key),
        }
    }
}
