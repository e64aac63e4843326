use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;

use crate::context::{ContextError, SessionProvider};
use crate::fields;
use crate::selector::FieldDef;
use crate::serialize::{Entity, Node};

/// A pooled connection owned by one request scope
pub type PgSession = Mutex<PoolConnection<Postgres>>;

/// Hands each request scope its own pooled Postgres connection.
/// Releasing the session returns the connection to the pool.
#[derive(Clone)]
pub struct PgSessionProvider {
    pool: PgPool,
}

impl PgSessionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionProvider for PgSessionProvider {
    type Session = PgSession;

    async fn create(&self) -> Result<PgSession, ContextError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ContextError::Create(e.to_string()))?;
        Ok(Mutex::new(conn))
    }

    async fn health_check(&self) -> Result<(), ContextError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ContextError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn describe(&self, session: &PgSession) -> Result<Node, ContextError> {
        let mut conn = session.lock().await;
        let (database, db_user, backend_pid, server_time) =
            sqlx::query_as::<_, (String, String, i32, DateTime<Utc>)>(
                "SELECT current_database(), current_user::text, pg_backend_pid(), now()",
            )
            .fetch_one(&mut **conn)
            .await
            .map_err(|e| ContextError::Unavailable(e.to_string()))?;

        Ok(Node::entity(ConnectionInfo {
            database,
            db_user,
            backend_pid,
            server_time,
        }))
    }

    async fn release(&self, session: Arc<PgSession>) -> Result<(), ContextError> {
        match Arc::try_unwrap(session) {
            Ok(conn) => {
                drop(conn.into_inner());
                Ok(())
            }
            Err(shared) => Err(ContextError::Release(format!(
                "connection still held by {} other reference(s)",
                Arc::strong_count(&shared) - 1
            ))),
        }
    }
}

/// What the server reports about the connection backing a request
struct ConnectionInfo {
    database: String,
    db_user: String,
    backend_pid: i32,
    server_time: DateTime<Utc>,
}

impl Entity for ConnectionInfo {
    fn entity_name(&self) -> &'static str {
        "connection_info"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![public database, public backend_pid, public server_time, private db_user]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "database" => Some(self.database.as_str().into()),
            "backend_pid" => Some(self.backend_pid.into()),
            "server_time" => Some(self.server_time.into()),
            "db_user" => Some(self.db_user.as_str().into()),
            _ => None,
        }
    }
}
