use std::ops::{Deref, DerefMut};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use diesel::{
    QueryResult, SqliteConnection,
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{
    MIGRATIONS,
    util_resp::{FailureResponse, StandardResponse},
};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const IN_MEMORY: &str = ":memory:";

/// Applies the per-connection settings the schema relies on. SQLite keeps
/// foreign key enforcement (and therefore `ON DELETE CASCADE`) off unless it
/// is switched on for every new connection.
///
/// WAL lets readers proceed while a writer holds the lock. In-memory
/// databases ignore it.
pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(
        "PRAGMA busy_timeout = 5000; \
         PRAGMA journal_mode = WAL; \
         PRAGMA foreign_keys = ON;",
    )
}

#[derive(Debug)]
struct ConnectionSettings;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionSettings
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        configure_connection(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool. An in-memory database only exists inside the
/// connection that created it, so it always gets a single connection.
pub fn make_pool(
    database_url: &str,
    max_size: u32,
) -> Result<DbPool, diesel::r2d2::PoolError> {
    let max_size = if database_url == IN_MEMORY { 1 } else { max_size };

    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(ConnectionSettings))
        .build(ConnectionManager::<SqliteConnection>::new(database_url))
}

pub fn run_migrations(
    conn: &mut SqliteConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(())
}

/// A pooled connection, checked out for the remainder of the request.
///
/// Extractors that only need the database briefly (such as authentication)
/// take one of these and drop it before returning, so that a pool of size
/// one is never asked for two connections by the same request.
pub struct Conn {
    inner: PooledConnection<ConnectionManager<SqliteConnection>>,
}

impl Conn {
    /// Runs `f` with this connection on the blocking thread pool. The
    /// connection goes back to the pool when `f` returns.
    pub async fn run<T, F>(mut self, f: F) -> StandardResponse<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StandardResponse<T> + Send + 'static,
        T: Send + 'static,
    {
        spawn_blocking(move || {
            let conn: &mut SqliteConnection = &mut self;
            f(conn)
        })
        .await
        .map_err(|e| FailureResponse::Internal(format!("blocking task: {e}")))?
    }
}

impl Deref for Conn {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl DerefMut for Conn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Conn
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &S,
    ) -> StandardResponse<Self> {
        let pool = DbPool::from_ref(state);

        let inner = spawn_blocking(move || pool.get())
            .await
            .map_err(|e| FailureResponse::Internal(e.to_string()))??;

        Ok(Conn { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_moves_work_off_the_async_thread() {
        let pool = make_pool(IN_MEMORY, 1).unwrap();
        let caller = std::thread::current().id();

        let conn = Conn {
            inner: pool.get().unwrap(),
        };
        let worker = conn
            .run(|conn| {
                configure_connection(conn)?;
                Ok(std::thread::current().id())
            })
            .await
            .unwrap();

        assert_ne!(worker, caller);
        // Returned to the pool, so the next request can have it.
        assert_eq!(pool.state().idle_connections, 1);
    }

    #[tokio::test]
    async fn run_passes_errors_through() {
        let pool = make_pool(IN_MEMORY, 1).unwrap();
        let conn = Conn {
            inner: pool.get().unwrap(),
        };

        let err = conn
            .run(|_| Err::<(), _>(crate::util_resp::not_found()))
            .await
            .unwrap_err();
        assert!(matches!(err, FailureResponse::NotFound(_)));
    }
}
