//! Types related to [`SqliteSessionStore`].

use cookie_session::{
    SessionId, SessionStore,
    store::{
        SessionRecord, SessionRecordRef, SessionStorageBackend,
        errors::{DeleteError, DeleteExpiredError, ReadError, UnknownIdError, WriteError},
    },
};
use jiff::Timestamp;
use sqlx::{SqlitePool, error::DatabaseError, sqlite::SqliteError};
use std::num::NonZeroUsize;

#[derive(Debug, Clone)]
/// A server-side session store using SQLite as its backend.
///
/// # Implementation details
///
/// This store uses `sqlx` to interact with SQLite.
/// All session records are stored in a single table, with the session state
/// serialized as a JSON object. You can use
/// [`migrate`](Self::migrate) to create the table and index
/// required by the store in the database.
/// Alternatively, you can use [`migration_query`](Self::migration_query)
/// to get the SQL query that creates the table and index in order to run it yourself
/// (e.g. as part of your database migration scripts).
///
/// Deadlines are stored with a resolution of one second.
pub struct SqliteSessionStore(sqlx::SqlitePool);

impl From<SqliteSessionStore> for SessionStore {
    fn from(value: SqliteSessionStore) -> Self {
        SessionStore::new(value)
    }
}

impl SqliteSessionStore {
    /// Creates a new SQLite session store instance.
    ///
    /// It requires a pool of SQLite connections to interact with the database
    /// where the session records are stored.
    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }

    /// Return the query used to create the sessions table and index.
    ///
    /// # Implementation details
    ///
    /// The query is designed to be idempotent, meaning it can be run multiple times
    /// without causing any issues. If the table and index already exist, the query
    /// does nothing.
    ///
    /// # Alternatives
    ///
    /// You can use this method to add the query to your database migration scripts.
    /// Alternatively, you can use [`migrate`](Self::migrate)
    /// to run the query directly on the database.
    pub fn migration_query() -> &'static str {
        "-- Create the sessions table if it doesn't exist
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    deadline INTEGER NOT NULL,
    state TEXT NOT NULL
);

-- Create the index on the deadline column if it doesn't exist
CREATE INDEX IF NOT EXISTS idx_sessions_deadline ON sessions(deadline);"
    }

    /// Create the sessions table and index in the database.
    ///
    /// This method is idempotent, meaning it can be called multiple times without
    /// causing any issues. If the table and index already exist, this method does nothing.
    ///
    /// If you prefer to run the query yourself, rely on [`migration_query`](Self::migration_query)
    /// to get the SQL that's being executed.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        use sqlx::Executor as _;

        self.0.execute(Self::migration_query()).await?;
        Ok(())
    }

    async fn insert_new(
        &self,
        created_at: i64,
        deadline: i64,
        state: &str,
    ) -> Result<SessionId, WriteError> {
        loop {
            let id = SessionId::random();
            let query = sqlx::query(
                "INSERT INTO sessions (id, created_at, deadline, state) \
                VALUES (?, ?, ?, ?)",
            )
            .bind(id.as_str())
            .bind(created_at)
            .bind(deadline)
            .bind(state);
            match query.execute(&self.0).await {
                Ok(_) => return Ok(id),
                // The freshly minted ID is already taken: roll the dice again.
                Err(e) if is_duplicated_id_error(&e) => continue,
                Err(e) => return Err(WriteError::Other(e.into())),
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionStorageBackend for SqliteSessionStore {
    /// Loads an existing session record from the store using the provided ID.
    ///
    /// Expired records are treated as missing.
    #[tracing::instrument(name = "Read server-side session record", level = tracing::Level::INFO, skip_all)]
    async fn read(&self, id: &SessionId) -> Result<SessionRecord, ReadError> {
        let row = sqlx::query(
            "SELECT created_at, deadline, state \
            FROM sessions \
            WHERE id = ? AND deadline > unixepoch()",
        )
        .bind(id.as_str())
        .fetch_optional(&self.0)
        .await
        .map_err(|e| ReadError::Other(e.into()))?;
        let Some(row) = row else {
            return Err(UnknownIdError { id: id.to_owned() }.into());
        };

        use anyhow::Context as _;
        use sqlx::Row as _;

        let created_at_ms: i64 = row
            .try_get(0)
            .context("Failed to deserialize the retrieved session creation time")
            .map_err(ReadError::DeserializationError)?;
        let created_at = Timestamp::from_millisecond(created_at_ms)
            .context("Failed to parse the retrieved session creation time")
            .map_err(ReadError::DeserializationError)?;
        let deadline_unix: i64 = row
            .try_get(1)
            .context("Failed to deserialize the retrieved session deadline")
            .map_err(ReadError::DeserializationError)?;
        let expires_at = Timestamp::from_second(deadline_unix)
            .context("Failed to parse the retrieved session deadline")
            .map_err(ReadError::DeserializationError)?;
        let state: String = row
            .try_get(2)
            .context("Failed to deserialize the retrieved session state")
            .map_err(ReadError::DeserializationError)?;
        let state = serde_json::from_str(&state)
            .context("Failed to deserialize the retrieved session state")
            .map_err(ReadError::DeserializationError)?;
        Ok(SessionRecord {
            state,
            created_at,
            expires_at,
        })
    }

    /// Insert or overwrite a session record.
    ///
    /// If no ID is provided, a new one is minted and guaranteed not to collide
    /// with any existing record.
    #[tracing::instrument(name = "Write server-side session record", level = tracing::Level::INFO, skip_all)]
    async fn write(
        &self,
        id: Option<&SessionId>,
        record: SessionRecordRef<'_>,
    ) -> Result<SessionId, WriteError> {
        let deadline = Timestamp::now()
            .checked_add(record.ttl)
            .map_err(|e| WriteError::Other(anyhow::Error::new(e).context("Invalid session TTL")))?
            .as_second();
        let created_at = record.created_at.as_millisecond();
        let state = serde_json::to_string(&record.state)
            .map_err(|e| WriteError::SerializationError(e.into()))?;

        let Some(id) = id else {
            return self.insert_new(created_at, deadline, &state).await;
        };
        let query = sqlx::query(
            "INSERT INTO sessions (id, created_at, deadline, state) \
            VALUES (?, ?, ?, ?) \
            ON CONFLICT(id) DO UPDATE \
            SET deadline = excluded.deadline, state = excluded.state",
        )
        .bind(id.as_str())
        .bind(created_at)
        .bind(deadline)
        .bind(state.as_str());
        query
            .execute(&self.0)
            .await
            .map_err(|e| WriteError::Other(e.into()))?;
        Ok(id.to_owned())
    }

    /// Deletes a session record from the store using the provided ID.
    ///
    /// Deleting an unknown ID is a no-op.
    #[tracing::instrument(name = "Delete server-side session record", level = tracing::Level::INFO, skip_all)]
    async fn delete(&self, id: &SessionId) -> Result<(), DeleteError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.0)
            .await
            .map_err(|e| DeleteError::Other(e.into()))?;
        Ok(())
    }

    /// Delete expired sessions from the database.
    ///
    /// If `batch_size` is provided, the query will delete at most `batch_size` expired sessions.
    /// In either case, if successful, the method returns the number of expired sessions that
    /// have been deleted.
    ///
    /// # When should you delete in batches?
    ///
    /// If there are a lot of expired sessions in the database, deleting them all at once can
    /// cause performance issues. By deleting in batches, you can limit the number of sessions
    /// deleted in a single query, reducing the impact.
    ///
    /// # Example
    ///
    /// Delete expired sessions in batches of 1000:
    ///
    /// ```no_run
    /// use cookie_session::SessionStore;
    /// use cookie_session_sqlx::SqliteSessionStore;
    /// use std::num::NonZeroUsize;
    /// use std::time::Duration;
    ///
    /// # async fn delete_expired_sessions(pool: sqlx::SqlitePool) {
    /// let backend = SqliteSessionStore::new(pool);
    /// let store = SessionStore::new(backend);
    /// let batch_size = NonZeroUsize::new(1000);
    /// let batch_sleep = Duration::from_secs(60);
    /// loop {
    ///     if let Err(e) = store.delete_expired(batch_size).await {
    ///         tracing::error!(error.msg = %e, "Failed to delete a batch of expired sessions");
    ///     }
    ///     tokio::time::sleep(batch_sleep).await;
    /// }
    /// # }
    /// ```
    #[tracing::instrument(name = "Delete expired records", level = tracing::Level::INFO, skip_all)]
    async fn delete_expired(
        &self,
        batch_size: Option<NonZeroUsize>,
    ) -> Result<usize, DeleteExpiredError> {
        let query = if let Some(batch_size) = batch_size {
            let batch_size: i64 = batch_size.get().try_into().unwrap_or(i64::MAX);
            sqlx::query(
                "DELETE FROM sessions WHERE id IN \
                (SELECT id FROM sessions WHERE deadline <= unixepoch() LIMIT ?)",
            )
            .bind(batch_size)
        } else {
            sqlx::query("DELETE FROM sessions WHERE deadline <= unixepoch()")
        };
        let r = query
            .execute(&self.0)
            .await
            .map_err(|e| DeleteExpiredError::Other(e.into()))?;
        Ok(r.rows_affected().try_into().unwrap_or(usize::MAX))
    }
}

fn is_duplicated_id_error(e: &sqlx::Error) -> bool {
    let Some(e) = e.as_database_error() else {
        return false;
    };
    let Some(e) = e.try_downcast_ref::<SqliteError>() else {
        return false;
    };
    // SQLITE_CONSTRAINT_PRIMARYKEY
    e.code() == Some("1555".into())
}
