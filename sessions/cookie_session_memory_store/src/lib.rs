//! An in-memory session store for `cookie_session`, geared towards testing and local development.
use jiff::Timestamp;
use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};
use tokio::sync::Mutex;

use cookie_session::{
    SessionId,
    store::{
        SessionRecord, SessionRecordRef, SessionStorageBackend,
        errors::{DeleteError, DeleteExpiredError, ReadError, UnknownIdError, WriteError},
    },
};

#[derive(Clone, Default)]
/// An in-memory session store.
///
/// # Limitations
///
/// This store won't persist data between server restarts.
/// It also won't synchronize data between multiple server instances.
/// It is primarily intended for testing and local development.
pub struct InMemorySessionStore(Arc<Mutex<HashMap<SessionId, StoreRecord>>>);

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct StoreRecord {
    state: HashMap<String, String>,
    created_at: Timestamp,
    deadline: Timestamp,
}

impl StoreRecord {
    fn is_stale(&self, now: Timestamp) -> bool {
        self.deadline <= now
    }
}

impl InMemorySessionStore {
    /// Creates a new (empty) in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of records currently held by the store, expired ones included.
    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    /// `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStorageBackend for InMemorySessionStore {
    #[tracing::instrument(name = "Read server-side session record", level = tracing::Level::TRACE, skip_all)]
    async fn read(&self, id: &SessionId) -> Result<SessionRecord, ReadError> {
        let guard = self.0.lock().await;
        match guard.get(id) {
            Some(record) if !record.is_stale(Timestamp::now()) => Ok(SessionRecord {
                state: record.state.clone(),
                created_at: record.created_at,
                expires_at: record.deadline,
            }),
            _ => Err(UnknownIdError { id: id.to_owned() }.into()),
        }
    }

    #[tracing::instrument(name = "Write server-side session record", level = tracing::Level::TRACE, skip_all)]
    async fn write(
        &self,
        id: Option<&SessionId>,
        record: SessionRecordRef<'_>,
    ) -> Result<SessionId, WriteError> {
        let deadline = Timestamp::now()
            .checked_add(record.ttl)
            .map_err(|e| WriteError::Other(anyhow::Error::new(e).context("Invalid session TTL")))?;
        let mut guard = self.0.lock().await;
        let id = match id {
            Some(id) => id.to_owned(),
            None => loop {
                let candidate = SessionId::random();
                if !guard.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        guard.insert(
            id.clone(),
            StoreRecord {
                state: record.state.into_owned(),
                created_at: record.created_at,
                deadline,
            },
        );
        Ok(id)
    }

    #[tracing::instrument(name = "Delete server-side session record", level = tracing::Level::TRACE, skip_all)]
    async fn delete(&self, id: &SessionId) -> Result<(), DeleteError> {
        self.0.lock().await.remove(id);
        Ok(())
    }

    #[tracing::instrument(name = "Delete expired records", level = tracing::Level::TRACE, skip_all)]
    async fn delete_expired(
        &self,
        batch_size: Option<NonZeroUsize>,
    ) -> Result<usize, DeleteExpiredError> {
        let mut guard = self.0.lock().await;
        let now = Timestamp::now();
        let limit = batch_size.map(NonZeroUsize::get).unwrap_or(usize::MAX);
        let stale_ids: Vec<SessionId> = guard
            .iter()
            .filter(|(_, record)| record.is_stale(now))
            .map(|(id, _)| id.to_owned())
            .take(limit)
            .collect();
        for id in &stale_ids {
            guard.remove(id);
        }
        Ok(stale_ids.len())
    }
}
