use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use biscotti::{RequestCookie, RequestCookies};
use cookie_session::{
    SessionConfig, SessionId, SessionMiddleware, SessionStore,
    store::{
        SessionRecord, SessionRecordRef, SessionStorageBackend,
        errors::{DeleteError, DeleteExpiredError, ReadError, WriteError},
    },
};
use cookie_session_memory_store::InMemorySessionStore;
use tokio::sync::Mutex;

/// An empty in-memory session store.
pub fn store() -> SessionStore {
    SessionStore::new(InMemorySessionStore::default())
}

/// An empty in-memory session store, with a mechanism to inspect
/// what calls were made to it.
pub fn spy_store() -> (SessionStore, CallTracker) {
    let spy_backend = SpyBackend::new(InMemorySessionStore::default());
    let call_tracker = spy_backend.call_tracker();
    (SessionStore::new(spy_backend), call_tracker)
}

/// A middleware backed by a spy store, using the default configuration.
pub fn spy_middleware() -> (SessionMiddleware, CallTracker) {
    let (store, call_tracker) = spy_store();
    (
        SessionMiddleware::new(store, SessionConfig::default()),
        call_tracker,
    )
}

/// Request cookies carrying `value` as the session cookie.
pub fn session_cookie(config: &SessionConfig, value: &str) -> RequestCookies<'static> {
    let mut cookies = RequestCookies::new();
    cookies.append(RequestCookie::new(config.cookie.name.clone(), value.to_owned()));
    cookies
}

/// A helper to set up a pre-existing session.
#[derive(Default)]
pub struct SessionFixture {
    pub state: HashMap<String, String>,
    /// If `None`, it'll be defaulted to a value that's high enough
    /// to avoid expiration while we run the test suite.
    pub ttl: Option<std::time::Duration>,
}

impl SessionFixture {
    /// Create the server-side record and return the ID it was stored under.
    ///
    /// Spy stores record the write: call [`CallTracker::reset`] afterwards
    /// if you want to inspect the operations performed by the test alone.
    pub async fn setup(&self, store: &SessionStore) -> SessionId {
        let mut session = cookie_session::Session::new();
        for (key, value) in &self.state {
            session.insert(key.clone(), value.clone());
        }
        let ttl = self.ttl.unwrap_or(std::time::Duration::from_secs(1000));
        store
            .write(&session, ttl)
            .await
            .expect("Failed to create server-side state for session fixture")
    }
}

/// A wrapper that keeps track of which methods have been called
/// on the underlying session storage backend
#[derive(Debug)]
pub struct SpyBackend<B> {
    backend: B,
    call_tracker: CallTracker,
}

impl<B> SpyBackend<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            call_tracker: Default::default(),
        }
    }

    pub fn call_tracker(&self) -> CallTracker {
        self.call_tracker.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallTracker(Arc<Mutex<Vec<String>>>);

impl CallTracker {
    pub async fn assert_store_was_untouched(&self) {
        let oplog = self.0.lock().await;
        assert!(
            oplog.is_empty(),
            "Server store was supposed to be untouched, but at least one method has been called on it. Operation log:\n  - {}",
            oplog.join("\n  - ")
        )
    }

    pub async fn operation_log(&self) -> Vec<String> {
        self.0.lock().await.clone()
    }

    /// Forget all operations recorded so far.
    pub async fn reset(&self) {
        self.0.lock().await.clear();
    }

    async fn push_operation(&self, op: impl Into<String>) {
        self.0.lock().await.push(op.into());
    }
}

#[async_trait::async_trait]
impl<B: SessionStorageBackend> SessionStorageBackend for SpyBackend<B> {
    async fn read(&self, id: &SessionId) -> Result<SessionRecord, ReadError> {
        self.call_tracker.push_operation(format!("read {id}")).await;
        self.backend.read(id).await
    }

    async fn write(
        &self,
        id: Option<&SessionId>,
        record: SessionRecordRef<'_>,
    ) -> Result<SessionId, WriteError> {
        let outcome = self.backend.write(id, record).await;
        let op = match (id, &outcome) {
            (Some(id), _) => format!("write {id}"),
            (None, Ok(new_id)) => format!("write <new> -> {new_id}"),
            (None, Err(_)) => "write <new>".to_string(),
        };
        self.call_tracker.push_operation(op).await;
        outcome
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DeleteError> {
        self.call_tracker.push_operation(format!("delete {id}")).await;
        self.backend.delete(id).await
    }

    async fn delete_expired(
        &self,
        batch_size: Option<NonZeroUsize>,
    ) -> Result<usize, DeleteExpiredError> {
        let batch_size_fmt = batch_size.map(|b| format!(" {b}")).unwrap_or_default();
        self.call_tracker
            .push_operation(format!("delete-expired{batch_size_fmt}"))
            .await;
        self.backend.delete_expired(batch_size).await
    }
}

/// Which operations should fail on a [`FailingBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOn {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

/// A backend that simulates I/O failures on demand, delegating to an
/// in-memory store otherwise.
#[derive(Debug)]
pub struct FailingBackend {
    inner: InMemorySessionStore,
    fail_on: FailOn,
}

impl FailingBackend {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            inner: InMemorySessionStore::default(),
            fail_on,
        }
    }

    fn io_error(operation: &str) -> anyhow::Error {
        anyhow::anyhow!("Connection reset by peer while executing `{operation}`")
    }
}

#[async_trait::async_trait]
impl SessionStorageBackend for FailingBackend {
    async fn read(&self, id: &SessionId) -> Result<SessionRecord, ReadError> {
        if self.fail_on.read {
            return Err(ReadError::Other(Self::io_error("read")));
        }
        self.inner.read(id).await
    }

    async fn write(
        &self,
        id: Option<&SessionId>,
        record: SessionRecordRef<'_>,
    ) -> Result<SessionId, WriteError> {
        if self.fail_on.write {
            return Err(WriteError::Other(Self::io_error("write")));
        }
        self.inner.write(id, record).await
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DeleteError> {
        if self.fail_on.delete {
            return Err(DeleteError::Other(Self::io_error("delete")));
        }
        self.inner.delete(id).await
    }

    async fn delete_expired(
        &self,
        batch_size: Option<NonZeroUsize>,
    ) -> Result<usize, DeleteExpiredError> {
        self.inner.delete_expired(batch_size).await
    }
}
