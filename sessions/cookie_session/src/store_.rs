use crate::{Session, SessionId};
use errors::{DeleteError, DeleteExpiredError, ReadError, WriteError};
use jiff::Timestamp;
use std::{borrow::Cow, collections::HashMap, num::NonZeroUsize, sync::Arc};

/// Where server-side session records are stored.
///
/// It is a thin wrapper
/// [around your chosen storage backend implementation][`SessionStorageBackend`],
/// removing the need to specify the concrete type of the storage backend
/// everywhere in your code.
///
/// Cloning a `SessionStore` is cheap: all clones share the same backend.
/// Build it once, at startup, and hand a clone to every
/// [`SessionMiddleware`](crate::SessionMiddleware) that needs it.
#[derive(Debug, Clone)]
pub struct SessionStore(Arc<dyn SessionStorageBackend>);

impl SessionStore {
    /// Creates a new session store using the provided backend.
    pub fn new<Backend>(backend: Backend) -> Self
    where
        Backend: SessionStorageBackend + 'static,
    {
        Self(Arc::new(backend))
    }

    /// Loads the session associated with the provided ID.
    ///
    /// It fails with [`ReadError::NotFound`] if the ID is unknown or
    /// the corresponding record has expired.
    pub async fn read(&self, id: &SessionId) -> Result<Session, ReadError> {
        let record = self.0.read(id).await?;
        Ok(Session::from_record(id.to_owned(), record))
    }

    /// Persist the session, refreshing its expiration to `now + ttl`.
    ///
    /// A new session (i.e. one without an identifier) gets a freshly minted
    /// identifier, which is returned.
    /// For an existing session, its current identifier is returned.
    pub async fn write(
        &self,
        session: &Session,
        ttl: std::time::Duration,
    ) -> Result<SessionId, WriteError> {
        let record = SessionRecordRef {
            state: Cow::Borrowed(session.state()),
            created_at: session.created_at(),
            ttl,
        };
        self.0.write(session.id(), record).await
    }

    /// Deletes the session record associated with the provided ID.
    ///
    /// Deleting an unknown ID is not an error.
    pub async fn delete(&self, id: &SessionId) -> Result<(), DeleteError> {
        self.0.delete(id).await
    }

    /// Deletes expired session records from the store.
    ///
    /// If `batch_size` is provided, at most `batch_size` records are deleted
    /// in a single call.
    /// It returns the number of deleted records.
    pub async fn delete_expired(
        &self,
        batch_size: Option<NonZeroUsize>,
    ) -> Result<usize, DeleteExpiredError> {
        self.0.delete_expired(batch_size).await
    }
}

#[async_trait::async_trait]
/// The interface of a session storage backend.
///
/// All concurrency control for the same session ID accessed by concurrent
/// requests is the backend's responsibility: callers behave as
/// last-write-wins clients.
pub trait SessionStorageBackend: std::fmt::Debug + Send + Sync {
    /// Loads an existing session record from the store using the provided ID.
    ///
    /// It fails with [`ReadError::NotFound`] if the ID is unknown
    /// or the record has expired.
    async fn read(&self, id: &SessionId) -> Result<SessionRecord, ReadError>;

    /// Insert or overwrite a session record.
    ///
    /// If `id` is `None`, the backend mints a new identifier.
    /// The deadline of the record is set to `now + record.ttl`.
    /// It returns the identifier the record is stored under.
    async fn write(
        &self,
        id: Option<&SessionId>,
        record: SessionRecordRef<'_>,
    ) -> Result<SessionId, WriteError>;

    /// Deletes a session record from the store using the provided ID.
    ///
    /// Deleting an unknown ID is not an error.
    async fn delete(&self, id: &SessionId) -> Result<(), DeleteError>;

    /// Deletes expired session records from the store.
    ///
    /// If `batch_size` is provided, at most `batch_size` records are deleted.
    /// It returns the number of deleted records.
    async fn delete_expired(
        &self,
        batch_size: Option<NonZeroUsize>,
    ) -> Result<usize, DeleteExpiredError>;
}

/// A server-side session record that's going to be stored in the
/// chosen storage backend.
#[derive(Debug)]
pub struct SessionRecordRef<'session> {
    /// The set of key-value pairs attached to a session.
    pub state: Cow<'session, HashMap<String, String>>,
    /// When the session was first created.
    pub created_at: Timestamp,
    /// How long the record should be kept, starting from now.
    pub ttl: std::time::Duration,
}

/// A server-side session record that was retrieved from the
/// chosen storage backend.
#[derive(Debug)]
pub struct SessionRecord {
    /// The set of key-value pairs attached to a session.
    pub state: HashMap<String, String>,
    /// When the session was first created.
    pub created_at: Timestamp,
    /// When the record expires.
    pub expires_at: Timestamp,
}

/// Errors that can occur when interacting with a session storage backend.
pub mod errors {
    use crate::SessionId;

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::read`][super::SessionStorageBackend::read].
    pub enum ReadError {
        #[error(transparent)]
        /// There is no live session with the given ID.
        NotFound(#[from] UnknownIdError),
        /// Failed to deserialize the stored session state.
        #[error("Failed to deserialize the session state.")]
        DeserializationError(#[source] anyhow::Error),
        /// Something else went wrong when loading the session record.
        #[error("Something went wrong when loading the session record.")]
        Other(#[source] anyhow::Error),
    }

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::write`][super::SessionStorageBackend::write].
    pub enum WriteError {
        /// Failed to serialize the session state.
        #[error("Failed to serialize the session state.")]
        SerializationError(#[source] anyhow::Error),
        /// Something else went wrong when writing the session record.
        #[error("Something went wrong when writing the session record.")]
        Other(#[source] anyhow::Error),
    }

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::delete`][super::SessionStorageBackend::delete].
    pub enum DeleteError {
        /// Something went wrong when deleting the session record.
        #[error("Something went wrong when deleting the session record.")]
        Other(#[source] anyhow::Error),
    }

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::delete_expired`][super::SessionStorageBackend::delete_expired].
    pub enum DeleteExpiredError {
        /// Something went wrong when deleting expired session records.
        #[error("Something went wrong when deleting expired session records.")]
        Other(#[source] anyhow::Error),
    }

    #[derive(Debug, thiserror::Error)]
    #[error("There is no session with the given id")]
    /// There is no session with the given ID.
    pub struct UnknownIdError {
        pub id: SessionId,
    }
}
