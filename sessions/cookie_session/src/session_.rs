use jiff::Timestamp;
use std::collections::HashMap;
use std::collections::hash_map;

use crate::SessionId;
use crate::store::SessionRecord;

#[derive(Clone, Debug)]
/// The server-side state attached to an HTTP session.
///
/// A `Session` is pure in-memory data: reading or mutating it never
/// talks to the storage backend.
/// Changes are synced with the store by [`SessionMiddleware`] once the
/// request has been handled.
///
/// # Identity
///
/// A session that has never been persisted has no identifier: it is considered **new**.
/// The storage backend assigns one the first time the session is written.
///
/// Two sessions are equal if and only if they both have an identifier and
/// the identifiers match.
/// A new session is never equal to any other session, not even to itself.
///
/// [`SessionMiddleware`]: crate::SessionMiddleware
pub struct Session {
    id: Option<SessionId>,
    state: HashMap<String, String>,
    created_at: Timestamp,
    expires_at: Option<Timestamp>,
}

impl Session {
    /// Create a brand-new session, with no identifier and an empty payload.
    pub fn new() -> Self {
        Self {
            id: None,
            state: HashMap::new(),
            created_at: Timestamp::now(),
            expires_at: None,
        }
    }

    /// Rebuild a session that was retrieved from the storage backend.
    pub fn from_record(id: SessionId, record: SessionRecord) -> Self {
        Self {
            id: Some(id),
            state: record.state,
            created_at: record.created_at,
            expires_at: Some(record.expires_at),
        }
    }

    /// The session identifier, if the session has already been persisted.
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// `true` if the session has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// When the session was first created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the stored record expires.
    ///
    /// `None` for sessions that have not been persisted yet.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Get the value associated with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.state.get(key).map(String::as_str)
    }

    /// Set a value for the given key.
    ///
    /// If the key already exists, the value is updated and the old value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.state.insert(key.into(), value.into())
    }

    /// Remove the value associated with `key`.
    ///
    /// If the key exists, the removed value is returned.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.state.remove(key)
    }

    /// `true` if there is a value associated with `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.contains_key(key)
    }

    /// Remove all key-value pairs from the session.
    ///
    /// This doesn't destroy the session: the (now empty) session will still be
    /// persisted at the end of the request.
    /// Use [`SessionCache::clear`] to destroy it.
    ///
    /// [`SessionCache::clear`]: crate::SessionCache::clear
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// The number of key-value pairs in the session.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// `true` if there are no key-value pairs in the session.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Iterate over all key-value pairs, in arbitrary order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.state.iter(),
        }
    }

    pub(crate) fn state(&self) -> &HashMap<String, String> {
        &self.state
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Iterator over the key-value pairs of a [`Session`].
pub struct Iter<'session> {
    inner: hash_map::Iter<'session, String, String>,
}

impl<'session> Iterator for Iter<'session> {
    type Item = (&'session str, &'session str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'session> IntoIterator for &'session Session {
    type Item = (&'session str, &'session str);
    type IntoIter = Iter<'session>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
