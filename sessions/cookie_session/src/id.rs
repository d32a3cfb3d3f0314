use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// The identifier for a session.
///
/// It is the value carried by the session cookie and the key used by
/// the storage backend to locate the server-side record.
///
/// # Format stability
///
/// From an API perspective, a session id is an opaque string.
/// Any cookie value is accepted as a candidate identifier: it is up to
/// the storage backend to decide whether it refers to a live session.
/// Do **not** depend on the format of the identifiers minted by [`SessionId::random`].
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random identifier using the random number generator
    /// provided by the underlying operating system.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identifier, as it appears in the session cookie.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
