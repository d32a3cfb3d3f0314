/*!
Server-side HTTP sessions, carried by a cookie.

# Why do we need sessions?

HTTP is stateless: the client sends a request, the server
parses its content, performs some processing and returns a response.
That's not enough to, say, keep a user logged in across page navigations.

**Sessions** attach state to a set of requests coming from the same client.
The server sets a cookie in the response (`Set-Cookie` header), the client stores it
and sends it back whenever it issues new requests (`Cookie` header).

# Anatomy of a session

The session cookie only holds an opaque **session ID**.
The data attached to the session lives on the server, inside a
[session storage backend][`SessionStorageBackend`]: a SQL database,
a cache, an in-memory map.

# Lifecycle

For every request, [`SessionMiddleware`]:

1. Reads the session cookie, if any, and loads the corresponding [`Session`]
   from the [`SessionStore`] into a fresh [`SessionCache`].
2. Lets the request handlers use the cache. [`SessionCache::get`] returns the current
   session, creating a new one on first access; [`SessionCache::clear`] destroys it.
3. Once the response is ready, persists the session (and sets the cookie to its ID),
   or deletes the destroyed session (and tells the client to discard the cookie),
   or does nothing if the request never touched a session.

## References

Further reading on sessions:
- [RFC 6265](https://datatracker.ietf.org/doc/html/rfc6265);
- [OWASP's session management cheat-sheet](https://cheatsheetseries.owasp.org/cheatsheets/Session_Management_Cheat_Sheet.html).
*/
mod cache;
pub mod config;
mod id;
mod incoming;
mod middleware;
pub mod removal;
mod session_;
mod store_;

pub use cache::SessionCache;
pub use id::SessionId;
pub use incoming::IncomingSession;
pub use middleware::{SessionMiddleware, SessionOutcome, errors, finalize_session};
pub use session_::{Iter, Session};
pub use store_::{SessionStorageBackend, SessionStore};

pub mod store {
    //! Types and traits related to [`SessionStore`][super::SessionStore].
    pub use crate::store_::errors;
    pub use crate::store_::{SessionRecord, SessionRecordRef, SessionStorageBackend};
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure how sessions are managed.
///
/// The default configuration follows
/// [OWASP's guidelines for secure session management](https://cheatsheetseries.owasp.org/cheatsheets/Session_Management_Cheat_Sheet.html).
pub struct SessionConfig {
    #[serde(default)]
    /// Configure the session cookie.
    pub cookie: crate::config::SessionCookieConfig,
    #[serde(default)]
    /// Configure how long sessions live.
    pub state: crate::config::SessionStateConfig,
}

impl SessionConfig {
    /// Create a new session configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }
}
