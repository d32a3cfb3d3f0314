use crate::Session;

#[derive(Debug, Default)]
/// Holds the session for the request currently being processed.
///
/// There is exactly one `SessionCache` per request: it is built by
/// [`SessionMiddleware::load`] when the request comes in and consumed by
/// [`SessionMiddleware::finalize`] once the response is ready.
/// Every handler in between works against the same instance, therefore they
/// all observe the same [`Session`].
///
/// The cache never talks to the storage backend.
///
/// [`SessionMiddleware::load`]: crate::SessionMiddleware::load
/// [`SessionMiddleware::finalize`]: crate::SessionMiddleware::finalize
pub struct SessionCache {
    session: Option<Session>,
    /// Set by [`clear`](Self::clear), reset by [`get`](Self::get).
    destroyed: bool,
}

impl SessionCache {
    /// An empty cache: no session has been loaded or created yet.
    pub fn new() -> Self {
        Self {
            session: None,
            destroyed: false,
        }
    }

    /// A cache pre-populated with a session retrieved from the store.
    pub fn preloaded(session: Session) -> Self {
        Self {
            session: Some(session),
            destroyed: false,
        }
    }

    /// Get the current session, creating a brand-new one if there is none.
    ///
    /// The new session has no identifier and an empty payload:
    /// the store assigns it an identifier when the request completes.
    pub fn get(&mut self) -> &mut Session {
        self.destroyed = false;
        self.session.get_or_insert_with(Session::new)
    }

    /// Destroy the current session, if any.
    ///
    /// If the request came in with a session cookie, the server-side record it
    /// points to is deleted and the client is instructed to discard the cookie.
    /// Calling [`get`](Self::get) afterwards starts a brand-new session.
    pub fn clear(&mut self) {
        if self.session.take().is_some() {
            tracing::trace!("The current session has been destroyed");
        }
        self.destroyed = true;
    }

    /// `true` if [`clear`](Self::clear) was the last operation to affect the session.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Look at the current session without creating one.
    pub fn peek(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Option<Session>, bool) {
        (self.session, self.destroyed)
    }
}
