use biscotti::RequestCookies;
use tracing_log_error::log_error;

use crate::config::SessionCookieConfig;
use crate::store::errors::ReadError;
use crate::{SessionCache, SessionId, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the incoming request told us about its session.
///
/// Built using [`IncomingSession::resolve`].
pub enum IncomingSession {
    /// The request didn't carry a session cookie.
    NoCookie,
    /// The request carried a session cookie and the store returned
    /// the corresponding session.
    Loaded(SessionId),
    /// The request carried a session cookie, but the store couldn't
    /// provide the corresponding session: the ID was unknown, it had expired
    /// or the store failed to answer.
    Invalid(SessionId),
}

impl IncomingSession {
    /// Look for a session cookie in the incoming request and, if there is one,
    /// try to load the corresponding session from the store.
    ///
    /// It never fails: if the session can't be loaded, the returned cache is empty
    /// and a brand-new session is created the first time a handler asks for one.
    pub async fn resolve(
        cookies: &RequestCookies<'_>,
        config: &SessionCookieConfig,
        store: &SessionStore,
    ) -> (Self, SessionCache) {
        let Some(cookie) = cookies.get(&config.name) else {
            return (Self::NoCookie, SessionCache::new());
        };
        if cookie.value().is_empty() {
            tracing::trace!("The session cookie is empty, ignoring it.");
            return (Self::NoCookie, SessionCache::new());
        }
        let id = SessionId::from(cookie.value());
        match store.read(&id).await {
            Ok(session) => (Self::Loaded(id), SessionCache::preloaded(session)),
            Err(ReadError::NotFound(_)) => {
                tracing::debug!(
                    "The session cookie refers to an unknown or expired session. \
                    A new session will be created if needed."
                );
                (Self::Invalid(id), SessionCache::new())
            }
            Err(e) => {
                log_error!(
                    e,
                    level: tracing::Level::WARN,
                    "Failed to load the session from the store. \
                    A new session will be created if needed."
                );
                (Self::Invalid(id), SessionCache::new())
            }
        }
    }

    /// The session ID carried by the incoming request, if any.
    pub fn cookie_id(&self) -> Option<&SessionId> {
        match self {
            Self::NoCookie => None,
            Self::Loaded(id) | Self::Invalid(id) => Some(id),
        }
    }
}
