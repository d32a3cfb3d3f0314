use std::future::Future;
use std::sync::Arc;

use biscotti::{Processor, ProcessorConfig, RequestCookies, ResponseCookie, ResponseCookies};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Request, Response};
use tracing_log_error::log_error;

use crate::config::SessionCookieKind;
use crate::removal::removal_cookie;
use crate::{IncomingSession, SessionCache, SessionConfig, SessionId, SessionStore};
use errors::{FinalizeError, RespondError};

/// Ties the session of each request to the session cookie and to the store.
///
/// It runs in two phases:
///
/// - **Inbound** ([`load`](Self::load)): if the request carries a session cookie,
///   the corresponding session is loaded from the store into a fresh [`SessionCache`].
///   Failures are absorbed: the request proceeds without a session.
/// - **Outbound** ([`finalize`](Self::finalize)): once the response is ready,
///   the final state of the cache decides what happens:
///     - a session is present → it is written to the store and the session cookie
///       is set to the identifier returned by the store;
///     - there is no session, but the request came in with a live one (or a handler
///       destroyed the session of a request carrying a stale cookie) → the record
///       is deleted and the client is told to discard its cookie;
///     - otherwise, nothing happens.
///
/// [`respond`](Self::respond) chains both phases around a request handler.
///
/// Cloning is cheap: the store, the configuration and the cookie processor are shared.
#[derive(Clone)]
pub struct SessionMiddleware {
    store: SessionStore,
    config: Arc<SessionConfig>,
    processor: Arc<Processor>,
}

impl std::fmt::Debug for SessionMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMiddleware")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// What the outbound phase did with the session.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The session was written to the store.
    /// The cookie carries the identifier returned by the store.
    Persisted(ResponseCookie<'static>),
    /// The session the request came in with was deleted from the store.
    /// The cookie instructs the client to discard its session cookie.
    Destroyed(ResponseCookie<'static>),
    /// The request never touched a session: neither the store nor the
    /// response cookies were modified.
    Untouched,
}

impl SessionOutcome {
    /// The cookie to attach to the outgoing response, if any.
    pub fn into_cookie(self) -> Option<ResponseCookie<'static>> {
        match self {
            Self::Persisted(cookie) | Self::Destroyed(cookie) => Some(cookie),
            Self::Untouched => None,
        }
    }
}

impl SessionMiddleware {
    /// Create a new middleware using the given store and configuration.
    ///
    /// Cookies are parsed and serialized using biscotti's default processor
    /// configuration. Use [`with_cookie_processor`](Self::with_cookie_processor)
    /// to customize it (e.g. to sign or encrypt the session cookie).
    pub fn new(store: SessionStore, config: SessionConfig) -> Self {
        let processor: Processor = ProcessorConfig::default().into();
        Self {
            store,
            config: Arc::new(config),
            processor: Arc::new(processor),
        }
    }

    /// Use a custom cookie processor.
    pub fn with_cookie_processor(mut self, processor: Processor) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The cookie processor used by [`respond`](Self::respond).
    pub fn cookie_processor(&self) -> &Processor {
        &self.processor
    }

    /// The inbound phase.
    ///
    /// It resolves the session referenced by the request cookies, if any,
    /// and returns the cache that handlers must use for the rest of the request.
    pub async fn load(&self, cookies: &RequestCookies<'_>) -> (IncomingSession, SessionCache) {
        IncomingSession::resolve(cookies, &self.config.cookie, &self.store).await
    }

    /// The outbound phase.
    ///
    /// It must be invoked exactly once per request, after all handlers are done
    /// with the cache.
    /// Store failures are returned to the caller: the response must not be
    /// sent as if the session had been persisted (or destroyed).
    #[tracing::instrument(name = "Finalize session", level = tracing::Level::TRACE, skip_all)]
    pub async fn finalize(
        &self,
        incoming: &IncomingSession,
        cache: SessionCache,
    ) -> Result<SessionOutcome, FinalizeError> {
        let (session, destroyed) = cache.into_parts();
        if let Some(session) = session {
            let id = self.store.write(&session, self.config.state.ttl).await?;
            return Ok(SessionOutcome::Persisted(self.session_cookie(id)));
        }
        match incoming {
            IncomingSession::Loaded(id) => self.destroy(id).await,
            // A stale cookie is only cleared if a handler explicitly destroyed the session.
            IncomingSession::Invalid(id) if destroyed => self.destroy(id).await,
            IncomingSession::Invalid(_) | IncomingSession::NoCookie => {
                Ok(SessionOutcome::Untouched)
            }
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<SessionOutcome, FinalizeError> {
        self.store.delete(id).await?;
        Ok(SessionOutcome::Destroyed(removal_cookie(&self.config.cookie)))
    }

    /// Wrap a request handler with both the inbound and the outbound phase.
    ///
    /// The handler receives the request together with the session cache and must
    /// hand the cache back alongside the response.
    /// The outbound phase only runs after the handler has completed: if the
    /// returned future is dropped early, the store is left untouched.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cookie_session::{SessionCache, SessionMiddleware};
    /// use http::{Request, Response};
    ///
    /// async fn visit(
    ///     middleware: &SessionMiddleware,
    ///     request: Request<()>,
    /// ) -> Result<Response<String>, cookie_session::errors::RespondError> {
    ///     middleware
    ///         .respond(request, |_request, mut cache: SessionCache| async move {
    ///             let session = cache.get();
    ///             let visits = session
    ///                 .get("visits")
    ///                 .and_then(|v| v.parse::<u64>().ok())
    ///                 .unwrap_or(0)
    ///                 + 1;
    ///             session.insert("visits", visits.to_string());
    ///             (Response::new(format!("Visit #{visits}")), cache)
    ///         })
    ///         .await
    /// }
    /// ```
    pub async fn respond<B, R, Next, Fut>(
        &self,
        request: Request<B>,
        next: Next,
    ) -> Result<Response<R>, RespondError>
    where
        Next: FnOnce(Request<B>, SessionCache) -> Fut,
        Fut: Future<Output = (Response<R>, SessionCache)>,
    {
        let (incoming, cache) = {
            let cookies = self.request_cookies(request.headers());
            self.load(&cookies).await
        };
        let (mut response, cache) = next(request, cache).await;
        let outcome = self.finalize(&incoming, cache).await?;

        if let Some(cookie) = outcome.into_cookie() {
            let mut response_cookies = ResponseCookies::new();
            response_cookies.insert(cookie);
            for value in response_cookies.header_values(&self.processor) {
                let header_value =
                    HeaderValue::from_str(&value).map_err(|_| RespondError::InvalidSetCookie {
                        invalid_header_value: value.clone(),
                    })?;
                response.headers_mut().append(SET_COOKIE, header_value);
            }
        }
        Ok(response)
    }

    /// Parse the `Cookie` headers of the incoming request.
    ///
    /// Malformed headers are skipped.
    fn request_cookies<'request>(&self, headers: &'request HeaderMap) -> RequestCookies<'request> {
        let mut cookies = RequestCookies::new();
        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                tracing::debug!("Skipping a `Cookie` header that isn't valid UTF-8");
                continue;
            };
            if let Err(e) = cookies.extend_from_header(header, &self.processor) {
                log_error!(
                    e,
                    level: tracing::Level::WARN,
                    "Skipping a malformed `Cookie` header"
                );
            }
        }
        cookies
    }

    fn session_cookie(&self, id: SessionId) -> ResponseCookie<'static> {
        let cookie_config = &self.config.cookie;
        let mut cookie = ResponseCookie::new(cookie_config.name.clone(), id.into_inner());
        if let Some(domain) = cookie_config.domain.as_deref() {
            cookie = cookie.set_domain(domain.to_owned());
        }
        if let Some(path) = cookie_config.path.as_deref() {
            cookie = cookie.set_path(path.to_owned());
        }
        if let Some(same_site) = cookie_config.same_site {
            cookie = cookie.set_same_site(same_site);
        }
        if cookie_config.secure {
            cookie = cookie.set_secure(true);
        }
        if cookie_config.http_only {
            cookie = cookie.set_http_only(true);
        }
        if cookie_config.kind == SessionCookieKind::Persistent {
            let max_age = jiff::SignedDuration::try_from(self.config.state.ttl)
                .unwrap_or(jiff::SignedDuration::MAX);
            cookie = cookie.set_max_age(max_age);
        }
        cookie
    }
}

/// A post-processing step to sync the session with the store and
/// attach the session cookie to the outgoing response, if needed.
///
/// Use it when your framework hands you a [`ResponseCookies`] collection rather than
/// letting [`SessionMiddleware::respond`] write the `Set-Cookie` header.
pub async fn finalize_session<Resp>(
    response: Resp,
    response_cookies: &mut ResponseCookies<'static>,
    middleware: &SessionMiddleware,
    incoming: &IncomingSession,
    cache: SessionCache,
) -> Result<Resp, FinalizeError> {
    if let Some(cookie) = middleware.finalize(incoming, cache).await?.into_cookie() {
        response_cookies.insert(cookie);
    }
    Ok(response)
}

/// Errors that can occur while finalizing a session.
pub mod errors {
    use http::StatusCode;

    use crate::store::errors::{DeleteError, WriteError};

    /// The error returned by [`SessionMiddleware::finalize`][super::SessionMiddleware::finalize].
    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    pub enum FinalizeError {
        #[error("Failed to persist the session")]
        Write(#[from] WriteError),
        #[error("Failed to delete the destroyed session")]
        Delete(#[from] DeleteError),
    }

    impl FinalizeError {
        /// The status code of the response that should be returned to the client.
        pub fn status_code(&self) -> StatusCode {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// The error returned by [`SessionMiddleware::respond`][super::SessionMiddleware::respond].
    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    pub enum RespondError {
        #[error(transparent)]
        Finalize(#[from] FinalizeError),
        #[error("The session cookie can't be represented as a header value: {invalid_header_value}")]
        InvalidSetCookie { invalid_header_value: String },
    }

    impl RespondError {
        /// The status code of the response that should be returned to the client.
        pub fn status_code(&self) -> StatusCode {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
