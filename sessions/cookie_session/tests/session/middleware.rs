use std::time::Duration;

use biscotti::{
    Key, ProcessorConfig,
    config::{CryptoAlgorithm, CryptoRule},
};
use cookie_session::{SessionCache, SessionConfig, SessionMiddleware, errors::RespondError};
use http::{
    HeaderValue, Request, Response, StatusCode,
    header::{COOKIE, SET_COOKIE},
};
use insta::assert_snapshot;

use crate::fixtures::{FailOn, FailingBackend, SessionFixture, spy_middleware};

/// A handler that counts how many times the current session has been seen.
async fn count_visits(
    _request: Request<()>,
    mut cache: SessionCache,
) -> (Response<String>, SessionCache) {
    let session = cache.get();
    let visits = session
        .get("visits")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    session.insert("visits", visits.to_string());
    (Response::new(visits.to_string()), cache)
}

/// A handler that never touches the session.
async fn ignore_session(
    _request: Request<()>,
    cache: SessionCache,
) -> (Response<String>, SessionCache) {
    (Response::new("Hello".into()), cache)
}

/// A handler that destroys the current session.
async fn log_out(
    _request: Request<()>,
    mut cache: SessionCache,
) -> (Response<String>, SessionCache) {
    cache.clear();
    (Response::new("Bye".into()), cache)
}

fn request(cookie: Option<&str>) -> Request<()> {
    let mut builder = Request::builder().uri("/");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(()).unwrap()
}

/// The `name=value` pair of a `Set-Cookie` header, i.e. what the client sends back.
fn cookie_pair(set_cookie: &HeaderValue) -> String {
    set_cookie
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned()
}

#[tokio::test]
async fn respond_sets_the_session_cookie_and_reads_it_back() {
    let (middleware, _) = spy_middleware();

    let response = middleware
        .respond(request(None), count_visits)
        .await
        .unwrap();
    assert_eq!(response.body(), "1");
    let set_cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
    assert_eq!(set_cookies.len(), 1);
    let set_cookie = set_cookies[0].to_str().unwrap();
    assert!(set_cookie.starts_with("id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=86400"));

    let pair = cookie_pair(set_cookies[0]);
    let response = middleware
        .respond(request(Some(&pair)), count_visits)
        .await
        .unwrap();
    assert_eq!(response.body(), "2");
    let set_cookie = response.headers().get(SET_COOKIE).unwrap();
    assert_eq!(cookie_pair(set_cookie), pair);
}

#[tokio::test]
async fn respond_leaves_the_response_alone_if_sessions_are_not_used() {
    let (middleware, call_tracker) = spy_middleware();

    let response = middleware
        .respond(request(Some("theme=dark")), ignore_session)
        .await
        .unwrap();
    assert_eq!(response.body(), "Hello");
    assert!(response.headers().get(SET_COOKIE).is_none());

    call_tracker.assert_store_was_untouched().await;
}

#[tokio::test]
async fn respond_clears_the_cookie_when_the_session_is_destroyed() {
    let (middleware, call_tracker) = spy_middleware();
    let id = SessionFixture::default().setup(middleware.store()).await;
    call_tracker.reset().await;

    let response = middleware
        .respond(request(Some(&format!("id={id}"))), log_out)
        .await
        .unwrap();
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("id=;"));
    assert!(set_cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));

    assert_eq!(
        call_tracker.operation_log().await,
        vec![format!("read {id}"), format!("delete {id}")]
    );
}

#[tokio::test]
async fn respond_finds_the_session_cookie_among_others() {
    let (middleware, call_tracker) = spy_middleware();
    let id = SessionFixture::default().setup(middleware.store()).await;
    call_tracker.reset().await;

    middleware
        .respond(
            request(Some(&format!("theme=dark; id={id}; lang=en"))),
            ignore_session,
        )
        .await
        .unwrap();
    assert_eq!(
        call_tracker.operation_log().await,
        vec![format!("read {id}"), format!("write {id}")]
    );
}

#[tokio::test]
async fn cookie_headers_that_are_not_valid_utf8_are_skipped() {
    let (middleware, call_tracker) = spy_middleware();
    let mut request = request(None);
    request
        .headers_mut()
        .insert(COOKIE, HeaderValue::from_bytes(b"id=\xfa\xfb").unwrap());

    let response = middleware.respond(request, ignore_session).await.unwrap();
    assert!(response.headers().get(SET_COOKIE).is_none());
    call_tracker.assert_store_was_untouched().await;
}

#[tokio::test]
async fn respond_fails_if_the_session_cannot_be_persisted() {
    let store = cookie_session::SessionStore::new(FailingBackend::new(FailOn {
        write: true,
        ..Default::default()
    }));
    let middleware = SessionMiddleware::new(store, SessionConfig::default());

    let err = middleware
        .respond(request(None), count_visits)
        .await
        .unwrap_err();
    assert!(matches!(err, RespondError::Finalize(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_snapshot!(err, @"Failed to persist the session");
}

#[tokio::test]
async fn a_cancelled_handler_leaves_the_store_untouched() {
    let (middleware, call_tracker) = spy_middleware();
    let id = SessionFixture::default().setup(middleware.store()).await;
    call_tracker.reset().await;

    let never_completes = |_request: Request<()>, mut cache: SessionCache| async move {
        cache.clear();
        std::future::pending::<(Response<String>, SessionCache)>().await
    };
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        middleware.respond(request(Some(&format!("id={id}"))), never_completes),
    )
    .await;
    assert!(outcome.is_err());

    // The session was loaded, but neither written back nor deleted.
    assert_eq!(call_tracker.operation_log().await, vec![format!("read {id}")]);
    assert!(middleware.store().read(&id).await.is_ok());
}

#[tokio::test]
async fn signed_session_cookies_round_trip() {
    let config = SessionConfig::default();
    let processor = {
        let mut cookie_config = ProcessorConfig::default();
        cookie_config.crypto_rules.push(CryptoRule {
            cookie_names: vec![config.cookie.name.clone()],
            algorithm: CryptoAlgorithm::Signing,
            key: Key::generate(),
            fallbacks: vec![],
        });
        cookie_config.into()
    };
    let (middleware, call_tracker) = spy_middleware();
    let middleware = middleware.with_cookie_processor(processor);

    let response = middleware
        .respond(request(None), count_visits)
        .await
        .unwrap();
    let pair = cookie_pair(response.headers().get(SET_COOKIE).unwrap());
    let oplog = call_tracker.operation_log().await;
    let minted_id = oplog[0].rsplit(' ').next().unwrap().to_owned();
    // The signature is carried alongside the identifier.
    assert_ne!(pair, format!("id={minted_id}"));

    let response = middleware
        .respond(request(Some(&pair)), count_visits)
        .await
        .unwrap();
    assert_eq!(response.body(), "2");

    // A tampered cookie fails verification: a fresh session is created.
    call_tracker.reset().await;
    let response = middleware
        .respond(request(Some(&format!("id={minted_id}"))), count_visits)
        .await
        .unwrap();
    assert_eq!(response.body(), "1");
}
