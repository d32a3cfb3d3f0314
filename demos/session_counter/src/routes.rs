//! Request handlers.
//!
//! Every handler receives the session cache of the current request and hands it
//! back together with the response, for [`SessionMiddleware`] to finalize.
//!
//! [`SessionMiddleware`]: cookie_session::SessionMiddleware
use bytes::Bytes;
use cookie_session::SessionCache;
use http::{HeaderValue, Method, Request, Response, StatusCode, header::CONTENT_TYPE};
use http_body_util::Full;

/// The response body used by all handlers.
pub type Body = Full<Bytes>;

const VISITS_KEY: &str = "visits";

/// Dispatch the request to the handler for its method and path.
pub async fn route<B>(request: Request<B>, cache: SessionCache) -> (Response<Body>, SessionCache) {
    match (request.method(), request.uri().path()) {
        (&Method::GET, "/api/ping") => (ping(), cache),
        (&Method::POST, "/api/visits") => visit(cache),
        (&Method::GET, "/api/session") => show_session(cache),
        (&Method::POST, "/api/logout") => log_out(cache),
        _ => (text(StatusCode::NOT_FOUND, "Not found".into()), cache),
    }
}

/// A health check that never touches the session.
fn ping() -> Response<Body> {
    text(StatusCode::OK, "pong".into())
}

/// Increment the visit counter stored in the session.
///
/// The first visit creates the session.
fn visit(mut cache: SessionCache) -> (Response<Body>, SessionCache) {
    let session = cache.get();
    let visits = session
        .get(VISITS_KEY)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    session.insert(VISITS_KEY, visits.to_string());
    tracing::debug!(visits, "Recorded a visit");
    (text(StatusCode::OK, visits.to_string()), cache)
}

/// Return the session state as a JSON object.
///
/// A new (empty) session is created if there wasn't one.
fn show_session(mut cache: SessionCache) -> (Response<Body>, SessionCache) {
    let session = cache.get();
    let state: serde_json::Map<String, serde_json::Value> = session
        .iter()
        .map(|(key, value)| (key.to_owned(), value.into()))
        .collect();
    let body = serde_json::json!({
        "is_new": session.is_new(),
        "created_at": session.created_at().to_string(),
        "state": state,
    });
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    (response, cache)
}

/// Destroy the current session.
fn log_out(mut cache: SessionCache) -> (Response<Body>, SessionCache) {
    cache.clear();
    (text(StatusCode::OK, "Logged out".into()), cache)
}

/// A plain-text response.
pub fn text(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
