//! The HTTP server loop.
use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use cookie_session::SessionMiddleware;
use http::{Request, Response};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::Instrument;
use tracing_log_error::log_error;

use crate::routes::{Body, route, text};

/// Accept connections on `listener` until `shutdown` completes.
///
/// Once the shutdown signal has been received, no new connections are accepted.
/// In-flight connections are asked to close once their current request is done
/// and are given up to `graceful_shutdown_timeout` to do so.
pub async fn run<S>(
    listener: TcpListener,
    middleware: SessionMiddleware,
    graceful_shutdown_timeout: Duration,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    let mut connections = JoinSet::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::pin!(shutdown);
    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    log_error!(e, level: tracing::Level::WARN, "Failed to accept a connection");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };
        let middleware = middleware.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        connections.spawn(async move {
            let service = service_fn(move |request| {
                let middleware = middleware.clone();
                async move { Ok::<_, Infallible>(handle(&middleware, request).await) }
            });
            let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);
            let outcome = tokio::select! {
                outcome = connection.as_mut() => outcome,
                _ = async { let _ = shutdown_rx.wait_for(|&stop| stop).await; } => {
                    connection.as_mut().graceful_shutdown();
                    connection.await
                }
            };
            if let Err(e) = outcome {
                log_error!(
                    e,
                    level: tracing::Level::DEBUG,
                    "Failed to serve the connection from {peer_addr}"
                );
            }
        });
    }

    tracing::info!(
        in_flight = connections.len(),
        "Shutting down, waiting for in-flight connections to complete"
    );
    // Idle keep-alive connections close right away, busy ones after their current request.
    let _ = shutdown_tx.send(true);
    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(graceful_shutdown_timeout, drain)
        .await
        .is_err()
    {
        tracing::warn!("Graceful shutdown timed out, dropping the remaining connections");
        connections.abort_all();
    }
}

/// Run the session middleware around the router, inside a request span.
pub async fn handle(middleware: &SessionMiddleware, request: Request<Incoming>) -> Response<Body> {
    let span = tracing::info_span!(
        "HTTP request",
        http.request.method = %request.method(),
        url.path = %request.uri().path(),
        http.response.status_code = tracing::field::Empty,
    );
    async move {
        let response = match middleware.respond(request, route).await {
            Ok(response) => response,
            Err(e) => {
                log_error!(e, "Failed to finalize the session");
                text(e.status_code(), "Internal server error".into())
            }
        };
        tracing::Span::current().record("http.response.status_code", response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}
