use anyhow::Context;
use cookie_session::SessionMiddleware;
use session_counter::cleanup::spawn_cleanup_task;
use session_counter::configuration::Config;
use session_counter::server::run;
use session_counter::telemetry::{get_subscriber, init_telemetry};
use tracing_log_error::log_error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("info", std::io::stdout);
    init_telemetry(subscriber)?;

    // We isolate all the server setup and launch logic in a separate function
    // in order to have a single choke point where we make sure to log fatal errors
    // that will cause the application to exit.
    if let Err(e) = _main().await {
        let e: &dyn std::error::Error = e.as_ref();
        log_error!(e, "The application is exiting due to an error");
    }

    Ok(())
}

async fn _main() -> anyhow::Result<()> {
    let config = Config::load(None)?;
    let store = config.store.build().await?;
    let _cleanup = spawn_cleanup_task(store.clone(), config.cleanup.clone());
    let middleware = SessionMiddleware::new(store, config.session.clone());

    let tcp_listener = config
        .server
        .listener()
        .await
        .context("Failed to bind the server TCP listener")?;
    let address = tcp_listener
        .local_addr()
        .context("The server TCP listener doesn't have a local socket address")?;

    tracing::info!("Starting to listen for incoming requests at {}", address);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error!(e, "Failed to listen for the shutdown signal");
        }
    };
    run(
        tcp_listener,
        middleware,
        config.server.graceful_shutdown_timeout,
        shutdown,
    )
    .await;
    Ok(())
}
