//! Logging setup.
use anyhow::Context;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Build a subscriber that writes formatted log lines to `sink`.
///
/// `default_filter` is used unless the `RUST_LOG` environment variable is set.
pub fn get_subscriber<Sink>(default_filter: &str, sink: Sink) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(sink)
        .finish()
}

/// Register `subscriber` as the global default.
///
/// It must be called at most once.
pub fn init_telemetry(subscriber: impl Subscriber + Send + Sync) -> Result<(), anyhow::Error> {
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set a `tracing` global subscriber")
}
