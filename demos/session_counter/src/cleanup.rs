//! Periodic removal of expired session records.
use cookie_session::SessionStore;
use tokio::task::JoinHandle;
use tracing_log_error::log_error;

use crate::configuration::CleanupConfig;

/// Spawn a background task that purges expired records from `store`
/// every `config.interval`.
///
/// Failures are logged: the next tick tries again.
pub fn spawn_cleanup_task(store: SessionStore, config: CleanupConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            purge_expired(&store, &config).await;
        }
    })
}

#[tracing::instrument(name = "Purge expired sessions", skip_all)]
async fn purge_expired(store: &SessionStore, config: &CleanupConfig) {
    match store.delete_expired(config.batch_size).await {
        Ok(0) => {}
        Ok(deleted) => tracing::info!(deleted, "Deleted expired session records"),
        Err(e) => log_error!(e, "Failed to delete expired session records"),
    }
}
