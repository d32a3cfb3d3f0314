use crate::configuration::ApplicationProfile;
use anyhow::Context;
use cookie_session::{SessionConfig, SessionStore};
use cookie_session_memory_store::InMemorySessionStore;
use cookie_session_sqlx::SqliteSessionStore;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use tokio::net::TcpListener;

#[derive(serde::Deserialize, Debug, Clone)]
/// The top-level configuration object, determining the schema
/// we expect to see in the configuration files stored under `configuration`.
///
/// # Loading
///
/// Check out [`Config::load`]'s documentation for more details on how configuration
/// values are populated.
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub cleanup: CleanupConfig,
}

impl Config {
    /// Retrieve the application configuration by merging multiple configuration sources.
    ///
    /// # Application profiles
    ///
    /// Your primary mechanism to specify the desired application profile is the `APP_PROFILE`
    /// environment variable.
    /// You can pass a `default_profile` value that will be used if the environment variable
    /// is not set.
    ///
    /// # Hierarchy
    ///
    /// The configuration sources are:
    ///
    /// 1. `base.yml` - The default configuration values, common to all profiles.
    /// 2. `<profile>.yml` - Configuration values specific to the desired profile.
    /// 3. Environment variables - Configuration values specific to the current environment.
    ///
    /// The configuration sources are listed in priority order, i.e.
    /// the last source in the list will override any previous source.
    ///
    /// # Environment variables
    ///
    /// All config-related environment variables must be prefixed with `APP_`.
    /// After the prefix, concatenate the names of the fields that must be traversed
    /// to reach the value you want to override, separated by `__`.
    ///
    /// E.g. `APP_SESSION__STATE__TTL` for the session time-to-live.
    pub fn load(default_profile: Option<ApplicationProfile>) -> Result<Config, anyhow::Error> {
        let application_profile = ApplicationProfile::load(default_profile)
            .context("Failed to load the desired application profile")?;

        let configuration_dir = {
            let manifest_dir = env!(
                "CARGO_MANIFEST_DIR",
                "`CARGO_MANIFEST_DIR` was not set. Are you using a custom build system?"
            );
            std::path::Path::new(manifest_dir).join("configuration")
        };

        let base_filepath = configuration_dir.join("base.yml");

        let profile_filename = format!("{}.yml", application_profile.as_str());
        let profile_filepath = configuration_dir.join(profile_filename);

        let figment = Figment::new()
            .merge(Yaml::file(base_filepath))
            .merge(Yaml::file(profile_filepath))
            .merge(Env::prefixed("APP_").split("__"));

        let configuration: Config = figment
            .extract()
            .context("Failed to load hierarchical configuration")?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Reject values that deserialize fine but can't be acted upon.
    fn validate(&self) -> Result<(), anyhow::Error> {
        self.cleanup.validate()?;
        jiff::Timestamp::now()
            .checked_add(self.session.state.ttl)
            .context("`session.state.ttl` is too large")?;
        Ok(())
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
/// Configuration for the HTTP server.
pub struct ServerConfig {
    /// The port that the server must listen on.
    ///
    /// Set the `APP_SERVER__PORT` environment variable to override its value.
    pub port: u16,
    /// The network interface that the server must be bound to.
    ///
    /// E.g. `0.0.0.0` for listening to incoming requests from
    /// all sources.
    pub ip: std::net::IpAddr,
    /// How long in-flight connections are given to complete once
    /// a shutdown signal has been received.
    #[serde(with = "humantime_serde")]
    pub graceful_shutdown_timeout: std::time::Duration,
}

impl ServerConfig {
    /// Bind a TCP listener according to the specified parameters.
    pub async fn listener(&self) -> Result<TcpListener, std::io::Error> {
        let addr = SocketAddr::new(self.ip, self.port);
        TcpListener::bind(addr).await
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
#[serde(tag = "backend", rename_all = "snake_case")]
/// Where session records are kept.
pub enum StoreConfig {
    /// In the memory of the server process.
    ///
    /// Records are lost when the server restarts.
    Memory,
    /// In a SQLite database.
    Sqlite {
        /// E.g. `sqlite://sessions.db?mode=rwc`.
        database_url: String,
    },
}

impl StoreConfig {
    /// Connect to the configured backend, running migrations if needed.
    pub async fn build(&self) -> Result<SessionStore, anyhow::Error> {
        match self {
            StoreConfig::Memory => Ok(SessionStore::new(InMemorySessionStore::new())),
            StoreConfig::Sqlite { database_url } => {
                let pool = sqlx::SqlitePool::connect(database_url)
                    .await
                    .context("Failed to connect to the SQLite session database")?;
                let backend = SqliteSessionStore::new(pool);
                backend
                    .migrate()
                    .await
                    .context("Failed to create the sessions table")?;
                Ok(backend.into())
            }
        }
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
/// Configure the background task that purges expired session records.
pub struct CleanupConfig {
    /// How long to wait between two purges.
    #[serde(with = "humantime_serde")]
    pub interval: std::time::Duration,
    /// The maximum number of records deleted by a single purge.
    ///
    /// If omitted, all expired records are deleted in one go.
    #[serde(default)]
    pub batch_size: Option<NonZeroUsize>,
}

impl CleanupConfig {
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.interval.is_zero() {
            anyhow::bail!("`cleanup.interval` must be greater than zero");
        }
        Ok(())
    }
}
