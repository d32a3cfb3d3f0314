//! How the server is configured.
mod profile;
mod schema;

pub use profile::ApplicationProfile;
pub use schema::{CleanupConfig, Config, ServerConfig, StoreConfig};
