#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! Storage backends for [`cookie_session`],
//! implemented using the [`sqlx`](https://crates.io/crates/sqlx) crate.
//!
//! There is a dedicated feature flag for each supported database backend:
//!
//! - `sqlite`: Support for SQLite.

#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite;

#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
#[doc(inline)]
pub use sqlite::SqliteSessionStore;
