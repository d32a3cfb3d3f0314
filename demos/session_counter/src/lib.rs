//! A visit counter that keeps its state in a server-side session.
pub mod cleanup;
pub mod configuration;
pub mod routes;
pub mod server;
pub mod telemetry;
