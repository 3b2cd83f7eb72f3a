//! HTTP surfaces of the core.
//!
//! Two listeners serve overlapping route sets: the management surface
//! carries the full registry API, the public surface a read-only subset
//! plus the interactive API docs.

pub mod error;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState, BoundApi};
