//! Storage service integration.
//!
//! The storage microservice runs as an independent OS process. This module
//! covers the three pieces the core needs for it: spawning the process,
//! binding an HTTP client to its management endpoint once it has registered
//! itself, and the named retry policy governing how long the core waits for
//! that registration to appear.

pub mod client;
pub mod launcher;
pub mod retry;

pub use client::StorageClient;
pub use launcher::{ProcessSpawner, StorageSpawner};
pub use retry::RetryPolicy;
