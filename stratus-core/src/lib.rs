//! Core coordination service for a Stratus deployment: in-memory service
//! registry, configuration interests, health monitoring, discovery
//! announcements, and bootstrap/shutdown orchestration.

pub mod announcer;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod configuration;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod registry;
pub mod scheduler;
pub mod storage;

pub use error::{Error, Result};
