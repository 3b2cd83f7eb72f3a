//! Startup and shutdown orchestration.

pub mod sequencer;

pub use sequencer::{BootstrapSequencer, BootstrapStage, CORE_SERVICE_NAME};
