//! Shared doubles for the agent integration tests.

pub mod recording;

pub use recording::{enabled_config, RecordingObserver, ScriptedTransport};
