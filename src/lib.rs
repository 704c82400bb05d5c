//! Keystroke experience batching agent.
//!
//! Counts typing activity per language, bundles it into pulses and delivers
//! them to a Code::Stats style collector over HTTP.
//!
//! # Architecture
//!
//! Events flow from the host editor -> `AgentHandle` -> agent loop -> collector:
//! - `activity`: decides which key events count and carries the language label
//! - `pulse`: per-language experience counters and the backlog of sealed pulses
//! - `delivery`: single-flight delivery state machine, wire payload, HTTP transport
//! - `scheduler`: debounce and repeat timers plus the task that owns all state
//! - `config`: file/env configuration and the live-reloadable handle

pub mod activity;
pub mod config;
pub mod delivery;
pub mod pulse;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use activity::{KeyEvent, KeyEventKind, Language};
pub use config::{AgentConfig, ConfigError, ConfigHandle, FailurePolicy};
pub use delivery::{
    DeliveryError, HttpTransport, LogStatusObserver, PulseTransport, StatusObserver, StatusReport,
};
pub use pulse::{Pulse, PulseError, PulseQueue};
pub use scheduler::{AgentError, AgentHandle, AgentSnapshot, PulseAgent};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

const DEFAULT_LOG_FILTER: &str = "code_stats_pulse=debug,info";

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
