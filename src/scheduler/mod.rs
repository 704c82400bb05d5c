//! Flush scheduling and the agent runtime.
//!
//! Typing bursts are debounced: a flush is requested only once the quiet
//! period has passed since the last admitted event. While sealed pulses are
//! waiting, a repeat tick keeps requesting flushes until the backlog drains.

mod agent;
mod timers;

pub use agent::{AgentError, AgentHandle, AgentSnapshot, PulseAgent};
pub use timers::{FlushTimers, TimerKind};
