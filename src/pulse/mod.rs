//! Experience aggregation.
//!
//! A [`Pulse`] accumulates experience per language while it is open. Flushing
//! seals it and moves it to the back of the [`PulseQueue`], where it waits
//! until it has been delivered.

mod aggregate;
mod error;
mod queue;

pub use aggregate::Pulse;
pub use error::PulseError;
pub use queue::PulseQueue;
