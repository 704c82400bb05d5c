use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::activity::Language;
use crate::pulse::aggregate::Pulse;
use crate::pulse::error::PulseError;

/// The open pulse plus every sealed pulse still waiting for delivery.
#[derive(Debug, Default)]
pub struct PulseQueue {
    current: Option<Pulse>,
    sealed: VecDeque<Pulse>,
}

impl PulseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds experience to the open pulse, opening one at `now` if needed.
    pub fn record(
        &mut self,
        language: &Language,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), PulseError> {
        if amount == 0 {
            return Err(PulseError::ZeroAmount);
        }
        self.current
            .get_or_insert_with(|| Pulse::new(now))
            .add(language, amount)
    }

    pub fn current(&self) -> Option<&Pulse> {
        self.current.as_ref()
    }

    /// Seals the open pulse and appends it to the backlog. Returns whether a
    /// pulse was open.
    pub fn seal_current(&mut self, now: DateTime<Utc>) -> Result<bool, PulseError> {
        let Some(mut pulse) = self.current.take() else {
            return Ok(false);
        };
        pulse.seal(now)?;
        self.sealed.push_back(pulse);
        Ok(true)
    }

    pub fn pop_oldest(&mut self) -> Option<Pulse> {
        self.sealed.pop_front()
    }

    /// Puts a pulse whose delivery failed back at the head of the backlog.
    pub fn requeue_front(&mut self, pulse: Pulse) -> Result<(), PulseError> {
        if !pulse.is_sealed() {
            return Err(PulseError::NotSealed);
        }
        self.sealed.push_front(pulse);
        Ok(())
    }

    pub fn sealed(&self) -> impl Iterator<Item = &Pulse> {
        self.sealed.iter()
    }

    pub fn backlog_len(&self) -> usize {
        self.sealed.len()
    }

    pub fn has_backlog(&self) -> bool {
        !self.sealed.is_empty()
    }

    /// Experience not yet confirmed by the collector: every queued pulse plus
    /// the open one.
    pub fn total_outstanding(&self) -> u64 {
        self.sealed
            .iter()
            .chain(self.current.iter())
            .fold(0u64, |total, pulse| {
                total.saturating_add(pulse.total_experience())
            })
    }
}
