use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Quiet period after the last admitted event ran out.
    Debounce,
    /// Backlog retry tick.
    Repeat,
}

/// Deadlines that turn into flush requests.
///
/// Activity pushes the debounce deadline back; the repeat deadline is
/// one-shot and is not moved once armed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushTimers {
    debounce_at: Option<Instant>,
    repeat_at: Option<Instant>,
}

impl FlushTimers {
    pub fn restart_debounce(&mut self, now: Instant, quiet_period: Duration) {
        self.debounce_at = Some(now + quiet_period);
    }

    /// Arms the repeat tick unless one is already pending. Returns whether a
    /// new deadline was set.
    pub fn arm_repeat(&mut self, now: Instant, interval: Duration) -> bool {
        if self.repeat_at.is_some() {
            return false;
        }
        self.repeat_at = Some(now + interval);
        true
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_at
    }

    pub fn repeat_deadline(&self) -> Option<Instant> {
        self.repeat_at
    }

    /// The earliest pending deadline. Debounce wins a tie.
    pub fn next_due(&self) -> Option<(Instant, TimerKind)> {
        match (self.debounce_at, self.repeat_at) {
            (Some(debounce), Some(repeat)) if repeat < debounce => {
                Some((repeat, TimerKind::Repeat))
            }
            (Some(debounce), _) => Some((debounce, TimerKind::Debounce)),
            (None, Some(repeat)) => Some((repeat, TimerKind::Repeat)),
            (None, None) => None,
        }
    }

    pub fn fire(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Debounce => self.debounce_at = None,
            TimerKind::Repeat => self.repeat_at = None,
        }
    }

    pub fn clear(&mut self) {
        self.debounce_at = None;
        self.repeat_at = None;
    }
}

/// Sleeps until `due`, or forever when nothing is scheduled.
pub async fn wait_for(due: Option<(Instant, TimerKind)>) -> TimerKind {
    match due {
        Some((deadline, kind)) => {
            tokio::time::sleep_until(deadline).await;
            kind
        }
        None => std::future::pending().await,
    }
}
