//! Status values pushed to whatever displays the agent's state.

use std::fmt;

/// Fixed prefix of the rendered status text.
pub const STATUS_PREFIX: &str = "C::S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReport {
    /// Nothing to show beyond the prefix.
    Idle,
    /// Experience recorded but not yet confirmed by the collector.
    Outstanding(u64),
    /// The collector answered with a status other than 201.
    Rejected(u16),
    /// The request never got an answer (timeout, connection error).
    Failed,
}

impl StatusReport {
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Failed)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "{STATUS_PREFIX}"),
            Self::Outstanding(total) => write!(f, "{STATUS_PREFIX} {total}"),
            Self::Rejected(status) => write!(f, "{STATUS_PREFIX} ERR {status}!"),
            Self::Failed => write!(f, "{STATUS_PREFIX} X_X"),
        }
    }
}

pub trait StatusObserver: Send + Sync {
    fn report(&self, status: StatusReport);
}

impl<F> StatusObserver for F
where
    F: Fn(StatusReport) + Send + Sync,
{
    fn report(&self, status: StatusReport) {
        self(status)
    }
}

/// Writes every status change to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusObserver;

impl StatusObserver for LogStatusObserver {
    fn report(&self, status: StatusReport) {
        if status.is_failure() {
            tracing::warn!(status = %status, "delivery status");
        } else {
            tracing::info!(status = %status, "delivery status");
        }
    }
}
