//! Single-flight delivery state machine.
//!
//! The deliverer owns the pulse queue. A flush request seals the open pulse,
//! takes the oldest sealed pulse and hands a [`DeliveryJob`] to the caller,
//! which performs the exchange and reports back through [`Deliverer::settle`].
//! Requests arriving while a job is outstanding collapse into one re-run.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::activity::Language;
use crate::config::{DeliveryTarget, FailurePolicy};
use crate::delivery::error::DeliveryError;
use crate::delivery::payload::PulsePayload;
use crate::delivery::status::StatusReport;
use crate::pulse::{Pulse, PulseError, PulseQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Idle,
    InFlight,
    /// In flight, and another flush must run once it settles.
    InFlightWithWaiting,
}

#[derive(Debug, Clone)]
pub struct DeliverySession {
    pub id: Uuid,
    pub pulse: Pulse,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub session_id: Uuid,
    pub target: DeliveryTarget,
    pub payload: PulsePayload,
}

#[derive(Debug)]
pub enum FlushDecision {
    /// Credential or endpoint missing. Nothing was touched.
    Gated,
    /// A delivery is outstanding; one re-run is scheduled for when it settles.
    Deferred,
    /// No sealed pulse to send.
    Empty,
    Send(DeliveryJob),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub report: StatusReport,
    /// A flush was requested while the session was outstanding.
    pub rerun: bool,
    pub requeued: bool,
}

#[derive(Debug)]
pub struct Deliverer {
    queue: PulseQueue,
    state: DeliveryState,
    session: Option<DeliverySession>,
    policy: FailurePolicy,
}

impl Deliverer {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            queue: PulseQueue::new(),
            state: DeliveryState::Idle,
            session: None,
            policy,
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn queue(&self) -> &PulseQueue {
        &self.queue
    }

    pub fn session(&self) -> Option<&DeliverySession> {
        self.session.as_ref()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
    }

    /// Adds experience to the open pulse and returns the new outstanding
    /// total.
    pub fn record(
        &mut self,
        language: &Language,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, PulseError> {
        self.queue.record(language, amount, now)?;
        Ok(self.queue.total_outstanding())
    }

    pub fn total_outstanding(&self) -> u64 {
        self.queue.total_outstanding()
    }

    pub fn has_backlog(&self) -> bool {
        self.queue.has_backlog()
    }

    pub fn request_flush(
        &mut self,
        target: Option<DeliveryTarget>,
        now: DateTime<Utc>,
    ) -> Result<FlushDecision, DeliveryError> {
        let Some(target) = target else {
            return Ok(FlushDecision::Gated);
        };

        match self.state {
            DeliveryState::InFlight => {
                self.state = DeliveryState::InFlightWithWaiting;
                return Ok(FlushDecision::Deferred);
            }
            DeliveryState::InFlightWithWaiting => return Ok(FlushDecision::Deferred),
            DeliveryState::Idle => {}
        }

        self.queue.seal_current(now)?;

        let Some(pulse) = self.queue.pop_oldest() else {
            return Ok(FlushDecision::Empty);
        };
        let payload = match PulsePayload::from_pulse(&pulse) {
            Ok(payload) => payload,
            Err(error) => {
                self.queue.requeue_front(pulse)?;
                return Err(error);
            }
        };

        let session_id = Uuid::new_v4();
        self.session = Some(DeliverySession {
            id: session_id,
            pulse,
            started_at: now,
        });
        self.state = DeliveryState::InFlight;

        Ok(FlushDecision::Send(DeliveryJob {
            session_id,
            target,
            payload,
        }))
    }

    /// Resolves the outstanding session. Returns `None` for an unknown or
    /// stale session id.
    pub fn settle(
        &mut self,
        session_id: Uuid,
        outcome: Result<(), DeliveryError>,
    ) -> Option<Settlement> {
        if self.session.as_ref().map(|session| session.id) != Some(session_id) {
            tracing::warn!(%session_id, "ignoring settlement for unknown delivery session");
            return None;
        }
        let session = self.session.take()?;
        let rerun = self.state == DeliveryState::InFlightWithWaiting;
        self.state = DeliveryState::Idle;

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    %session_id,
                    xp = session.pulse.total_experience(),
                    "pulse delivered"
                );
                Some(Settlement {
                    report: StatusReport::Outstanding(self.queue.total_outstanding()),
                    rerun,
                    requeued: false,
                })
            }
            Err(error) => {
                tracing::warn!(%session_id, "pulse delivery failed: {error}");
                let report = error.status_report();
                let requeued = match self.policy {
                    FailurePolicy::Requeue => match self.queue.requeue_front(session.pulse) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!("failed pulse could not be requeued: {e}");
                            false
                        }
                    },
                    FailurePolicy::Drop => {
                        tracing::warn!(
                            xp = session.pulse.total_experience(),
                            "dropping pulse after failed delivery"
                        );
                        false
                    }
                };
                Some(Settlement {
                    report,
                    rerun,
                    requeued,
                })
            }
        }
    }
}
