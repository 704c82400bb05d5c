use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::activity::{self, KeyEvent, Language};
use crate::config::ConfigHandle;
use crate::delivery::{
    Deliverer, DeliveryError, DeliveryJob, DeliveryState, FlushDecision, PulseTransport,
    StatusObserver, StatusReport,
};
use crate::scheduler::timers::{wait_for, FlushTimers};

const COMMAND_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("pulse agent has stopped")]
    Stopped,
}

/// Point-in-time view of the agent, mostly for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub state: DeliveryState,
    pub outstanding_xp: u64,
    pub backlog: usize,
    pub open_pulse: bool,
    pub debounce_pending: bool,
    pub repeat_pending: bool,
}

enum AgentCommand {
    Observe {
        event: KeyEvent,
        language: Option<Language>,
    },
    Flush,
    Snapshot(oneshot::Sender<AgentSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

struct SettledDelivery {
    session_id: Uuid,
    outcome: Result<(), DeliveryError>,
}

/// Cloneable front door to a running agent.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<AgentCommand>,
}

impl AgentHandle {
    /// Feeds one key event. Events the filter rejects, or that carry no
    /// language, are ignored.
    pub async fn observe(
        &self,
        event: KeyEvent,
        language: Option<Language>,
    ) -> Result<(), AgentError> {
        self.send(AgentCommand::Observe { event, language }).await
    }

    /// Requests a flush right away, skipping the quiet period.
    pub async fn flush(&self) -> Result<(), AgentError> {
        self.send(AgentCommand::Flush).await
    }

    pub async fn snapshot(&self) -> Result<AgentSnapshot, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.send(AgentCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| AgentError::Stopped)
    }

    /// Stops the agent once any outstanding delivery has settled. Pulses
    /// still queued are discarded.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        let (ack, rx) = oneshot::channel();
        self.send(AgentCommand::Shutdown(ack)).await?;
        rx.await.map_err(|_| AgentError::Stopped)
    }

    async fn send(&self, command: AgentCommand) -> Result<(), AgentError> {
        self.tx.send(command).await.map_err(|_| AgentError::Stopped)
    }
}

pub struct PulseAgent;

impl PulseAgent {
    /// Spawn the agent loop.
    ///
    /// All pulse, queue and delivery state lives inside the spawned task.
    /// Network exchanges run in their own tasks and report back on a
    /// settlement channel, so activity keeps being recorded while a pulse
    /// is in flight.
    pub fn spawn(
        config: ConfigHandle,
        transport: Arc<dyn PulseTransport>,
        observer: Arc<dyn StatusObserver>,
    ) -> (AgentHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (settle_tx, settle_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let policy = config.snapshot().await.failure_policy;
            let agent = AgentLoop {
                deliverer: Deliverer::new(policy),
                timers: FlushTimers::default(),
                config,
                transport,
                observer,
                settle_tx,
            };
            agent.run(rx, settle_rx).await;
        });

        (AgentHandle { tx }, task)
    }
}

struct AgentLoop {
    deliverer: Deliverer,
    timers: FlushTimers,
    config: ConfigHandle,
    transport: Arc<dyn PulseTransport>,
    observer: Arc<dyn StatusObserver>,
    settle_tx: mpsc::UnboundedSender<SettledDelivery>,
}

impl AgentLoop {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<AgentCommand>,
        mut settled: mpsc::UnboundedReceiver<SettledDelivery>,
    ) {
        tracing::info!("pulse agent started");
        self.observer.report(StatusReport::Idle);
        let mut shutdown_ack = None;

        loop {
            let due = self.timers.next_due();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(AgentCommand::Observe { event, language }) => {
                        self.on_activity(event, language).await;
                    }
                    Some(AgentCommand::Flush) => self.flush().await,
                    Some(AgentCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(AgentCommand::Shutdown(ack)) => {
                        shutdown_ack = Some(ack);
                        break;
                    }
                    None => break,
                },
                Some(done) = settled.recv() => self.on_settled(done).await,
                kind = wait_for(due) => {
                    self.timers.fire(kind);
                    tracing::debug!(?kind, "flush timer fired");
                    self.flush().await;
                }
            }
        }

        if let Some(session) = self.deliverer.session() {
            tracing::debug!(
                session_id = %session.id,
                started_at = %session.started_at,
                xp = session.pulse.total_experience(),
                "waiting for outstanding delivery before shutdown"
            );
            if let Some(done) = settled.recv().await {
                if let Some(settlement) = self.deliverer.settle(done.session_id, done.outcome) {
                    self.observer.report(settlement.report);
                }
            }
        }

        let discarded = self.deliverer.total_outstanding();
        if discarded > 0 {
            tracing::warn!(
                discarded_xp = discarded,
                backlog = self.deliverer.queue().backlog_len(),
                "pulse agent stopped with undelivered experience"
            );
        }
        self.timers.clear();
        self.observer.report(StatusReport::Idle);
        tracing::info!("pulse agent stopped");

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    async fn on_activity(&mut self, event: KeyEvent, language: Option<Language>) {
        if !activity::admits(&event) {
            return;
        }
        let Some(language) = language else {
            tracing::debug!("admitted key event without a language, ignoring");
            return;
        };

        let total = match self.deliverer.record(&language, 1, Utc::now()) {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!("failed to record experience: {e}");
                return;
            }
        };

        let quiet_period = self.config.snapshot().await.debounce();
        self.timers.restart_debounce(Instant::now(), quiet_period);
        self.observer.report(StatusReport::Outstanding(total));
    }

    async fn flush(&mut self) {
        let config = self.config.snapshot().await;
        // Keep the failure policy in step with live config.
        self.deliverer.set_failure_policy(config.failure_policy);

        let decision = match self
            .deliverer
            .request_flush(config.delivery_target(), Utc::now())
        {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("flush failed: {e}");
                return;
            }
        };

        match decision {
            FlushDecision::Gated => {
                tracing::debug!("delivery disabled: api key or api url not configured");
            }
            FlushDecision::Deferred => {
                tracing::debug!("delivery in flight, flush deferred");
            }
            FlushDecision::Empty => tracing::debug!("nothing to deliver"),
            FlushDecision::Send(job) => {
                self.dispatch(job);
                if self.deliverer.has_backlog() {
                    self.timers
                        .arm_repeat(Instant::now(), config.repeat_interval());
                }
            }
        }
    }

    fn dispatch(&self, job: DeliveryJob) {
        tracing::debug!(
            session_id = %job.session_id,
            coded_at = %job.payload.coded_at,
            xp = job.payload.total_xp(),
            "delivering pulse"
        );
        let transport = self.transport.clone();
        let settle_tx = self.settle_tx.clone();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(transport.send(&job.target, &job.payload))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(DeliveryError::Request("pulse transport panicked".to_string()))
                });
            let _ = settle_tx.send(SettledDelivery {
                session_id: job.session_id,
                outcome,
            });
        });
    }

    async fn on_settled(&mut self, done: SettledDelivery) {
        let Some(settlement) = self.deliverer.settle(done.session_id, done.outcome) else {
            return;
        };
        self.observer.report(settlement.report);

        if settlement.rerun {
            self.flush().await;
        }
        if self.deliverer.has_backlog() {
            let interval = self.config.snapshot().await.repeat_interval();
            self.timers.arm_repeat(Instant::now(), interval);
        }
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            state: self.deliverer.state(),
            outstanding_xp: self.deliverer.total_outstanding(),
            backlog: self.deliverer.queue().backlog_len(),
            open_pulse: self.deliverer.queue().current().is_some(),
            debounce_pending: self.timers.debounce_deadline().is_some(),
            repeat_pending: self.timers.repeat_deadline().is_some(),
        }
    }
}
