//! Test doubles for driving the agent without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::config::{AgentConfig, ConfigHandle, DeliveryTarget};
use crate::delivery::{DeliveryError, PulsePayload, PulseTransport, StatusObserver, StatusReport};

/// Records every payload and answers from a script (default: accepted).
///
/// When built with [`MockTransport::held`], each send waits for a permit so
/// tests can keep a delivery in flight.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<PulsePayload>>,
    responses: Mutex<VecDeque<Result<(), DeliveryError>>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn held() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        })
    }

    pub fn respond_with(&self, outcome: Result<(), DeliveryError>) {
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .push_back(outcome);
    }

    /// Lets `count` held deliveries complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn sent(&self) -> Vec<PulsePayload> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().expect("sent mutex poisoned").len()
    }
}

#[async_trait]
impl PulseTransport for MockTransport {
    async fn send(
        &self,
        _target: &DeliveryTarget,
        payload: &PulsePayload,
    ) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push(payload.clone());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| DeliveryError::Request(e.to_string()))?;
            permit.forget();
        }

        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    reports: Mutex<Vec<StatusReport>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().expect("reports mutex poisoned").clone()
    }

    pub fn last(&self) -> Option<StatusReport> {
        self.reports
            .lock()
            .expect("reports mutex poisoned")
            .last()
            .copied()
    }
}

impl StatusObserver for RecordingObserver {
    fn report(&self, status: StatusReport) {
        self.reports
            .lock()
            .expect("reports mutex poisoned")
            .push(status);
    }
}

/// Config with delivery enabled and the default 10s timings.
pub fn enabled_config() -> ConfigHandle {
    ConfigHandle::new(AgentConfig {
        api_key: Some("test-token".to_string()),
        api_url: Some("http://collector.test/api/my/pulses".to_string()),
        ..AgentConfig::default()
    })
    .expect("test config should be valid")
}
