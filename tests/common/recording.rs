//! Scripted transport and recording observer that only use the public API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use code_stats_pulse::config::DeliveryTarget;
use code_stats_pulse::delivery::PulsePayload;
use code_stats_pulse::{
    AgentConfig, ConfigHandle, DeliveryError, PulseTransport, StatusObserver, StatusReport,
};

/// A transport that records each request and answers from a script.
/// Unscripted requests are accepted.
#[derive(Default)]
pub struct ScriptedTransport {
    requests: Mutex<Vec<(DeliveryTarget, PulsePayload)>>,
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn then(&self, outcome: Result<(), DeliveryError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn requests(&self) -> Vec<(DeliveryTarget, PulsePayload)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<PulsePayload> {
        self.requests()
            .into_iter()
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl PulseTransport for ScriptedTransport {
    async fn send(
        &self,
        target: &DeliveryTarget,
        payload: &PulsePayload,
    ) -> Result<(), DeliveryError> {
        self.requests
            .lock()
            .unwrap()
            .push((target.clone(), payload.clone()));
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
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
        self.reports.lock().unwrap().clone()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.reports().iter().map(StatusReport::render).collect()
    }
}

impl StatusObserver for RecordingObserver {
    fn report(&self, status: StatusReport) {
        self.reports.lock().unwrap().push(status);
    }
}

pub fn enabled_config(api_url: &str) -> ConfigHandle {
    ConfigHandle::new(AgentConfig {
        api_key: Some("integration-token".to_string()),
        api_url: Some(api_url.to_string()),
        ..AgentConfig::default()
    })
    .unwrap()
}
