use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::config::{AgentConfig, DeliveryTarget};
use crate::delivery::error::DeliveryError;
use crate::delivery::payload::PulsePayload;

pub const API_TOKEN_HEADER: &str = "X-API-Token";

/// The only status the collector uses to acknowledge a pulse.
pub const ACCEPTED_STATUS: u16 = 201;

/// One network exchange carrying one pulse.
#[async_trait]
pub trait PulseTransport: Send + Sync {
    async fn send(
        &self,
        target: &DeliveryTarget,
        payload: &PulsePayload,
    ) -> Result<(), DeliveryError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    user_agent: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(config: &AgentConfig) -> Result<Self, DeliveryError> {
        if config.request_timeout_ms == 0 {
            return Err(DeliveryError::Request(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
                .map_err(|error| DeliveryError::Request(error.to_string()))?,
            user_agent: config.user_agent(),
            timeout_ms: config.request_timeout_ms,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn map_connectivity_error(&self, endpoint: &str, error: reqwest::Error) -> DeliveryError {
        if error.is_timeout() {
            return DeliveryError::Timeout(format!(
                "pulse delivery to {endpoint} timed out after {} ms",
                self.timeout_ms
            ));
        }
        if error.is_connect() {
            return DeliveryError::Request(format!(
                "could not reach collector at {endpoint}: {error}"
            ));
        }
        DeliveryError::from(error)
    }
}

#[async_trait]
impl PulseTransport for HttpTransport {
    async fn send(
        &self,
        target: &DeliveryTarget,
        payload: &PulsePayload,
    ) -> Result<(), DeliveryError> {
        let body = payload.to_json()?;

        // Content-Length is derived from the body bytes by reqwest.
        let response = self
            .client
            .post(&target.endpoint)
            .header(API_TOKEN_HEADER, target.api_key.as_str())
            .header(USER_AGENT, self.user_agent.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|error| self.map_connectivity_error(&target.endpoint, error))?;

        let status = response.status().as_u16();
        if status != ACCEPTED_STATUS {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }
        Ok(())
    }
}
