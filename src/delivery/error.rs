use crate::delivery::status::StatusReport;
use crate::pulse::PulseError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("collector rejected pulse with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("pulse error: {0}")]
    Pulse(#[from] PulseError),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout(value.to_string());
        }
        Self::Request(value.to_string())
    }
}

impl DeliveryError {
    /// The status value shown to the user for this failure.
    pub fn status_report(&self) -> StatusReport {
        match self {
            Self::Rejected { status, .. } => StatusReport::Rejected(*status),
            _ => StatusReport::Failed,
        }
    }
}
