use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::error::DeliveryError;
use crate::pulse::Pulse;

/// Request body accepted by the collector's pulse endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulsePayload {
    pub coded_at: String,
    pub xps: Vec<XpEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEntry {
    pub language: String,
    pub xp: u64,
}

impl PulsePayload {
    pub fn from_pulse(pulse: &Pulse) -> Result<Self, DeliveryError> {
        let sealed_at = pulse.sealed_at().ok_or_else(|| {
            DeliveryError::Payload("pulse must be sealed before delivery".to_string())
        })?;

        Ok(Self {
            coded_at: format_coded_at(sealed_at),
            xps: pulse
                .experience()
                .map(|(language, xp)| XpEntry {
                    language: language.to_string(),
                    xp,
                })
                .collect(),
        })
    }

    pub fn total_xp(&self) -> u64 {
        self.xps
            .iter()
            .fold(0u64, |total, entry| total.saturating_add(entry.xp))
    }

    pub fn to_json(&self) -> Result<String, DeliveryError> {
        serde_json::to_string(self).map_err(|error| DeliveryError::Payload(error.to_string()))
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2023-01-01T00:00:00.000Z`.
pub fn format_coded_at(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
