//! Agent configuration.
//!
//! Values come from an optional JSON file, then environment overrides. The
//! credential and endpoint can be swapped at runtime through a
//! [`ConfigHandle`]; the agent reads them again on every flush.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub const DEFAULT_DEBOUNCE_MS: u64 = 10_000;
pub const DEFAULT_REPEAT_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CLIENT_NAME: &str = "code-stats-pulse";

pub const ENV_API_KEY: &str = "CODE_STATS_API_KEY";
pub const ENV_API_URL: &str = "CODE_STATS_API_URL";
pub const ENV_DEBOUNCE_MS: &str = "CODE_STATS_DEBOUNCE_MS";
pub const ENV_REPEAT_INTERVAL_MS: &str = "CODE_STATS_REPEAT_INTERVAL_MS";
pub const ENV_FAILURE_POLICY: &str = "CODE_STATS_FAILURE_POLICY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// What happens to a pulse whose delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FailurePolicy {
    /// Put the pulse back at the head of the backlog and retry it on the
    /// next repeat tick.
    #[default]
    Requeue,
    /// Discard the pulse after one attempt.
    Drop,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requeue" | "retry" => Ok(Self::Requeue),
            "drop" | "discard" => Ok(Self::Drop),
            _ => Err(format!("unsupported failure policy: {value}")),
        }
    }
}

impl TryFrom<String> for FailurePolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_repeat_interval_ms")]
    pub repeat_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

/// Endpoint and credential for one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub endpoint: String,
    pub api_key: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            debounce_ms: default_debounce_ms(),
            repeat_interval_ms: default_repeat_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            failure_policy: FailurePolicy::default(),
            client_name: default_client_name(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            ConfigError::Io(format!("{}: {error}", path.display()))
        })?;
        let config: AgentConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are logged
    /// and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(api_url) = lookup(ENV_API_URL) {
            self.api_url = Some(api_url);
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(value) => self.debounce_ms = value,
                Err(e) => tracing::warn!("ignoring {ENV_DEBOUNCE_MS}={raw}: {e}"),
            }
        }
        if let Some(raw) = lookup(ENV_REPEAT_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(value) => self.repeat_interval_ms = value,
                Err(e) => tracing::warn!("ignoring {ENV_REPEAT_INTERVAL_MS}={raw}: {e}"),
            }
        }
        if let Some(raw) = lookup(ENV_FAILURE_POLICY) {
            match raw.parse::<FailurePolicy>() {
                Ok(policy) => self.failure_policy = policy,
                Err(e) => tracing::warn!("ignoring {ENV_FAILURE_POLICY}={raw}: {e}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "debounceMs must be greater than 0".to_string(),
            ));
        }
        if self.repeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "repeatIntervalMs must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "requestTimeoutMs must be greater than 0".to_string(),
            ));
        }
        if self.client_name.trim().is_empty() {
            return Err(ConfigError::Invalid("clientName cannot be empty".to_string()));
        }
        if let Some(url) = non_empty(self.api_url.as_deref()) {
            let parsed = reqwest::Url::parse(url)
                .map_err(|error| ConfigError::Invalid(format!("apiUrl {url}: {error}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "apiUrl must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }

    /// Returns `None` when either the credential or the endpoint is missing,
    /// which disables delivery entirely.
    pub fn delivery_target(&self) -> Option<DeliveryTarget> {
        let api_key = non_empty(self.api_key.as_deref())?;
        let endpoint = non_empty(self.api_url.as_deref())?;
        Some(DeliveryTarget {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.client_name.trim(), env!("CARGO_PKG_VERSION"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_repeat_interval_ms() -> u64 {
    DEFAULT_REPEAT_INTERVAL_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

/// Shared, live-reloadable view of the agent configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AgentConfig>>,
}

impl ConfigHandle {
    /// Validates `config` the same way [`ConfigHandle::replace`] does.
    pub fn new(config: AgentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
        })
    }

    pub async fn snapshot(&self) -> AgentConfig {
        self.inner.read().await.clone()
    }

    pub async fn set_api_key(&self, api_key: Option<String>) {
        let configured = non_empty(api_key.as_deref()).is_some();
        self.inner.write().await.api_key = api_key;
        tracing::info!(configured, "api key changed");
    }

    pub async fn set_api_url(&self, api_url: Option<String>) {
        tracing::info!(api_url = api_url.as_deref().unwrap_or(""), "api url changed");
        self.inner.write().await.api_url = api_url;
    }

    pub async fn replace(&self, config: AgentConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.inner.write().await = config;
        tracing::info!("agent config replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_collector_timings() {
        let config = AgentConfig::default();
        assert_eq!(config.debounce(), Duration::from_secs(10));
        assert_eq!(config.repeat_interval(), Duration::from_secs(10));
        assert_eq!(config.failure_policy, FailurePolicy::Requeue);
        assert!(config.user_agent().starts_with("code-stats-pulse/"));
        assert!(config.delivery_target().is_none());
    }

    #[test]
    fn delivery_target_requires_key_and_url() {
        let mut config = AgentConfig {
            api_key: Some("  ".to_string()),
            api_url: Some("https://codestats.net/api/my/pulses".to_string()),
            ..AgentConfig::default()
        };
        assert!(config.delivery_target().is_none());

        config.api_key = Some("secret".to_string());
        let target = config.delivery_target().expect("target should resolve");
        assert_eq!(target.api_key, "secret");
        assert_eq!(target.endpoint, "https://codestats.net/api/my/pulses");

        config.api_url = Some(String::new());
        assert!(config.delivery_target().is_none());
    }

    #[test]
    fn load_reads_camel_case_json_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"apiKey":"k","apiUrl":"http://localhost:5000/api/my/pulses","failurePolicy":"drop"}}"#
        )
        .expect("write config");

        let config = AgentConfig::load(file.path()).expect("config should load");
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.failure_policy, FailurePolicy::Drop);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        config.validate().expect("config should validate");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = AgentConfig::load(&dir.path().join("missing.json"))
            .expect_err("missing file should fail");
        assert!(matches!(error, ConfigError::Io(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "from-env"),
            (ENV_DEBOUNCE_MS, "250"),
            (ENV_REPEAT_INTERVAL_MS, "not-a-number"),
            (ENV_FAILURE_POLICY, "discard"),
        ]);
        let mut config = AgentConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.repeat_interval_ms, DEFAULT_REPEAT_INTERVAL_MS);
        assert_eq!(config.failure_policy, FailurePolicy::Drop);
        assert!(config.api_url.is_none());
    }

    #[test]
    fn unknown_failure_policy_override_is_ignored() {
        let mut config = AgentConfig::default();
        config.apply_overrides_from(|key| {
            (key == ENV_FAILURE_POLICY).then(|| "sometimes".to_string())
        });
        assert_eq!(config.failure_policy, FailurePolicy::Requeue);
    }

    #[test]
    fn validate_rejects_zero_durations_and_bad_urls() {
        let zero = AgentConfig {
            debounce_ms: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let relative = AgentConfig {
            api_url: Some("/api/my/pulses".to_string()),
            ..AgentConfig::default()
        };
        assert!(relative.validate().is_err());

        let ftp = AgentConfig {
            api_url: Some("ftp://codestats.net/pulses".to_string()),
            ..AgentConfig::default()
        };
        assert!(ftp.validate().is_err());
    }

    #[test]
    fn failure_policy_parses_aliases() {
        assert_eq!("retry".parse::<FailurePolicy>(), Ok(FailurePolicy::Requeue));
        assert_eq!("DROP".parse::<FailurePolicy>(), Ok(FailurePolicy::Drop));
        assert!("maybe".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn handle_refuses_zero_intervals() {
        let no_backoff = AgentConfig {
            api_key: Some("abc".to_string()),
            api_url: Some("http://localhost/api".to_string()),
            repeat_interval_ms: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(
            ConfigHandle::new(no_backoff),
            Err(ConfigError::Invalid(_))
        ));

        let no_quiet_period = AgentConfig {
            debounce_ms: 0,
            ..AgentConfig::default()
        };
        assert!(ConfigHandle::new(no_quiet_period).is_err());
    }

    #[test]
    fn failure_policy_aliases_work_in_config_files() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"failurePolicy":"Discard"}"#).expect("alias should parse");
        assert_eq!(config.failure_policy, FailurePolicy::Drop);
        assert!(serde_json::from_str::<AgentConfig>(r#"{"failurePolicy":"maybe"}"#).is_err());
        assert_eq!(
            serde_json::to_value(FailurePolicy::Requeue).expect("serialize"),
            serde_json::json!("requeue")
        );
    }

    #[tokio::test]
    async fn handle_changes_are_visible_in_next_snapshot() {
        let handle = ConfigHandle::new(AgentConfig::default()).expect("defaults are valid");
        handle.set_api_key(Some("abc".to_string())).await;
        handle
            .set_api_url(Some("http://localhost/api".to_string()))
            .await;
        assert!(handle.snapshot().await.delivery_target().is_some());

        handle.set_api_url(None).await;
        assert!(handle.snapshot().await.delivery_target().is_none());

        let invalid = AgentConfig {
            repeat_interval_ms: 0,
            ..AgentConfig::default()
        };
        assert!(handle.replace(invalid).await.is_err());
        assert_eq!(handle.snapshot().await.repeat_interval_ms, DEFAULT_REPEAT_INTERVAL_MS);
    }
}
