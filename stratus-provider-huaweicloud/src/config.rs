//! Provider configuration
//!
//! Settings come from an attribute map (as written in the provider block)
//! and fall back to the `HW_*` environment variables.

use std::collections::HashMap;
use std::time::Duration;

use stratus_core::resource::Value;
use stratus_core::waiter::{
    DEFAULT_LIFECYCLE_TIMEOUT, JOB_DELAY, JOB_POLL_INTERVAL, LIFECYCLE_POLL_INTERVAL,
    TOGGLE_DELAY, TOGGLE_POLL_INTERVAL,
};
use thiserror::Error;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting '{attribute}' (or environment variable {env})")]
    Missing {
        attribute: &'static str,
        env: &'static str,
    },

    #[error("Invalid value for '{attribute}': {message}")]
    Invalid {
        attribute: &'static str,
        message: String,
    },
}

/// Timing of the waits performed by SWR resources
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub job_delay: Duration,
    pub job_interval: Duration,
    pub toggle_delay: Duration,
    pub toggle_interval: Duration,
    pub lifecycle_interval: Duration,
    /// Deadline for instance creation (40 minutes)
    pub create_timeout: Duration,
    /// Deadline for instance updates (20 minutes)
    pub update_timeout: Duration,
    /// Deadline for internal endpoint creation and deletion
    pub endpoint_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            job_delay: JOB_DELAY,
            job_interval: JOB_POLL_INTERVAL,
            toggle_delay: TOGGLE_DELAY,
            toggle_interval: TOGGLE_POLL_INTERVAL,
            lifecycle_interval: LIFECYCLE_POLL_INTERVAL,
            create_timeout: Duration::from_secs(40 * 60),
            update_timeout: Duration::from_secs(20 * 60),
            endpoint_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
        }
    }
}

/// Huawei Cloud provider configuration
#[derive(Clone)]
pub struct ProviderConfig {
    pub region: String,
    pub project_id: String,
    /// IAM token sent as `X-Auth-Token`
    pub auth_token: String,
    pub enterprise_project_id: Option<String>,
    /// SWR endpoint, always ending with '/'
    pub swr_endpoint: String,
    pub request_timeout: Duration,
    pub poll: PollSettings,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("auth_token", &"<redacted>")
            .field("enterprise_project_id", &self.enterprise_project_id)
            .field("swr_endpoint", &self.swr_endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Build a configuration from provider attributes, falling back to the environment
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        Self::resolve(attributes, |key| std::env::var(key).ok())
    }

    /// Build a configuration from the environment only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_attributes(&HashMap::new())
    }

    fn resolve(
        attributes: &HashMap<String, Value>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |attribute: &'static str, var: &'static str| -> Option<String> {
            get_string(attributes, attribute)
                .map(str::to_string)
                .or_else(|| env(var))
                .filter(|s| !s.is_empty())
        };
        let required = |attribute: &'static str, var: &'static str| {
            lookup(attribute, var).ok_or(ConfigError::Missing {
                attribute,
                env: var,
            })
        };

        let region = required("region", "HW_REGION_NAME")?;
        let project_id = required("project_id", "HW_PROJECT_ID")?;
        let auth_token = required("auth_token", "HW_AUTH_TOKEN")?;
        let enterprise_project_id = lookup("enterprise_project_id", "HW_ENTERPRISE_PROJECT_ID");

        let swr_endpoint = match lookup("endpoint", "HW_SWR_ENDPOINT") {
            Some(endpoint) => normalize_endpoint(&endpoint)?,
            None => default_swr_endpoint(&region),
        };

        let request_timeout = match attributes.get("request_timeout") {
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Some(Value::Int(secs)) if *secs > 0 => Duration::from_secs(*secs as u64),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    attribute: "request_timeout",
                    message: format!("expected a positive number of seconds, got {:?}", other),
                });
            }
        };

        Ok(Self {
            region,
            project_id,
            auth_token,
            enterprise_project_id,
            swr_endpoint,
            request_timeout,
            poll: PollSettings::default(),
        })
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_swr_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        self.swr_endpoint = normalize_endpoint(endpoint)?;
        Ok(self)
    }
}

fn get_string<'a>(attributes: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    match attributes.get(key) {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Public SWR endpoint of a region
pub fn default_swr_endpoint(region: &str) -> String {
    format!("https://swr-api.{}.myhuaweicloud.com/", region)
}

fn normalize_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        return Err(ConfigError::Invalid {
            attribute: "endpoint",
            message: format!("'{}' is not an http(s) URL", endpoint),
        });
    }
    if endpoint.ends_with('/') {
        Ok(endpoint.to_string())
    } else {
        Ok(format!("{}/", endpoint))
    }
}
