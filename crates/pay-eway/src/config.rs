//! # eWAY Configuration
//!
//! Configuration management for the eWAY Rapid integration.
//! All secrets are loaded from environment variables.

use pay_core::gateway::{DEFAULT_COUNTRY, DEFAULT_GATEWAY_TIMEOUT};
use pay_core::PaymentError;
use std::env;
use std::time::Duration;

/// Rapid API sandbox base URL
pub const SANDBOX_ENDPOINT: &str = "https://api.sandbox.ewaypayments.com";

/// Rapid API production base URL
pub const PRODUCTION_ENDPOINT: &str = "https://api.ewaypayments.com";

/// eWAY API configuration
#[derive(Clone)]
pub struct EwayConfig {
    /// Rapid API key (basic auth user)
    pub api_key: String,

    /// Rapid API password (basic auth password)
    pub password: String,

    /// API base URL
    pub endpoint: String,

    /// Public client-side encryption key, handed to the checkout page
    pub client_key: String,

    /// Time budget for each gateway call
    pub timeout: Duration,

    /// Country sent with new token customers
    pub country: String,
}

impl std::fmt::Debug for EwayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EwayConfig")
            .field("api_key", &self.api_key)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("client_key", &self.client_key)
            .field("timeout", &self.timeout)
            .field("country", &self.country)
            .finish()
    }
}

impl EwayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `EWAY_API_KEY`
    /// - `EWAY_PASSWORD`
    ///
    /// Optional: `EWAY_ENDPOINT` (`sandbox`, `production` or a URL; default
    /// sandbox), `EWAY_CLIENT_KEY`, `EWAY_TIMEOUT_SECS`, `EWAY_COUNTRY`.
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PaymentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| PaymentError::Configuration(format!("{key} not set")))
        };

        let api_key = required("EWAY_API_KEY")?;
        let password = required("EWAY_PASSWORD")?;

        let endpoint = match lookup("EWAY_ENDPOINT") {
            Some(value) => resolve_endpoint(&value)?,
            None => SANDBOX_ENDPOINT.to_string(),
        };

        let timeout = match lookup("EWAY_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    PaymentError::Configuration(format!(
                        "EWAY_TIMEOUT_SECS must be a positive number of seconds, got {value:?}"
                    ))
                })?,
            None => DEFAULT_GATEWAY_TIMEOUT,
        };

        Ok(Self {
            api_key,
            password,
            endpoint,
            client_key: lookup("EWAY_CLIENT_KEY").unwrap_or_default(),
            timeout,
            country: lookup("EWAY_COUNTRY").unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        })
    }

    /// Create config with explicit values (sandbox endpoint)
    pub fn new(api_key: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            password: password.into(),
            endpoint: SANDBOX_ENDPOINT.to_string(),
            client_key: String::new(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Check if pointed at the sandbox
    pub fn is_sandbox(&self) -> bool {
        self.endpoint == SANDBOX_ENDPOINT
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client_key(mut self, key: impl Into<String>) -> Self {
        self.client_key = key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `sandbox`, `production`/`live`, or an explicit base URL
fn resolve_endpoint(value: &str) -> Result<String, PaymentError> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "" | "sandbox" => Ok(SANDBOX_ENDPOINT.to_string()),
        "production" | "live" => Ok(PRODUCTION_ENDPOINT.to_string()),
        url if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(value.trim_end_matches('/').to_string())
        }
        _ => Err(PaymentError::Configuration(format!(
            "EWAY_ENDPOINT must be sandbox, production or a URL, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            EwayConfig::from_lookup(lookup(&[("EWAY_API_KEY", "key"), ("EWAY_PASSWORD", "pw")]))
                .unwrap();

        assert!(config.is_sandbox());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.country, "au");
        assert_eq!(config.client_key, "");
    }

    #[test]
    fn test_missing_key() {
        let result = EwayConfig::from_lookup(lookup(&[("EWAY_PASSWORD", "pw")]));
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }

    #[test]
    fn test_endpoint_aliases() {
        assert_eq!(resolve_endpoint("production").unwrap(), PRODUCTION_ENDPOINT);
        assert_eq!(resolve_endpoint("Sandbox").unwrap(), SANDBOX_ENDPOINT);
        assert_eq!(
            resolve_endpoint("http://localhost:9000/").unwrap(),
            "http://localhost:9000"
        );
        assert!(resolve_endpoint("ftp://nope").is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let result = EwayConfig::from_lookup(lookup(&[
            ("EWAY_API_KEY", "key"),
            ("EWAY_PASSWORD", "pw"),
            ("EWAY_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = EwayConfig::new("key", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
