//! Gateway runtime configuration.
//!
//! This module defines configuration that should be resolved once at process
//! startup and then passed into services. The intent is to avoid reading
//! process-wide environment variables during request handling, which can lead
//! to inconsistent behaviour in multi-threaded runtimes and test harnesses.

use crate::error::{GatewayError, GatewayResult};
use crate::triage::StrategyKind;
use std::time::Duration;

/// Default chat-completion endpoint when `LLM_API_URL` is not set.
pub const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
/// Default chat model when `LLM_MODEL` is not set.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";

const DEFAULT_FHIR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STATE_TTL_SECS: u64 = 300;
const DEFAULT_STATE_CAPACITY: usize = 1000;

/// Gateway configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    fhir_base_url: String,
    base_url: String,
    client_id: String,
    auth_url: String,
    token_url: String,
    llm_api_key: String,
    llm_api_url: String,
    llm_model: String,
    frontend_url: Option<String>,
    triage_strategy: StrategyKind,
    debug: bool,
    fhir_timeout: Duration,
    llm_timeout: Duration,
    state_ttl: Duration,
    state_capacity: usize,
}

impl GatewayConfig {
    /// Create a new `GatewayConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if any of the required endpoint or
    /// client settings is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fhir_base_url: String,
        base_url: String,
        client_id: String,
        auth_url: String,
        token_url: String,
        llm_api_key: String,
        triage_strategy: StrategyKind,
    ) -> GatewayResult<Self> {
        for (name, value) in [
            ("FHIR_SERVER_URL", &fhir_base_url),
            ("BASE_URL", &base_url),
            ("CLIENT_ID", &client_id),
            ("AUTH_SERVER_URL", &auth_url),
            ("TOKEN_SERVER_URL", &token_url),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::Config(format!("{name} cannot be empty")));
            }
        }

        if llm_api_key.trim().is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; LLM scoring will be rejected upstream");
        }

        Ok(Self {
            fhir_base_url,
            base_url,
            client_id,
            auth_url,
            token_url,
            llm_api_key,
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            frontend_url: None,
            triage_strategy,
            debug: false,
            fhir_timeout: Duration::from_secs(DEFAULT_FHIR_TIMEOUT_SECS),
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
            state_capacity: DEFAULT_STATE_CAPACITY,
        })
    }

    /// Resolve the configuration from environment variables, once, at
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a required variable is missing or
    /// empty, or if an optional variable carries an unparseable value.
    pub fn from_env() -> GatewayResult<Self> {
        let triage_strategy = match optional_env("TRIAGE_STRATEGY") {
            Some(name) => name.parse()?,
            None => StrategyKind::Llm,
        };

        let mut config = Self::new(
            required_env("FHIR_SERVER_URL")?,
            required_env("BASE_URL")?,
            required_env("CLIENT_ID")?,
            required_env("AUTH_SERVER_URL")?,
            required_env("TOKEN_SERVER_URL")?,
            optional_env("OPENAI_API_KEY").unwrap_or_default(),
            triage_strategy,
        )?;

        if let Some(url) = optional_env("LLM_API_URL") {
            config.llm_api_url = url;
        }
        if let Some(model) = optional_env("LLM_MODEL") {
            config.llm_model = model;
        }
        config.frontend_url = optional_env("FRONTEND_URL");
        config.debug = optional_env("DEBUG")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        config.fhir_timeout =
            Duration::from_secs(duration_env("FHIR_TIMEOUT_SECS", DEFAULT_FHIR_TIMEOUT_SECS)?);
        config.llm_timeout =
            Duration::from_secs(duration_env("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?);
        config.state_ttl =
            Duration::from_secs(duration_env("AUTH_STATE_TTL_SECS", DEFAULT_STATE_TTL_SECS)?);
        if let Some(capacity) = optional_env("AUTH_STATE_CAPACITY") {
            config.state_capacity = capacity.parse().map_err(|_| {
                GatewayError::Config("AUTH_STATE_CAPACITY must be a positive integer".into())
            })?;
        }

        Ok(config)
    }

    pub fn fhir_base_url(&self) -> &str {
        &self.fhir_base_url
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn llm_api_key(&self) -> &str {
        &self.llm_api_key
    }

    pub fn llm_api_url(&self) -> &str {
        &self.llm_api_url
    }

    pub fn llm_model(&self) -> &str {
        &self.llm_model
    }

    pub fn frontend_url(&self) -> Option<&str> {
        self.frontend_url.as_deref()
    }

    pub fn triage_strategy(&self) -> StrategyKind {
        self.triage_strategy
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn fhir_timeout(&self) -> Duration {
        self.fhir_timeout
    }

    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    pub fn state_ttl(&self) -> Duration {
        self.state_ttl
    }

    pub fn state_capacity(&self) -> usize {
        self.state_capacity
    }

    /// The OAuth redirect URI derived from the public base URL.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.base_url.trim_end_matches('/'))
    }
}

fn required_env(name: &str) -> GatewayResult<String> {
    optional_env(name).ok_or_else(|| GatewayError::Config(format!("{name} must be set")))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn duration_env(name: &str, default_secs: u64) -> GatewayResult<u64> {
    match optional_env(name) {
        Some(value) => value
            .parse()
            .map_err(|_| GatewayError::Config(format!("{name} must be a number of seconds"))),
        None => Ok(default_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GatewayConfig {
        GatewayConfig::new(
            "https://fhir.example.org/r4".to_string(),
            "http://localhost:8000/".to_string(),
            "client-123".to_string(),
            "https://auth.example.org/authorize".to_string(),
            "https://auth.example.org/token".to_string(),
            "sk-test".to_string(),
            StrategyKind::Llm,
        )
        .expect("valid config")
    }

    #[test]
    fn rejects_empty_required_fields() {
        let err = GatewayConfig::new(
            String::new(),
            "http://localhost:8000".to_string(),
            "client".to_string(),
            "https://auth".to_string(),
            "https://token".to_string(),
            String::new(),
            StrategyKind::Rule,
        )
        .expect_err("empty FHIR url should fail");

        match err {
            GatewayError::Config(msg) => assert!(msg.contains("FHIR_SERVER_URL")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn redirect_uri_strips_trailing_slash() {
        assert_eq!(
            sample().redirect_uri(),
            "http://localhost:8000/auth/callback"
        );
    }

    #[test]
    fn defaults_are_applied() {
        let config = sample();
        assert_eq!(config.llm_api_url(), DEFAULT_LLM_API_URL);
        assert_eq!(config.llm_model(), DEFAULT_LLM_MODEL);
        assert_eq!(config.fhir_timeout(), Duration::from_secs(30));
        assert_eq!(config.state_capacity(), 1000);
        assert!(!config.debug());
    }
}
