//! SMART-on-FHIR authorization-code flow.
//!
//! Responsibilities:
//! - build standalone-launch and EHR-launch authorization URLs
//! - exchange an authorization code for a token at the token endpoint
//! - track pending `state` nonces in a bounded, expiring store
//!
//! Tokens are relayed to the caller, never persisted here.

pub mod state;

pub use state::StateStore;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Scope requested for a standalone patient launch.
const STANDALONE_SCOPE: &str = "launch/patient patient/*.read";
/// Scope requested for an EHR launch.
const EHR_LAUNCH_SCOPE: &str = "launch patient/*.read";

/// Token-endpoint response, relayed to the frontend as-is.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scope: String,
    /// Patient id granted by the launch context, when the server supplies
    /// one.
    pub patient: String,
    pub id_token: String,
    pub refresh_token: String,
}

impl Default for TokenResponse {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            token_type: "Bearer".to_string(),
            expires_in: None,
            scope: String::new(),
            patient: String::new(),
            id_token: String::new(),
            refresh_token: String::new(),
        }
    }
}

/// SMART-on-FHIR authorization client.
#[derive(Clone, Debug)]
pub struct SmartAuth {
    client_id: String,
    redirect_uri: String,
    fhir_base_url: String,
    auth_endpoint: String,
    token_endpoint: String,
    http: reqwest::Client,
}

impl SmartAuth {
    /// Build the auth client from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fhir_timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client_id: config.client_id().to_string(),
            redirect_uri: config.redirect_uri(),
            fhir_base_url: config.fhir_base_url().to_string(),
            auth_endpoint: config.auth_url().to_string(),
            token_endpoint: config.token_url().to_string(),
            http,
        })
    }

    /// Authorization URL for a standalone launch. `aud` names the FHIR
    /// server the token is intended for.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configured authorization
    /// endpoint is not a valid URL.
    pub fn authorization_url(&self, state: &str) -> GatewayResult<String> {
        self.build_auth_url(&[
            ("response_type", "code"),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("scope", STANDALONE_SCOPE),
            ("state", state),
            ("aud", &self.fhir_base_url),
        ])
    }

    /// Authorization URL for an EHR launch: `aud` is the issuer handed to
    /// `/auth/launch`, and the opaque `launch` token is passed through.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configured authorization
    /// endpoint is not a valid URL.
    pub fn launch_url(&self, state: &str, iss: &str, launch: &str) -> GatewayResult<String> {
        self.build_auth_url(&[
            ("response_type", "code"),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("scope", EHR_LAUNCH_SCOPE),
            ("state", state),
            ("aud", iss),
            ("launch", launch),
        ])
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Auth`] when the exchange is rejected or the
    /// token endpoint is unreachable.
    pub async fn exchange_code(&self, code: &str) -> GatewayResult<TokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.client_id),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Auth(format!("token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(format!(
                "token endpoint returned HTTP {}: {body}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Auth(format!("malformed token response: {e}")))
    }

    fn build_auth_url(&self, params: &[(&str, &str)]) -> GatewayResult<String> {
        let url = Url::parse_with_params(&self.auth_endpoint, params)
            .map_err(|e| GatewayError::Config(format!("invalid authorization endpoint: {e}")))?;
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::StrategyKind;

    fn auth() -> SmartAuth {
        let config = GatewayConfig::new(
            "https://fhir.example.org/r4".to_string(),
            "http://localhost:8000".to_string(),
            "my-client".to_string(),
            "https://auth.example.org/authorize".to_string(),
            "https://auth.example.org/token".to_string(),
            String::new(),
            StrategyKind::Rule,
        )
        .expect("valid config");
        SmartAuth::new(&config).expect("client builds")
    }

    #[test]
    fn authorization_url_carries_the_smart_params() {
        let url = auth().authorization_url("nonce-1").expect("url builds");

        assert!(url.starts_with("https://auth.example.org/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=my-client"));
        assert!(url.contains("state=nonce-1"));
        assert!(url.contains("aud=https%3A%2F%2Ffhir.example.org%2Fr4"));
        assert!(url.contains("scope=launch%2Fpatient+patient%2F*.read"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fcallback"));
    }

    #[test]
    fn launch_url_targets_the_issuer() {
        let url = auth()
            .launch_url("nonce-2", "https://ehr.example.org/fhir", "launch-token")
            .expect("url builds");

        assert!(url.contains("aud=https%3A%2F%2Fehr.example.org%2Ffhir"));
        assert!(url.contains("launch=launch-token"));
        assert!(url.contains("scope=launch+patient%2F*.read"));
    }

    #[test]
    fn token_response_defaults_to_bearer() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc"}"#).expect("parse");
        assert_eq!(parsed.access_token, "abc");
        assert_eq!(parsed.token_type, "Bearer");
        assert!(parsed.refresh_token.is_empty());
    }
}
