//! SMART-on-FHIR authorization endpoints.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::{Json, Redirect};
use serde::Deserialize;
use triage_core::{GatewayError, TokenResponse};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LaunchParams {
    pub iss: Option<String>,
    pub launch: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/login",
    responses(
        (status = 307, description = "Redirect to the authorization server")
    )
)]
/// Initiate a standalone SMART-on-FHIR authorization
///
/// Issues a one-time `state` nonce and redirects the browser to the
/// authorization server.
#[axum::debug_handler]
pub async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let nonce = state.states.issue();
    let url = state.auth.authorization_url(&nonce)?;

    Ok(Redirect::temporary(&url))
}

#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackParams),
    responses(
        (status = 200, description = "Token response", body = TokenResponse),
        (status = 400, description = "Authorization error or missing code"),
        (status = 401, description = "Unknown or expired state")
    )
)]
/// Handle the OAuth2 callback from the authorization server
///
/// The `state` parameter must match a pending nonce; it is consumed before
/// the authorization code is exchanged, so a replayed or forged callback
/// never reaches the token endpoint.
#[axum::debug_handler]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<TokenResponse>, ApiError> {
    if let Some(error) = params.error {
        return Err(GatewayError::InvalidInput(format!("authorization error: {error}")).into());
    }

    let Some(code) = params.code else {
        return Err(GatewayError::InvalidInput("authorization code missing".to_string()).into());
    };

    let valid_state = params
        .state
        .map(|nonce| state.states.consume(&nonce))
        .unwrap_or(false);
    if !valid_state {
        return Err(
            GatewayError::Auth("invalid or expired state parameter".to_string()).into(),
        );
    }

    let token = state.auth.exchange_code(&code).await?;
    Ok(Json(token))
}

#[utoipa::path(
    get,
    path = "/auth/launch",
    params(LaunchParams),
    responses(
        (status = 307, description = "Redirect to the authorization server"),
        (status = 400, description = "Missing iss or launch parameters")
    )
)]
/// Handle an EHR launch
///
/// The EHR supplies the issuer (`iss`) and an opaque `launch` token; both
/// are folded into the authorization redirect.
#[axum::debug_handler]
pub async fn launch(
    State(state): State<AppState>,
    Query(params): Query<LaunchParams>,
) -> Result<Redirect, ApiError> {
    let (Some(iss), Some(launch)) = (params.iss, params.launch) else {
        return Err(
            GatewayError::InvalidInput("missing iss or launch parameters".to_string()).into(),
        );
    };

    let nonce = state.states.issue();
    let url = state.auth.launch_url(&nonce, &iss, &launch)?;

    Ok(Redirect::temporary(&url))
}
