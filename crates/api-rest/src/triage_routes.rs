//! Direct triage scoring endpoint.

use crate::error::ApiError;
use crate::patient_routes::StrategyParams;
use crate::AppState;
use axum::extract::{OriginalUri, Query, State};
use axum::response::Json;
use triage_core::{TriageRequest, TriageScorer};
use triage_types::TriageResult;

#[utoipa::path(
    post,
    path = "/api/v1/triage/predict",
    request_body = TriageRequest,
    params(StrategyParams),
    responses(
        (status = 200, description = "Triage score", body = TriageResult),
        (status = 400, description = "Unknown scoring strategy"),
        (status = 503, description = "LLM endpoint unreachable")
    )
)]
/// Score a caller-supplied clinical picture
///
/// The scoring backend defaults to the configured strategy and can be
/// overridden per request with `?strategy=rule|llm`; an unknown name is
/// rejected before any scoring happens.
#[axum::debug_handler]
pub async fn predict(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<StrategyParams>,
    Json(request): Json<TriageRequest>,
) -> Result<Json<TriageResult>, ApiError> {
    let scorer = match params.strategy.as_deref() {
        Some(name) => TriageScorer::from_name(name, &state.config),
        None => TriageScorer::new(state.config.triage_strategy(), &state.config),
    }
    .map_err(|e| ApiError::from(e).at(uri.path()))?;

    let result = scorer
        .score(&request)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(result))
}
