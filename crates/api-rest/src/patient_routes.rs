//! Patient data endpoints: raw pass-through, normalized reads, summary and
//! medical-history orchestration.
//!
//! Every handler demands a `Authorization: Bearer <token>` header and
//! rejects the request before any upstream call when it is missing.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Json;
use fhir::{
    allergy, condition, demographics, encounter, medication, note, observation, AllergyList,
    ConditionList, Demographics, EncounterList, MedicationList, NoteList, ObservationList,
};
use serde::Deserialize;
use serde_json::Value;
use triage_core::{
    GatewayError, ListQuery, MedicalHistoryReport, MedicalHistoryRequest, ObservationQuery,
    PatientSummary,
};

/// Date-window and paging filters accepted by the list endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct WindowParams {
    /// Inclusive lower bound, YYYY-MM-DD.
    pub date_from: Option<String>,
    /// Inclusive upper bound, YYYY-MM-DD.
    pub date_to: Option<String>,
    /// Maximum number of resources to request.
    pub count: Option<u32>,
}

impl From<WindowParams> for ListQuery {
    fn from(params: WindowParams) -> Self {
        ListQuery {
            date_from: params.date_from,
            date_to: params.date_to,
            count: params.count,
        }
    }
}

/// Filters accepted by the generic observations endpoint.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ObservationParams {
    /// FHIR observation category (e.g. `vital-signs`, `laboratory`).
    pub category: Option<String>,
    /// FHIR observation code filter.
    pub code: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ConditionParams {
    /// FHIR `clinical-status` filter (e.g. `active`).
    pub clinical_status: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct StrategyParams {
    /// Scoring strategy override: `rule` or `llm`.
    pub strategy: Option<String>,
}

/// Extract the bearer token, rejecting the request before any upstream call.
fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(GatewayError::Auth("valid authorization token required".to_string()).into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}",
    params(("id" = String, Path, description = "FHIR patient id")),
    responses(
        (status = 200, description = "Raw FHIR Patient resource"),
        (status = 401, description = "Missing bearer token"),
        (status = 503, description = "FHIR server unreachable")
    )
)]
/// Fetch the raw FHIR Patient resource
#[axum::debug_handler]
pub async fn patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)?;
    let resource = state
        .fhir
        .patient(&id, &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(resource))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/demographics",
    params(("id" = String, Path, description = "FHIR patient id")),
    responses(
        (status = 200, description = "Normalized demographics", body = Demographics),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch normalized patient demographics
#[axum::debug_handler]
pub async fn patient_demographics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Demographics>, ApiError> {
    let token = bearer_token(&headers)?;
    let resource = state
        .fhir
        .patient(&id, &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(demographics::normalize(&resource)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/vitals",
    params(("id" = String, Path, description = "FHIR patient id"), WindowParams),
    responses(
        (status = 200, description = "Vital-sign observations", body = ObservationList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch vital-sign observations
#[axum::debug_handler]
pub async fn patient_vitals(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<WindowParams>,
    headers: HeaderMap,
) -> Result<Json<ObservationList>, ApiError> {
    observations_in_category(&state, &id, "vital-signs", params, uri.path(), &headers).await
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/labs",
    params(("id" = String, Path, description = "FHIR patient id"), WindowParams),
    responses(
        (status = 200, description = "Laboratory observations", body = ObservationList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch laboratory observations
#[axum::debug_handler]
pub async fn patient_labs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<WindowParams>,
    headers: HeaderMap,
) -> Result<Json<ObservationList>, ApiError> {
    observations_in_category(&state, &id, "laboratory", params, uri.path(), &headers).await
}

async fn observations_in_category(
    state: &AppState,
    patient_id: &str,
    category: &str,
    params: WindowParams,
    path: &str,
    headers: &HeaderMap,
) -> Result<Json<ObservationList>, ApiError> {
    let token = bearer_token(headers)?;
    let query = ObservationQuery {
        category: Some(category.to_string()),
        code: None,
        list: params.into(),
    };
    let bundle = state
        .fhir
        .observations(patient_id, &query, &token)
        .await
        .map_err(|e| ApiError::from(e).at(path))?;

    Ok(Json(observation::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/observations",
    params(("id" = String, Path, description = "FHIR patient id"), ObservationParams),
    responses(
        (status = 200, description = "Observations matching the filters", body = ObservationList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch observations with caller-supplied category/code filters
#[axum::debug_handler]
pub async fn patient_observations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ObservationParams>,
    headers: HeaderMap,
) -> Result<Json<ObservationList>, ApiError> {
    let token = bearer_token(&headers)?;
    let query = ObservationQuery {
        category: params.category,
        code: params.code,
        list: ListQuery {
            date_from: params.date_from,
            date_to: params.date_to,
            count: params.count,
        },
    };
    let bundle = state
        .fhir
        .observations(&id, &query, &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(observation::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/conditions",
    params(("id" = String, Path, description = "FHIR patient id"), ConditionParams),
    responses(
        (status = 200, description = "Normalized conditions", body = ConditionList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch patient conditions/problems
#[axum::debug_handler]
pub async fn patient_conditions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ConditionParams>,
    headers: HeaderMap,
) -> Result<Json<ConditionList>, ApiError> {
    let token = bearer_token(&headers)?;
    let bundle = state
        .fhir
        .conditions(&id, params.clinical_status.as_deref(), &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(condition::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/medications",
    params(("id" = String, Path, description = "FHIR patient id")),
    responses(
        (status = 200, description = "Normalized medication requests", body = MedicationList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch patient medications
#[axum::debug_handler]
pub async fn patient_medications(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<MedicationList>, ApiError> {
    let token = bearer_token(&headers)?;
    let bundle = state
        .fhir
        .medication_requests(&id, &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(medication::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/allergies",
    params(("id" = String, Path, description = "FHIR patient id")),
    responses(
        (status = 200, description = "Normalized allergies", body = AllergyList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch patient allergies
#[axum::debug_handler]
pub async fn patient_allergies(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<AllergyList>, ApiError> {
    let token = bearer_token(&headers)?;
    let bundle = state
        .fhir
        .allergies(&id, &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(allergy::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/clinical-notes",
    params(("id" = String, Path, description = "FHIR patient id"), WindowParams),
    responses(
        (status = 200, description = "Normalized clinical notes", body = NoteList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch patient clinical notes
#[axum::debug_handler]
pub async fn patient_clinical_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<WindowParams>,
    headers: HeaderMap,
) -> Result<Json<NoteList>, ApiError> {
    let token = bearer_token(&headers)?;
    let bundle = state
        .fhir
        .clinical_notes(&id, &params.into(), &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(note::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/encounters",
    params(("id" = String, Path, description = "FHIR patient id"), WindowParams),
    responses(
        (status = 200, description = "Normalized encounters", body = EncounterList),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Fetch patient encounters
#[axum::debug_handler]
pub async fn patient_encounters(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<WindowParams>,
    headers: HeaderMap,
) -> Result<Json<EncounterList>, ApiError> {
    let token = bearer_token(&headers)?;
    let bundle = state
        .fhir
        .encounters(&id, &params.into(), &token)
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(encounter::from_bundle(&bundle)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}/summary",
    params(("id" = String, Path, description = "FHIR patient id"), StrategyParams),
    responses(
        (status = 200, description = "Composed clinical summary with triage score", body = PatientSummary),
        (status = 401, description = "Missing bearer token"),
        (status = 503, description = "FHIR server or LLM endpoint unreachable")
    )
)]
/// Compose the full clinical summary and triage it
///
/// Fans out the seven independent FHIR reads concurrently and fails the
/// whole operation if any of them fails; no partial summaries.
#[axum::debug_handler]
pub async fn patient_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<StrategyParams>,
    headers: HeaderMap,
) -> Result<Json<PatientSummary>, ApiError> {
    let token = bearer_token(&headers)?;
    let summary = state
        .summary
        .summarize(&id, &token, params.strategy.as_deref())
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/v1/patient/medical-history",
    request_body = MedicalHistoryRequest,
    params(StrategyParams),
    responses(
        (status = 200, description = "History lookup with triage score", body = MedicalHistoryReport),
        (status = 401, description = "Missing bearer token")
    )
)]
/// Look up a patient's history by name and date of birth
///
/// When no matching patient exists, an intentionally minimal context built
/// from the supplied symptoms and vitals is scored instead.
#[axum::debug_handler]
pub async fn medical_history(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<StrategyParams>,
    headers: HeaderMap,
    Json(request): Json<MedicalHistoryRequest>,
) -> Result<Json<MedicalHistoryReport>, ApiError> {
    let token = bearer_token(&headers)?;
    let report = state
        .summary
        .medical_history(&request, &token, params.strategy.as_deref())
        .await
        .map_err(|e| ApiError::from(e).at(uri.path()))?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_token(&headers).expect("token"), "abc123");
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = bearer_token(&HeaderMap::new()).expect_err("no header");
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwdw=="),
        );
        assert!(bearer_token(&headers).is_err());
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());
    }
}
