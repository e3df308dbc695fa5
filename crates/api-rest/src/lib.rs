//! # API REST
//!
//! REST surface of the SMART-on-FHIR ESI triage gateway.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status mapping)
//!
//! Uses `triage-core` for everything else; no business logic lives here.

#![warn(rust_2018_idioms)]

pub mod auth_routes;
pub mod error;
pub mod patient_routes;
pub mod triage_routes;

use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use triage_core::{
    FhirClient, GatewayConfig, GatewayError, GatewayResult, SmartAuth, StateStore, SummaryService,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub auth: Arc<SmartAuth>,
    pub states: Arc<StateStore>,
    pub fhir: Arc<FhirClient>,
    pub summary: Arc<SummaryService>,
}

/// Wire up all services from resolved configuration.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if any HTTP client cannot be built.
pub fn build_state(config: GatewayConfig) -> GatewayResult<AppState> {
    let auth = Arc::new(SmartAuth::new(&config)?);
    let states = Arc::new(StateStore::new(config.state_ttl(), config.state_capacity()));
    let fhir = Arc::new(FhirClient::new(&config)?);
    let config = Arc::new(config);
    let summary = Arc::new(SummaryService::new(config.clone(), fhir.clone()));

    Ok(AppState {
        config,
        auth,
        states,
        fhir,
        summary,
    })
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        index,
        health,
        auth_routes::login,
        auth_routes::callback,
        auth_routes::launch,
        patient_routes::patient,
        patient_routes::patient_demographics,
        patient_routes::patient_vitals,
        patient_routes::patient_labs,
        patient_routes::patient_observations,
        patient_routes::patient_conditions,
        patient_routes::patient_medications,
        patient_routes::patient_allergies,
        patient_routes::patient_clinical_notes,
        patient_routes::patient_encounters,
        patient_routes::patient_summary,
        patient_routes::medical_history,
        triage_routes::predict,
    ),
    components(schemas(
        HealthRes,
        error::ErrorBody,
        triage_core::TokenResponse,
        triage_core::ClinicalContext,
        triage_core::TriageRequest,
        triage_core::PatientSummary,
        triage_core::MedicalHistoryRequest,
        triage_core::MedicalHistoryReport,
        triage_core::context::MedicationSummary,
        triage_core::context::AllergySummary,
        triage_core::context::NoteSummary,
        triage_core::context::EncounterSummary,
        triage_types::EsiScore,
        triage_types::TriageResult,
        fhir::CodedText,
        fhir::Demographics,
        fhir::Observation,
        fhir::ObservationValue,
        fhir::ObservationComponent,
        fhir::ObservationList,
        fhir::ConditionRecord,
        fhir::ConditionList,
        fhir::MedicationRecord,
        fhir::MedicationList,
        fhir::AllergyRecord,
        fhir::AllergyList,
        fhir::ClinicalNote,
        fhir::NoteList,
        fhir::EncounterRecord,
        fhir::EncounterList,
        fhir::Period,
    ))
)]
pub struct ApiDoc;

/// Build the full application router.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] when the configured frontend origin is
/// not a valid header value.
pub fn app(state: AppState) -> GatewayResult<Router> {
    let cors = cors_layer(&state.config)?;

    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/auth/login", get(auth_routes::login))
        .route("/auth/callback", get(auth_routes::callback))
        .route("/auth/launch", get(auth_routes::launch))
        .route(
            "/api/v1/patient/medical-history",
            post(patient_routes::medical_history),
        )
        .route("/api/v1/patient/:id", get(patient_routes::patient))
        .route(
            "/api/v1/patient/:id/demographics",
            get(patient_routes::patient_demographics),
        )
        .route(
            "/api/v1/patient/:id/vitals",
            get(patient_routes::patient_vitals),
        )
        .route("/api/v1/patient/:id/labs", get(patient_routes::patient_labs))
        .route(
            "/api/v1/patient/:id/observations",
            get(patient_routes::patient_observations),
        )
        .route(
            "/api/v1/patient/:id/conditions",
            get(patient_routes::patient_conditions),
        )
        .route(
            "/api/v1/patient/:id/medications",
            get(patient_routes::patient_medications),
        )
        .route(
            "/api/v1/patient/:id/allergies",
            get(patient_routes::patient_allergies),
        )
        .route(
            "/api/v1/patient/:id/clinical-notes",
            get(patient_routes::patient_clinical_notes),
        )
        .route(
            "/api/v1/patient/:id/encounters",
            get(patient_routes::patient_encounters),
        )
        .route(
            "/api/v1/patient/:id/summary",
            get(patient_routes::patient_summary),
        )
        .route("/api/v1/triage/predict", post(triage_routes::predict))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state))
}

/// CORS policy: locked to the configured frontend origin when one is set,
/// permissive otherwise.
fn cors_layer(config: &GatewayConfig) -> GatewayResult<CorsLayer> {
    match config.frontend_url() {
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>().map_err(|_| {
                GatewayError::Config(format!("FRONTEND_URL is not a valid origin: {origin}"))
            })?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner"))
)]
/// Service banner
#[axum::debug_handler]
async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "Welcome to ER Triage API"}))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Health check response", body = HealthRes))
)]
/// Health check endpoint
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Triage gateway is alive".to_string(),
    })
}
