//! # Triage Core
//!
//! Core business logic for the SMART-on-FHIR ESI triage gateway:
//! - startup-resolved configuration ([`GatewayConfig`])
//! - SMART-on-FHIR authorization and the pending-state store
//! - the read-only FHIR REST client
//! - clinical-context assembly and the triage scoring strategies
//!
//! **No API concerns**: HTTP routing, status-code mapping and OpenAPI
//! documentation belong in `api-rest`.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod fhir_client;
pub mod summary;
pub mod triage;

pub use auth::{SmartAuth, StateStore, TokenResponse};
pub use config::GatewayConfig;
pub use context::{ClinicalContext, TriageRequest};
pub use error::{GatewayError, GatewayResult};
pub use fhir_client::{FhirClient, ListQuery, ObservationQuery};
pub use summary::{MedicalHistoryReport, MedicalHistoryRequest, PatientSummary, SummaryService};
pub use triage::{StrategyKind, TriageScorer};
