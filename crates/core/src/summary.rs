//! Clinical-summary orchestration.
//!
//! Assembles a [`ClinicalContext`] for a patient (a concurrent fan-out of
//! the seven independent FHIR reads) and runs the selected scoring
//! strategy over it. The fan-out is all-or-nothing: if any read fails the
//! whole operation fails, so a caller never sees partial data presented as
//! a complete history.

use crate::config::GatewayConfig;
use crate::context::{ClinicalContext, TriageRequest, UNKNOWN_AGE};
use crate::error::GatewayResult;
use crate::fhir_client::{FhirClient, ListQuery, ObservationQuery};
use crate::triage::TriageScorer;
use chrono::Utc;
use fhir::{
    allergy, bundle, condition, demographics, encounter, medication, note, observation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use triage_types::TriageResult;

/// Composite response for the summary endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatientSummary {
    pub patient_id: String,
    pub context: ClinicalContext,
    pub triage: TriageResult,
}

/// Intake request for the medical-history operation: identifies the patient
/// by name and date of birth, with whatever symptoms and vitals the intake
/// desk captured.
#[derive(Clone, Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct MedicalHistoryRequest {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`.
    pub birth_date: String,
    pub gender: String,
    pub symptoms: String,
    pub vitals: BTreeMap<String, String>,
}

/// Response for the medical-history operation.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MedicalHistoryReport {
    /// Whether the patient was located on the FHIR server.
    pub patient_found: bool,
    /// Full context when the patient was found, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ClinicalContext>,
    pub triage: TriageResult,
}

/// Orchestrates context assembly and scoring.
#[derive(Clone, Debug)]
pub struct SummaryService {
    config: Arc<GatewayConfig>,
    fhir: Arc<FhirClient>,
}

impl SummaryService {
    pub fn new(config: Arc<GatewayConfig>, fhir: Arc<FhirClient>) -> Self {
        Self { config, fhir }
    }

    /// Fetch and normalize the full clinical context for a patient.
    ///
    /// All seven reads run concurrently; results merge by field, so their
    /// completion order is irrelevant. The first failure aborts the whole
    /// assembly.
    ///
    /// # Errors
    ///
    /// Propagates the first failing read unchanged.
    pub async fn clinical_context(
        &self,
        patient_id: &str,
        token: &str,
    ) -> GatewayResult<ClinicalContext> {
        let vitals_query = ObservationQuery {
            category: Some("vital-signs".to_string()),
            ..ObservationQuery::default()
        };

        let notes_query = ListQuery::default();
        let encounters_query = ListQuery::default();

        let (patient, vitals, conditions, medications, allergies, notes, encounters) = tokio::try_join!(
            self.fhir.patient(patient_id, token),
            self.fhir.observations(patient_id, &vitals_query, token),
            self.fhir.conditions(patient_id, None, token),
            self.fhir.medication_requests(patient_id, token),
            self.fhir.allergies(patient_id, token),
            self.fhir.clinical_notes(patient_id, &notes_query, token),
            self.fhir.encounters(patient_id, &encounters_query, token),
        )?;

        Ok(ClinicalContext {
            demographics: demographics::normalize(&patient),
            vitals: observation::from_bundle(&vitals).observations,
            conditions: condition::from_bundle(&conditions).conditions,
            medications: medication::from_bundle(&medications).medications,
            allergies: allergy::from_bundle(&allergies).allergies,
            notes: note::from_bundle(&notes).notes,
            encounters: encounter::from_bundle(&encounters).encounters,
        })
    }

    /// Assemble the context for a patient and score it.
    ///
    /// # Errors
    ///
    /// Fails on any FHIR read failure, on an unknown strategy override, or
    /// on an LLM transport/status failure.
    pub async fn summarize(
        &self,
        patient_id: &str,
        token: &str,
        strategy: Option<&str>,
    ) -> GatewayResult<PatientSummary> {
        let context = self.clinical_context(patient_id, token).await?;
        let scorer = self.scorer(strategy)?;

        let request = context.to_triage_request(String::new(), BTreeMap::new());
        let triage = scorer.score(&request).await?;

        Ok(PatientSummary {
            patient_id: patient_id.to_string(),
            context,
            triage,
        })
    }

    /// Medical-history lookup by name and date of birth.
    ///
    /// When the patient is found, the full context is assembled and the
    /// caller-supplied symptoms/vitals are layered over the observed data.
    /// When not found, an intentionally minimal context (no history, age
    /// from the supplied date of birth or the unknown-age sentinel) is
    /// scored instead; that path must still produce a valid 1-5 score.
    ///
    /// # Errors
    ///
    /// Fails on FHIR read failures or scoring failures, never on an absent
    /// patient.
    pub async fn medical_history(
        &self,
        request: &MedicalHistoryRequest,
        token: &str,
        strategy: Option<&str>,
    ) -> GatewayResult<MedicalHistoryReport> {
        let scorer = self.scorer(strategy)?;

        let matches = self
            .fhir
            .search_patients(
                &request.first_name,
                &request.last_name,
                &request.birth_date,
                token,
            )
            .await?;

        match first_patient_id(&matches) {
            Some(patient_id) => {
                let context = self.clinical_context(&patient_id, token).await?;
                let scoring_request =
                    context.to_triage_request(request.symptoms.clone(), request.vitals.clone());
                let triage = scorer.score(&scoring_request).await?;

                Ok(MedicalHistoryReport {
                    patient_found: true,
                    context: Some(context),
                    triage,
                })
            }
            None => {
                let scoring_request = minimal_request(request);
                let triage = scorer.score(&scoring_request).await?;

                Ok(MedicalHistoryReport {
                    patient_found: false,
                    context: None,
                    triage,
                })
            }
        }
    }

    fn scorer(&self, override_name: Option<&str>) -> GatewayResult<TriageScorer> {
        match override_name {
            Some(name) => TriageScorer::from_name(name, &self.config),
            None => TriageScorer::new(self.config.triage_strategy(), &self.config),
        }
    }
}

/// Id of the first `Patient` resource in a search bundle, if any.
fn first_patient_id(search_bundle: &Value) -> Option<String> {
    bundle::resources_of_type(search_bundle, "Patient")
        .first()
        .and_then(|resource| resource.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// The no-history scoring input for an unmatched patient.
fn minimal_request(request: &MedicalHistoryRequest) -> TriageRequest {
    let age = demographics::age_on(&request.birth_date, Utc::now().date_naive())
        .map(i64::from)
        .unwrap_or(UNKNOWN_AGE);

    TriageRequest {
        age,
        gender: request.gender.clone(),
        symptoms: request.symptoms.clone(),
        vitals: request.vitals.clone(),
        ..TriageRequest::default()
    }
}
