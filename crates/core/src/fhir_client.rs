//! FHIR REST client.
//!
//! Thin read-only client over the upstream FHIR server. Every call is a
//! single attempt with a timeout; there are no retries. Responses come back
//! as raw `serde_json::Value` payloads; normalization happens in the `fhir`
//! crate, at the edge that consumes them.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use chrono::NaiveDate;
use serde_json::Value;

/// Caller-supplied window/paging filters shared by the list reads.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub date_to: Option<String>,
    /// Page size forwarded as `_count`.
    pub count: Option<u32>,
}

/// Observation-specific filters on top of [`ListQuery`].
#[derive(Clone, Debug, Default)]
pub struct ObservationQuery {
    pub category: Option<String>,
    pub code: Option<String>,
    pub list: ListQuery,
}

/// Read-only FHIR REST client.
#[derive(Clone, Debug)]
pub struct FhirClient {
    base_url: String,
    http: reqwest::Client,
}

impl FhirClient {
    /// Build the client from resolved configuration.
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
            base_url: config.fhir_base_url().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Fetch a `Patient` resource by id.
    pub async fn patient(&self, patient_id: &str, token: &str) -> GatewayResult<Value> {
        self.read(&format!("Patient/{patient_id}"), &[], token)
            .await
    }

    /// Search `Patient` by name and birth date.
    pub async fn search_patients(
        &self,
        given: &str,
        family: &str,
        birth_date: &str,
        token: &str,
    ) -> GatewayResult<Value> {
        let params = vec![
            ("given".to_string(), given.to_string()),
            ("family".to_string(), family.to_string()),
            ("birthdate".to_string(), birth_date.to_string()),
        ];
        self.read("Patient", &params, token).await
    }

    /// Search `Observation` for a patient, newest first.
    pub async fn observations(
        &self,
        patient_id: &str,
        query: &ObservationQuery,
        token: &str,
    ) -> GatewayResult<Value> {
        let mut params = vec![("patient".to_string(), patient_id.to_string())];
        if let Some(category) = &query.category {
            params.push(("category".to_string(), category.clone()));
        }
        if let Some(code) = &query.code {
            params.push(("code".to_string(), code.clone()));
        }
        push_date_window(&mut params, "date", &query.list)?;
        params.push(("_sort".to_string(), "-date".to_string()));

        self.read("Observation", &params, token).await
    }

    /// Search `Condition` for a patient.
    pub async fn conditions(
        &self,
        patient_id: &str,
        clinical_status: Option<&str>,
        token: &str,
    ) -> GatewayResult<Value> {
        let mut params = vec![("patient".to_string(), patient_id.to_string())];
        if let Some(status) = clinical_status {
            params.push(("clinical-status".to_string(), status.to_string()));
        }

        self.read("Condition", &params, token).await
    }

    /// Search `MedicationRequest` for a patient, `_include`-ing the
    /// referenced `Medication` resources so the normalizer can join them
    /// without follow-up fetches.
    pub async fn medication_requests(&self, patient_id: &str, token: &str) -> GatewayResult<Value> {
        let params = vec![
            ("patient".to_string(), patient_id.to_string()),
            (
                "_include".to_string(),
                "MedicationRequest:medication".to_string(),
            ),
        ];

        self.read("MedicationRequest", &params, token).await
    }

    /// Search `AllergyIntolerance` for a patient.
    pub async fn allergies(&self, patient_id: &str, token: &str) -> GatewayResult<Value> {
        let params = vec![("patient".to_string(), patient_id.to_string())];
        self.read("AllergyIntolerance", &params, token).await
    }

    /// Search `DocumentReference` (clinical notes) for a patient, newest
    /// first.
    pub async fn clinical_notes(
        &self,
        patient_id: &str,
        query: &ListQuery,
        token: &str,
    ) -> GatewayResult<Value> {
        let mut params = vec![("patient".to_string(), patient_id.to_string())];
        push_date_window(&mut params, "date", query)?;
        params.push(("_sort".to_string(), "-date".to_string()));

        self.read("DocumentReference", &params, token).await
    }

    /// Search `Encounter` for a patient, newest first.
    pub async fn encounters(
        &self,
        patient_id: &str,
        query: &ListQuery,
        token: &str,
    ) -> GatewayResult<Value> {
        let mut params = vec![("patient".to_string(), patient_id.to_string())];
        push_date_window(&mut params, "date", query)?;
        params.push(("_sort".to_string(), "-date".to_string()));

        self.read("Encounter", &params, token).await
    }

    async fn read(
        &self,
        path: &str,
        params: &[(String, String)],
        token: &str,
    ) -> GatewayResult<Value> {
        let url = format!("{}/{path}", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(params)
            .header(reqwest::header::ACCEPT, "application/fhir+json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("FHIR request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let mut detail = format!("FHIR server returned HTTP {}", status.as_u16());
            if let Some(issue) = operation_outcome_text(&body) {
                detail = format!("{detail} - {issue}");
            }
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        response.json().await.map_err(|e| GatewayError::Upstream {
            status: status.as_u16(),
            detail: format!("FHIR server returned a malformed payload: {e}"),
        })
    }
}

/// Append `date=ge…`/`date=le…`/`_count` search parameters.
///
/// Date bounds are validated up front so a typo surfaces as a 400 instead
/// of an opaque upstream rejection.
fn push_date_window(
    params: &mut Vec<(String, String)>,
    field: &str,
    query: &ListQuery,
) -> GatewayResult<()> {
    if let Some(from) = &query.date_from {
        validate_date("date_from", from)?;
        params.push((field.to_string(), format!("ge{from}")));
    }
    if let Some(to) = &query.date_to {
        validate_date("date_to", to)?;
        params.push((field.to_string(), format!("le{to}")));
    }
    if let Some(count) = query.count {
        params.push(("_count".to_string(), count.to_string()));
    }
    Ok(())
}

fn validate_date(name: &str, value: &str) -> GatewayResult<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| GatewayError::InvalidInput(format!("{name} must be YYYY-MM-DD, got '{value}'")))
}

/// Human-readable issue text from an `OperationOutcome` body, when present.
fn operation_outcome_text(body: &Value) -> Option<String> {
    let issue = body.get("issue")?.as_array()?.first()?;

    issue
        .get("details")
        .and_then(|details| details.get("text"))
        .or_else(|| issue.get("diagnostics"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
