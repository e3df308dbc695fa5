//! Per-request clinical context and the flat scoring input built from it.

use fhir::{
    observation, AllergyRecord, ClinicalNote, ConditionRecord, Demographics, EncounterRecord,
    MedicationRecord, Observation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the gateway knows about a patient for one request.
///
/// Assembled by the orchestrator's fan-out, consumed by prompt building and
/// the API response, then discarded. Never persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClinicalContext {
    pub demographics: Demographics,
    pub vitals: Vec<Observation>,
    pub conditions: Vec<ConditionRecord>,
    pub medications: Vec<MedicationRecord>,
    pub allergies: Vec<AllergyRecord>,
    pub notes: Vec<ClinicalNote>,
    pub encounters: Vec<EncounterRecord>,
}

/// Sentinel age used when no parseable date of birth is available.
pub const UNKNOWN_AGE: i64 = -1;

/// Medication line in a scoring request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MedicationSummary {
    pub name: String,
}

/// Allergy line in a scoring request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AllergySummary {
    pub name: String,
}

/// Clinical-note line in a scoring request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteSummary {
    #[serde(rename = "type")]
    pub note_type: String,
    pub date: String,
}

/// Encounter line in a scoring request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EncounterSummary {
    pub types: Vec<String>,
    #[serde(rename = "class")]
    pub class_name: String,
    pub reason: String,
    pub start: String,
    pub end: String,
}

/// Flat input to the scoring strategies.
///
/// Mirrors what the prompt renders: demographic basics, a free-text symptom
/// line, a string-keyed vitals map, and the history lists. All fields
/// default so partial API payloads deserialize without ceremony.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct TriageRequest {
    /// Age in years; [`UNKNOWN_AGE`] when unknown.
    pub age: i64,
    pub gender: String,
    pub symptoms: String,
    /// Vital readings keyed by `heartRate`, `bloodPressureSystolic`,
    /// `bloodPressureDiastolic`, `temperature`, `temperatureUnit`,
    /// `respiratoryRate`, `oxygenSaturation`.
    pub vitals: BTreeMap<String, String>,
    pub conditions: Vec<String>,
    pub medications: Vec<MedicationSummary>,
    pub allergies: Vec<AllergySummary>,
    pub clinical_notes: Vec<NoteSummary>,
    pub encounters: Vec<EncounterSummary>,
}

impl Default for TriageRequest {
    fn default() -> Self {
        Self {
            age: UNKNOWN_AGE,
            gender: String::new(),
            symptoms: String::new(),
            vitals: BTreeMap::new(),
            conditions: Vec::new(),
            medications: Vec::new(),
            allergies: Vec::new(),
            clinical_notes: Vec::new(),
            encounters: Vec::new(),
        }
    }
}

impl ClinicalContext {
    /// Project the context onto the flat scoring input.
    ///
    /// `symptoms` and `vital_overrides` come from the caller (intake form);
    /// an override wins over the observed reading for the same key.
    pub fn to_triage_request(
        &self,
        symptoms: String,
        vital_overrides: BTreeMap<String, String>,
    ) -> TriageRequest {
        let mut vitals = observation::vitals_map(&self.vitals);
        for (key, value) in vital_overrides {
            vitals.insert(key, value);
        }

        TriageRequest {
            age: self.demographics.age.map(i64::from).unwrap_or(UNKNOWN_AGE),
            gender: self.demographics.gender.clone(),
            symptoms,
            vitals,
            conditions: self
                .conditions
                .iter()
                .map(|condition| condition.name.label().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
            medications: self
                .medications
                .iter()
                .filter(|medication| !medication.name.is_empty())
                .map(|medication| MedicationSummary {
                    name: medication.name.clone(),
                })
                .collect(),
            allergies: self
                .allergies
                .iter()
                .filter(|allergy| !allergy.name.is_empty())
                .map(|allergy| AllergySummary {
                    name: allergy.name.clone(),
                })
                .collect(),
            clinical_notes: self
                .notes
                .iter()
                .map(|note| NoteSummary {
                    note_type: note.note_type.label().to_string(),
                    date: note.date.clone(),
                })
                .collect(),
            encounters: self
                .encounters
                .iter()
                .map(|encounter| EncounterSummary {
                    types: encounter.types.clone(),
                    class_name: encounter.class.clone(),
                    reason: encounter.reason.clone(),
                    start: encounter.period.start.clone(),
                    end: encounter.period.end.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::{CodedText, Period};

    fn context_with_history() -> ClinicalContext {
        ClinicalContext {
            demographics: Demographics {
                id: "pat-1".to_string(),
                gender: "male".to_string(),
                age: Some(61),
                ..Demographics::default()
            },
            conditions: vec![
                ConditionRecord {
                    name: CodedText {
                        text: "Hypertension".to_string(),
                        ..CodedText::default()
                    },
                    ..ConditionRecord::default()
                },
                ConditionRecord::default(),
            ],
            medications: vec![MedicationRecord {
                name: "Lisinopril".to_string(),
                ..MedicationRecord::default()
            }],
            encounters: vec![EncounterRecord {
                types: vec!["ER visit".to_string()],
                class: "emergency".to_string(),
                reason: "Chest pain".to_string(),
                period: Period {
                    start: "2024-01-03".to_string(),
                    end: "2024-01-04".to_string(),
                },
                ..EncounterRecord::default()
            }],
            ..ClinicalContext::default()
        }
    }

    #[test]
    fn projects_history_and_drops_unnamed_records() {
        let request =
            context_with_history().to_triage_request("chest pain".to_string(), BTreeMap::new());

        assert_eq!(request.age, 61);
        assert_eq!(request.gender, "male");
        // the unnamed condition record is filtered out
        assert_eq!(request.conditions, vec!["Hypertension"]);
        assert_eq!(request.medications[0].name, "Lisinopril");
        assert_eq!(request.encounters[0].class_name, "emergency");
        assert_eq!(request.encounters[0].start, "2024-01-03");
    }

    #[test]
    fn missing_age_becomes_sentinel() {
        let context = ClinicalContext::default();
        let request = context.to_triage_request(String::new(), BTreeMap::new());
        assert_eq!(request.age, UNKNOWN_AGE);
    }

    #[test]
    fn caller_vitals_override_observed_readings() {
        let mut overrides = BTreeMap::new();
        overrides.insert("heartRate".to_string(), "142".to_string());

        let request = context_with_history().to_triage_request(String::new(), overrides);
        assert_eq!(request.vitals.get("heartRate").map(String::as_str), Some("142"));
    }

    #[test]
    fn partial_json_deserializes_with_defaults() {
        let request: TriageRequest =
            serde_json::from_str(r#"{"gender": "female", "symptoms": "fever"}"#).expect("parse");
        assert_eq!(request.age, UNKNOWN_AGE);
        assert!(request.vitals.is_empty());
        assert!(request.encounters.is_empty());
    }
}
