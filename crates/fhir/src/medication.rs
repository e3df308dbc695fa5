//! `MedicationRequest` flattening, with the same-bundle `Medication` join.

use crate::bundle;
use crate::coding::coded_text_of;
use crate::str_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Flat record for one `MedicationRequest` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MedicationRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub authored_on: String,
    pub dosage: String,
}

/// Medication requests extracted from one search bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MedicationList {
    pub medications: Vec<MedicationRecord>,
    pub total: usize,
}

/// Flattens every `MedicationRequest` in a search bundle.
///
/// A request naming its drug by `medicationReference` is joined against the
/// `Medication` resources `_include`d in the **same** bundle: a single-pass
/// index build, never a follow-up fetch. A request with
/// `medicationCodeableConcept` uses that concept directly. When neither path
/// yields a name, the reference `display` is the last resort.
pub fn from_bundle(bundle: &Value) -> MedicationList {
    let medication_index: HashMap<String, &Value> = bundle::resources_of_type(bundle, "Medication")
        .into_iter()
        .map(|resource| (str_of(resource, "id"), resource))
        .collect();

    let medications: Vec<MedicationRecord> =
        bundle::resources_of_type(bundle, "MedicationRequest")
            .into_iter()
            .map(|resource| normalize(resource, &medication_index))
            .collect();
    let total = medications.len();

    MedicationList { medications, total }
}

fn normalize(resource: &Value, medication_index: &HashMap<String, &Value>) -> MedicationRecord {
    MedicationRecord {
        id: str_of(resource, "id"),
        name: medication_name(resource, medication_index),
        status: str_of(resource, "status"),
        authored_on: str_of(resource, "authoredOn"),
        dosage: dosage_text(resource),
    }
}

fn medication_name(resource: &Value, medication_index: &HashMap<String, &Value>) -> String {
    if let Some(reference) = resource.get("medicationReference") {
        let target = str_of(reference, "reference");
        let id = target.rsplit('/').next().unwrap_or_default();
        if let Some(medication) = medication_index.get(id) {
            let name = coded_text_of(medication, "code").label().to_string();
            if !name.is_empty() {
                return name;
            }
        }
        return str_of(reference, "display");
    }

    coded_text_of(resource, "medicationCodeableConcept")
        .label()
        .to_string()
}

fn dosage_text(resource: &Value) -> String {
    resource
        .get("dosageInstruction")
        .and_then(Value::as_array)
        .and_then(|instructions| instructions.first())
        .map(|instruction| str_of(instruction, "text"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_reference_against_same_bundle_medication() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {
                    "resourceType": "MedicationRequest",
                    "id": "mr1",
                    "status": "active",
                    "authoredOn": "2023-11-02",
                    "medicationReference": {"reference": "Medication/med-42"},
                    "dosageInstruction": [{"text": "1 tablet daily"}]
                }},
                {"resource": {
                    "resourceType": "Medication",
                    "id": "med-42",
                    "code": {"text": "Lisinopril 10 MG Oral Tablet"}
                }}
            ]
        });

        let list = from_bundle(&bundle);
        assert_eq!(list.total, 1);
        let record = &list.medications[0];
        assert_eq!(record.name, "Lisinopril 10 MG Oral Tablet");
        assert_eq!(record.status, "active");
        assert_eq!(record.dosage, "1 tablet daily");
    }

    #[test]
    fn unresolved_reference_falls_back_to_display() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {
                    "resourceType": "MedicationRequest",
                    "id": "mr1",
                    "medicationReference": {
                        "reference": "Medication/not-included",
                        "display": "Aspirin 81 MG"
                    }
                }}
            ]
        });

        assert_eq!(from_bundle(&bundle).medications[0].name, "Aspirin 81 MG");
    }

    #[test]
    fn inline_concept_is_used_without_a_reference() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {
                    "resourceType": "MedicationRequest",
                    "id": "mr1",
                    "medicationCodeableConcept": {
                        "coding": [{"code": "197361", "display": "Amlodipine 5 MG"}]
                    }
                }}
            ]
        });

        assert_eq!(from_bundle(&bundle).medications[0].name, "Amlodipine 5 MG");
    }

    #[test]
    fn nameless_request_degrades_to_empty_name() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "MedicationRequest", "id": "mr1"}}]
        });

        let list = from_bundle(&bundle);
        assert_eq!(list.medications[0].name, "");
        assert_eq!(list.total, 1);
    }

    #[test]
    fn included_medications_are_not_counted_as_requests() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Medication", "id": "m1", "code": {"text": "X"}}}
            ]
        });

        let list = from_bundle(&bundle);
        assert!(list.medications.is_empty());
        assert_eq!(list.total, 0);
    }
}
