//! `Observation` flattening: the `value[x]` union and vital-sign mapping.

use crate::bundle;
use crate::coding::{coded_text, coded_text_of, CodedText};
use crate::{number_text, str_of};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Resolved `Observation.value[x]` union.
///
/// FHIR serialises the union as mutually exclusive `value*` fields;
/// normalization resolves them in a fixed priority order so that exactly one
/// variant is ever produced per observation:
/// `valueQuantity` → `valueString` → `valueBoolean` → `valueInteger` →
/// `valueCodeableConcept` → `component[]`. An observation whose value lives
/// in its components (e.g. a blood-pressure panel) carries [`Absent`] here
/// and a non-empty component list.
///
/// [`Absent`]: ObservationValue::Absent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ObservationValue {
    Quantity { value: f64, unit: String },
    Text(String),
    Boolean(bool),
    Integer(i64),
    Coded(CodedText),
    Absent,
}

impl ObservationValue {
    /// Renders the value as prompt-ready text, empty for [`Absent`].
    ///
    /// [`Absent`]: ObservationValue::Absent
    pub fn as_text(&self) -> String {
        match self {
            ObservationValue::Quantity { value, .. } => number_text(*value),
            ObservationValue::Text(text) => text.clone(),
            ObservationValue::Boolean(flag) => flag.to_string(),
            ObservationValue::Integer(number) => number.to_string(),
            ObservationValue::Coded(coded) => coded.label().to_string(),
            ObservationValue::Absent => String::new(),
        }
    }

    /// Unit of measure, non-empty only for quantities.
    pub fn unit(&self) -> &str {
        match self {
            ObservationValue::Quantity { unit, .. } => unit,
            _ => "",
        }
    }
}

impl<'s> utoipa::ToSchema<'s> for ObservationValue {
    fn schema() -> (
        &'s str,
        utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
    ) {
        (
            "ObservationValue",
            utoipa::openapi::ObjectBuilder::new()
                .description(Some(
                    "Resolved Observation.value[x]: {kind, value} where kind is one of \
                     quantity | text | boolean | integer | coded | absent",
                ))
                .into(),
        )
    }
}

/// One `Observation.component` entry (e.g. a blood-pressure panel leg).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ObservationComponent {
    pub code: CodedText,
    pub value: ObservationValue,
}

/// Flat observation record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Observation {
    pub id: String,
    pub code: CodedText,
    pub effective_date_time: String,
    pub value: ObservationValue,
    pub components: Vec<ObservationComponent>,
}

/// Observations extracted from one search bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ObservationList {
    pub observations: Vec<Observation>,
    pub total: usize,
}

/// Flattens a single `Observation` resource.
pub fn normalize(resource: &Value) -> Observation {
    let (value, components) = extract_value(resource);

    let effective_date_time = {
        let direct = str_of(resource, "effectiveDateTime");
        if direct.is_empty() {
            resource
                .get("effectivePeriod")
                .map(|period| str_of(period, "start"))
                .unwrap_or_default()
        } else {
            direct
        }
    };

    Observation {
        id: str_of(resource, "id"),
        code: coded_text_of(resource, "code"),
        effective_date_time,
        value,
        components,
    }
}

/// Flattens every `Observation` in a search bundle.
pub fn from_bundle(bundle: &Value) -> ObservationList {
    let observations: Vec<Observation> = bundle::resources_of_type(bundle, "Observation")
        .into_iter()
        .map(normalize)
        .collect();
    let total = observations.len();

    ObservationList {
        observations,
        total,
    }
}

/// Resolves the `value[x]` union with the fixed field priority. Exactly one
/// representation is produced; everything else stays at its default.
fn extract_value(resource: &Value) -> (ObservationValue, Vec<ObservationComponent>) {
    if let Some(quantity) = resource.get("valueQuantity") {
        return (quantity_value(quantity), Vec::new());
    }
    if let Some(text) = resource.get("valueString").and_then(Value::as_str) {
        return (ObservationValue::Text(text.to_string()), Vec::new());
    }
    if let Some(flag) = resource.get("valueBoolean").and_then(Value::as_bool) {
        return (ObservationValue::Boolean(flag), Vec::new());
    }
    if let Some(number) = resource.get("valueInteger").and_then(Value::as_i64) {
        return (ObservationValue::Integer(number), Vec::new());
    }
    if let Some(concept) = resource.get("valueCodeableConcept") {
        return (ObservationValue::Coded(coded_text(concept)), Vec::new());
    }
    if let Some(components) = resource.get("component").and_then(Value::as_array) {
        let components = components
            .iter()
            .map(|component| ObservationComponent {
                code: coded_text_of(component, "code"),
                value: component_value(component),
            })
            .collect();
        return (ObservationValue::Absent, components);
    }

    (ObservationValue::Absent, Vec::new())
}

/// `component` entries reuse the same union, minus nested components.
fn component_value(component: &Value) -> ObservationValue {
    if let Some(quantity) = component.get("valueQuantity") {
        return quantity_value(quantity);
    }
    if let Some(text) = component.get("valueString").and_then(Value::as_str) {
        return ObservationValue::Text(text.to_string());
    }
    if let Some(flag) = component.get("valueBoolean").and_then(Value::as_bool) {
        return ObservationValue::Boolean(flag);
    }
    if let Some(number) = component.get("valueInteger").and_then(Value::as_i64) {
        return ObservationValue::Integer(number);
    }
    if let Some(concept) = component.get("valueCodeableConcept") {
        return ObservationValue::Coded(coded_text(concept));
    }
    ObservationValue::Absent
}

fn quantity_value(quantity: &Value) -> ObservationValue {
    let unit = {
        let unit = str_of(quantity, "unit");
        if unit.is_empty() {
            str_of(quantity, "code")
        } else {
            unit
        }
    };

    ObservationValue::Quantity {
        value: quantity.get("value").and_then(Value::as_f64).unwrap_or(0.0),
        unit,
    }
}

// LOINC codes for the vital signs the triage prompt understands.
const HEART_RATE: &str = "8867-4";
const SYSTOLIC_BP: &str = "8480-6";
const DIASTOLIC_BP: &str = "8462-4";
const BODY_TEMPERATURE: &str = "8310-5";
const RESPIRATORY_RATE: &str = "9279-1";
const OXYGEN_SATURATION_ARTERIAL: &str = "2708-6";
const OXYGEN_SATURATION_PULSE_OX: &str = "59408-5";

fn vital_key(code: &CodedText) -> Option<&'static str> {
    match code.code.as_str() {
        HEART_RATE => return Some("heartRate"),
        SYSTOLIC_BP => return Some("bloodPressureSystolic"),
        DIASTOLIC_BP => return Some("bloodPressureDiastolic"),
        BODY_TEMPERATURE => return Some("temperature"),
        RESPIRATORY_RATE => return Some("respiratoryRate"),
        OXYGEN_SATURATION_ARTERIAL | OXYGEN_SATURATION_PULSE_OX => {
            return Some("oxygenSaturation")
        }
        _ => {}
    }

    // Sandbox servers sometimes omit LOINC codings; fall back on the label.
    let label = code.label().to_ascii_lowercase();
    if label.contains("heart rate") || label.contains("pulse") {
        Some("heartRate")
    } else if label.contains("systolic") {
        Some("bloodPressureSystolic")
    } else if label.contains("diastolic") {
        Some("bloodPressureDiastolic")
    } else if label.contains("temperature") {
        Some("temperature")
    } else if label.contains("respiratory rate") {
        Some("respiratoryRate")
    } else if label.contains("oxygen saturation") {
        Some("oxygenSaturation")
    } else {
        None
    }
}

/// Projects vital-sign observations onto the flat string map the scoring
/// strategies consume (`heartRate`, `bloodPressureSystolic`, ...).
///
/// Observations are expected newest-first (the FHIR client sorts by
/// `-date`); the first reading per key wins. Blood-pressure panels are
/// unpacked from their components, and a temperature quantity also records
/// its unit under `temperatureUnit`.
pub fn vitals_map(observations: &[Observation]) -> BTreeMap<String, String> {
    let mut vitals = BTreeMap::new();

    for observation in observations {
        for (code, value) in readings(observation) {
            let Some(key) = vital_key(code) else { continue };
            let text = value.as_text();
            if text.is_empty() {
                continue;
            }
            vitals.entry(key.to_string()).or_insert(text);
            if key == "temperature" && !value.unit().is_empty() {
                vitals
                    .entry("temperatureUnit".to_string())
                    .or_insert_with(|| value.unit().to_string());
            }
        }
    }

    vitals
}

/// The scoreable readings an observation carries: its own code/value pair,
/// or one pair per component when the value lives there.
fn readings(observation: &Observation) -> Vec<(&CodedText, &ObservationValue)> {
    if observation.components.is_empty() {
        vec![(&observation.code, &observation.value)]
    } else {
        observation
            .components
            .iter()
            .map(|component| (&component.code, &component.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quantity_observation(id: &str, code: &str, display: &str, value: f64, unit: &str) -> Value {
        json!({
            "resourceType": "Observation",
            "id": id,
            "code": {"coding": [{"system": "http://loinc.org", "code": code, "display": display}]},
            "effectiveDateTime": "2024-03-01T10:00:00Z",
            "valueQuantity": {"value": value, "unit": unit}
        })
    }

    #[test]
    fn resolves_quantity_variant() {
        let observation = normalize(&quantity_observation(
            "o1", "8867-4", "Heart rate", 88.0, "/min",
        ));
        assert_eq!(
            observation.value,
            ObservationValue::Quantity {
                value: 88.0,
                unit: "/min".to_string()
            }
        );
        assert!(observation.components.is_empty());
    }

    #[test]
    fn quantity_takes_priority_over_string() {
        let observation = normalize(&json!({
            "resourceType": "Observation",
            "valueQuantity": {"value": 1.5, "unit": "mg"},
            "valueString": "ignored"
        }));
        assert_eq!(
            observation.value,
            ObservationValue::Quantity {
                value: 1.5,
                unit: "mg".to_string()
            }
        );
    }

    #[test]
    fn resolves_each_scalar_variant() {
        let text = normalize(&json!({"valueString": "positive"}));
        assert_eq!(text.value, ObservationValue::Text("positive".to_string()));

        let boolean = normalize(&json!({"valueBoolean": true}));
        assert_eq!(boolean.value, ObservationValue::Boolean(true));

        let integer = normalize(&json!({"valueInteger": 3}));
        assert_eq!(integer.value, ObservationValue::Integer(3));

        let coded = normalize(&json!({
            "valueCodeableConcept": {"text": "Negative", "coding": [{"code": "260385009"}]}
        }));
        match coded.value {
            ObservationValue::Coded(ref concept) => assert_eq!(concept.text, "Negative"),
            ref other => panic!("expected coded value, got {other:?}"),
        }
    }

    #[test]
    fn component_panel_resolves_to_components_only() {
        let observation = normalize(&json!({
            "resourceType": "Observation",
            "id": "bp",
            "code": {"coding": [{"code": "85354-9", "display": "Blood pressure panel"}]},
            "component": [
                {
                    "code": {"coding": [{"code": "8480-6", "display": "Systolic"}]},
                    "valueQuantity": {"value": 128.0, "unit": "mmHg"}
                },
                {
                    "code": {"coding": [{"code": "8462-4", "display": "Diastolic"}]},
                    "valueQuantity": {"value": 82.0, "unit": "mmHg"}
                }
            ]
        }));

        assert_eq!(observation.value, ObservationValue::Absent);
        assert_eq!(observation.components.len(), 2);
        assert_eq!(observation.components[0].value.as_text(), "128");
    }

    #[test]
    fn valueless_observation_is_absent() {
        let observation = normalize(&json!({"resourceType": "Observation", "id": "x"}));
        assert_eq!(observation.value, ObservationValue::Absent);
        assert!(observation.components.is_empty());
    }

    #[test]
    fn effective_period_start_is_the_fallback_timestamp() {
        let observation = normalize(&json!({
            "effectivePeriod": {"start": "2024-01-01", "end": "2024-01-02"}
        }));
        assert_eq!(observation.effective_date_time, "2024-01-01");
    }

    #[test]
    fn bundle_without_entries_is_empty_with_zero_total() {
        let list = from_bundle(&json!({"resourceType": "Bundle"}));
        assert!(list.observations.is_empty());
        assert_eq!(list.total, 0);
    }

    #[test]
    fn bundle_total_matches_extracted_length() {
        let bundle = json!({
            "resourceType": "Bundle",
            "total": 99,
            "entry": [
                {"resource": quantity_observation("o1", "8867-4", "Heart rate", 72.0, "/min")},
                {"resource": {"resourceType": "OperationOutcome"}},
                {"resource": quantity_observation("o2", "9279-1", "Respiratory rate", 14.0, "/min")}
            ]
        });

        let list = from_bundle(&bundle);
        assert_eq!(list.observations.len(), 2);
        assert_eq!(list.total, 2);
    }

    #[test]
    fn vitals_map_projects_loinc_codes() {
        let observations = vec![
            normalize(&quantity_observation("o1", "8867-4", "Heart rate", 88.0, "/min")),
            normalize(&quantity_observation(
                "o2",
                "8310-5",
                "Body temperature",
                37.2,
                "Cel",
            )),
            normalize(&quantity_observation(
                "o3",
                "59408-5",
                "Oxygen saturation",
                97.0,
                "%",
            )),
        ];

        let vitals = vitals_map(&observations);
        assert_eq!(vitals.get("heartRate").map(String::as_str), Some("88"));
        assert_eq!(vitals.get("temperature").map(String::as_str), Some("37.2"));
        assert_eq!(
            vitals.get("temperatureUnit").map(String::as_str),
            Some("Cel")
        );
        assert_eq!(
            vitals.get("oxygenSaturation").map(String::as_str),
            Some("97")
        );
    }

    #[test]
    fn vitals_map_unpacks_bp_panel_components() {
        let panel = normalize(&json!({
            "code": {"coding": [{"code": "85354-9"}]},
            "component": [
                {
                    "code": {"coding": [{"code": "8480-6"}]},
                    "valueQuantity": {"value": 128.0, "unit": "mmHg"}
                },
                {
                    "code": {"coding": [{"code": "8462-4"}]},
                    "valueQuantity": {"value": 82.0, "unit": "mmHg"}
                }
            ]
        }));

        let vitals = vitals_map(&[panel]);
        assert_eq!(
            vitals.get("bloodPressureSystolic").map(String::as_str),
            Some("128")
        );
        assert_eq!(
            vitals.get("bloodPressureDiastolic").map(String::as_str),
            Some("82")
        );
    }

    #[test]
    fn vitals_map_keeps_the_newest_reading() {
        // Newest-first ordering, the way the FHIR client sorts results.
        let observations = vec![
            normalize(&quantity_observation("new", "8867-4", "Heart rate", 91.0, "/min")),
            normalize(&quantity_observation("old", "8867-4", "Heart rate", 74.0, "/min")),
        ];

        let vitals = vitals_map(&observations);
        assert_eq!(vitals.get("heartRate").map(String::as_str), Some("91"));
    }

    #[test]
    fn vitals_map_falls_back_on_display_text() {
        let uncoded = normalize(&json!({
            "code": {"text": "Respiratory rate"},
            "valueQuantity": {"value": 18.0, "unit": "/min"}
        }));

        let vitals = vitals_map(&[uncoded]);
        assert_eq!(
            vitals.get("respiratoryRate").map(String::as_str),
            Some("18")
        );
    }
}
