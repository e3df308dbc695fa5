//! Deterministic threshold-based ESI scoring.

use crate::context::TriageRequest;
use std::collections::BTreeMap;
use triage_types::{EsiScore, TriageResult};

// Defaults applied when a vital is missing or unparseable. Chosen so the
// vitals rule cannot fire on absent data: no reading must not read as
// instability.
const DEFAULT_HEART_RATE: i64 = 0;
const DEFAULT_SYSTOLIC_BP: i64 = 120;
const DEFAULT_RESPIRATORY_RATE: i64 = 16;

/// Rule engine over vitals, symptoms and known conditions.
///
/// Rules are evaluated in a fixed priority order and the first match wins;
/// they do not accumulate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBasedStrategy;

impl RuleBasedStrategy {
    pub fn score(&self, request: &TriageRequest) -> TriageResult {
        let heart_rate = vital(&request.vitals, "heartRate", DEFAULT_HEART_RATE);
        let systolic_bp = vital(&request.vitals, "bloodPressureSystolic", DEFAULT_SYSTOLIC_BP);
        let respiratory_rate = vital(
            &request.vitals,
            "respiratoryRate",
            DEFAULT_RESPIRATORY_RATE,
        );
        let symptoms = request.symptoms.to_lowercase();

        if heart_rate > 130 || systolic_bp < 90 || respiratory_rate > 30 {
            return result(
                EsiScore::EMERGENT,
                "Abnormal vitals (HR > 130, BP < 90, RR > 30)",
            );
        }

        if symptoms.contains("chest pain") || symptoms.contains("shortness of breath") {
            return result(EsiScore::EMERGENT, "Symptoms indicate moderate severity");
        }

        if request
            .conditions
            .iter()
            .any(|condition| condition.eq_ignore_ascii_case("hypertension"))
        {
            return result(
                EsiScore::URGENT,
                "Stable chronic condition with no acute distress",
            );
        }

        result(EsiScore::LESS_URGENT, "Stable vitals and symptoms")
    }
}

fn vital(vitals: &BTreeMap<String, String>, key: &str, default: i64) -> i64 {
    vitals
        .get(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn result(esi_score: EsiScore, explanation: &str) -> TriageResult {
    TriageResult {
        esi_score,
        explanation: explanation.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        vitals: &[(&str, &str)],
        symptoms: &str,
        conditions: &[&str],
    ) -> TriageRequest {
        TriageRequest {
            symptoms: symptoms.to_string(),
            vitals: vitals
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            ..TriageRequest::default()
        }
    }

    #[test]
    fn tachycardia_scores_emergent_regardless_of_the_rest() {
        let scored = RuleBasedStrategy.score(&request(
            &[("heartRate", "140")],
            "mild headache",
            &["hypertension"],
        ));
        assert_eq!(scored.esi_score, EsiScore::EMERGENT);
        assert!(scored.explanation.contains("Abnormal vitals"));
    }

    #[test]
    fn hypotension_and_tachypnea_trigger_the_vitals_rule() {
        let low_bp = RuleBasedStrategy.score(&request(&[("bloodPressureSystolic", "85")], "", &[]));
        assert_eq!(low_bp.esi_score, EsiScore::EMERGENT);

        let fast_rr = RuleBasedStrategy.score(&request(&[("respiratoryRate", "32")], "", &[]));
        assert_eq!(fast_rr.esi_score, EsiScore::EMERGENT);
    }

    #[test]
    fn chest_pain_scores_emergent_with_normal_vitals() {
        let scored = RuleBasedStrategy.score(&request(
            &[("heartRate", "80")],
            "intermittent Chest Pain since morning",
            &[],
        ));
        assert_eq!(scored.esi_score, EsiScore::EMERGENT);
        assert!(scored.explanation.contains("moderate severity"));
    }

    #[test]
    fn hypertension_history_scores_urgent() {
        let scored = RuleBasedStrategy.score(&request(
            &[("heartRate", "72"), ("respiratoryRate", "14")],
            "",
            &["Hypertension"],
        ));
        assert_eq!(scored.esi_score, EsiScore::URGENT);
        assert!(scored.explanation.contains("chronic condition"));
    }

    #[test]
    fn everything_normal_scores_less_urgent() {
        let scored = RuleBasedStrategy.score(&request(&[], "", &[]));
        assert_eq!(scored.esi_score, EsiScore::LESS_URGENT);
        assert_eq!(scored.explanation, "Stable vitals and symptoms");
    }

    #[test]
    fn missing_vitals_default_to_non_triggering_values() {
        // heartRate defaults to 0, systolic to 120, respiratory to 16:
        // absent readings must not imply instability.
        let scored = RuleBasedStrategy.score(&request(&[], "sprained ankle", &[]));
        assert_eq!(scored.esi_score, EsiScore::LESS_URGENT);
    }

    #[test]
    fn malformed_vitals_fall_back_to_defaults() {
        let scored = RuleBasedStrategy.score(&request(&[("heartRate", "n/a")], "", &[]));
        assert_eq!(scored.esi_score, EsiScore::LESS_URGENT);
    }
}
