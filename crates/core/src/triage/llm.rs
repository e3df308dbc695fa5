//! LLM-backed ESI scoring.
//!
//! Builds a structured natural-language prompt from the scoring request,
//! sends it to a chat-completion endpoint, and parses the reply. A reply
//! that is not valid `{esi_score, explanation}` JSON is recovered locally
//! with a neutral score, never surfaced as an error.

use crate::config::GatewayConfig;
use crate::context::TriageRequest;
use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use triage_types::{EsiScore, TriageResult};

/// Fixed scoring instruction sent as the system message: the five-level ESI
/// rubric plus guidance on when medical history may move the score.
const SYSTEM_PROMPT: &str = "Your job is to assign an ESI level (1-5) and explain your decision in 50-100 words. Use the following logic:\n\n\
1. **Level 1 (Immediate):** Life-threatening, needs immediate life-saving intervention (e.g., cardiac arrest, unresponsive, severe hypoglycemia).\n\
2. **Level 2 (Emergent):** High risk of deterioration or signs of time-critical condition (e.g., chest pain with cardiac history, asthma attack, altered mental status).\n\
3. **Level 3 (Urgent):** Stable, with multiple types of resources needed to investigate or treat (such as lab tests plus diagnostic imaging) (e.g., abdominal pain, high fever with cough, persistent headache).\n\
4. **Level 4 (Less Urgent):** Stable, with only one type of resource anticipated (such as only an x-ray, or only sutures) (e.g., rabies vaccination, sore throat, simple laceration).\n\
5. **Level 5 (Non-Urgent):** Stable, with no resources anticipated except oral or topical medications, or prescriptions (e.g., suture removal, prescription refill, foreign body in eye).\n\n\
Take medical history into account **only if current symptoms or vitals are provided**. If no symptoms or vitals are given, assign a score of 4 or 5 based on the likelihood of needing minimal resources. Medical history should not significantly influence the score in such cases.\
Example of taking medical history into account properly: If the patient comes in with shortness of breath and has a condition of asthma and had a recent encounter in the ER due to an asthma attack, then we need to take the medical history into account and maybe raise the ESI from a 3 to a 2.\n\
Example of not being overly sensitive to medical history: An older patient comes in and has normal vitals and no symptoms but has existing conditions and a good number of past encounters. The ESI should only be 5, or 4 if they have excessive concerning medical history.\n\
- **Recent medical history** (conditions, medications, allergies, especially recurring or high-risk conditions).\n\
- **Recent encounters only** (last 1-2 years; older ones are less relevant unless highly significant).\n\
- **Vitals** (look for instability: low O2 saturation, high heart rate, low BP, etc.).\n\
- **Current symptoms** and clinical notes.\n\n";

const TEMPERATURE: f32 = 0.3;

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Default)]
struct ChatChoice {
    #[serde(default)]
    message: ChatMessageBody,
}

#[derive(Deserialize, Default)]
struct ChatMessageBody {
    #[serde(default)]
    content: String,
}

/// The JSON shape the model is asked to reply with.
#[derive(Deserialize)]
struct LlmVerdict {
    esi_score: i64,
    #[serde(default)]
    explanation: String,
}

/// LLM scoring backend.
#[derive(Clone, Debug)]
pub struct LlmStrategy {
    model: String,
    api_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl LlmStrategy {
    /// Build the backend from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.llm_timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            model: config.llm_model().to_string(),
            api_url: config.llm_api_url().to_string(),
            api_key: config.llm_api_key().to_string(),
            http,
        })
    }

    /// Score a request via the chat-completion endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unavailable`] when the endpoint cannot be
    /// reached and [`GatewayError::Upstream`] when it replies with a
    /// non-success status or a payload that is not a chat completion.
    /// Malformed *content* inside a successful completion is not an error;
    /// see [`parse_content`].
    pub async fn score(&self, request: &TriageRequest) -> GatewayResult<TriageResult> {
        let payload = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(request),
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("LLM request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("LLM response read failed: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                detail: format!("chat completion failed: {body}"),
            });
        }

        let completion: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::Upstream {
                status: status.as_u16(),
                detail: format!("malformed chat completion payload: {e}"),
            }
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(parse_content(&content))
    }
}

/// Render the scoring request as the user prompt.
///
/// Empty lists render as "None" and missing vitals as "N/A" so the model
/// always sees every slot filled.
pub fn build_prompt(request: &TriageRequest) -> String {
    let age = if request.age < 0 {
        "N/A".to_string()
    } else {
        request.age.to_string()
    };
    let symptoms = if request.symptoms.is_empty() {
        "N/A"
    } else {
        &request.symptoms
    };

    let conditions = join_or_none(request.conditions.iter().cloned());
    let medications = join_or_none(request.medications.iter().map(|m| m.name.clone()));
    let allergies = join_or_none(request.allergies.iter().map(|a| a.name.clone()));
    let notes = join_or_none(
        request
            .clinical_notes
            .iter()
            .map(|note| format!("{} ({})", note.note_type, note.date)),
    );
    let encounters = join_or_none(request.encounters.iter().map(|encounter| {
        format!(
            "{}. Encounter class: {}. Reason for visit: {} (Encounter start: {} - Encounter end: {})",
            encounter.types.join(", "),
            encounter.class_name,
            encounter.reason,
            or_unknown(&encounter.start),
            or_unknown(&encounter.end),
        )
    }));

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Patient's information and past medical history (Refer back to system role content for triage instructions!):"
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Patient:");
    let _ = writeln!(prompt, "- Age: {age}");
    let _ = writeln!(prompt, "- Gender: {}", request.gender);
    let _ = writeln!(prompt, "- Symptoms: {symptoms}");
    let _ = writeln!(prompt, "- Vitals:");
    let _ = writeln!(prompt, "    - Heart Rate: {} bpm", vital(request, "heartRate"));
    let _ = writeln!(
        prompt,
        "    - Blood Pressure: {}/{} mmHg",
        vital(request, "bloodPressureSystolic"),
        vital(request, "bloodPressureDiastolic"),
    );
    let _ = writeln!(
        prompt,
        "    - Temperature: {} {}",
        vital(request, "temperature"),
        vital(request, "temperatureUnit"),
    );
    let _ = writeln!(
        prompt,
        "    - Respiratory Rate: {} breaths/min",
        vital(request, "respiratoryRate"),
    );
    let _ = writeln!(
        prompt,
        "    - Oxygen Saturation: {} %",
        vital(request, "oxygenSaturation"),
    );
    let _ = writeln!(prompt, "- Chronic Conditions: {conditions}");
    let _ = writeln!(prompt, "- Medications: {medications}");
    let _ = writeln!(prompt, "- Allergies: {allergies}");
    let _ = writeln!(prompt, "- Clinical Notes: {notes}");
    let _ = writeln!(prompt, "- Encounters: {encounters}");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Respond with a JSON with these fields:");
    let _ = writeln!(prompt, "  \"esi_score\": <1-5>,");
    let _ = write!(prompt, "  \"explanation\": \"<reasoning>\"");

    prompt
}

/// Interpret the completion content.
///
/// Strips an optional Markdown code fence, then expects `{esi_score,
/// explanation}`. Anything unparseable (malformed JSON or an out-of-range
/// score) falls back to the neutral score with the raw text as the
/// explanation, per the gateway's recovery policy.
pub fn parse_content(content: &str) -> TriageResult {
    let candidate = strip_code_fence(content);

    match serde_json::from_str::<LlmVerdict>(candidate) {
        Ok(verdict) => match EsiScore::new(verdict.esi_score) {
            Ok(esi_score) => TriageResult {
                esi_score,
                explanation: verdict.explanation,
            },
            Err(_) => fallback(content),
        },
        Err(_) => fallback(content),
    }
}

fn fallback(content: &str) -> TriageResult {
    TriageResult {
        esi_score: EsiScore::NEUTRAL,
        explanation: content.trim().to_string(),
    }
}

/// Remove a surrounding ```json … ``` (or plain ```) fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

fn vital<'a>(request: &'a TriageRequest, key: &str) -> &'a str {
    request
        .vitals
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .unwrap_or("N/A")
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "Unknown"
    } else {
        value
    }
}

fn join_or_none<I: Iterator<Item = String>>(items: I) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "None".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EncounterSummary, MedicationSummary, NoteSummary};

    #[test]
    fn fenced_json_content_is_parsed() {
        let result = parse_content("```json\n{\"esi_score\":2,\"explanation\":\"x\"}\n```");
        assert_eq!(result.esi_score, EsiScore::EMERGENT);
        assert_eq!(result.explanation, "x");
    }

    #[test]
    fn bare_json_content_is_parsed() {
        let result = parse_content("{\"esi_score\": 5, \"explanation\": \"minor\"}");
        assert_eq!(result.esi_score, EsiScore::NON_URGENT);
    }

    #[test]
    fn unfenced_plain_fence_is_stripped() {
        let result = parse_content("```\n{\"esi_score\":4,\"explanation\":\"ok\"}\n```");
        assert_eq!(result.esi_score, EsiScore::LESS_URGENT);
    }

    #[test]
    fn unparseable_content_falls_back_to_neutral() {
        let result = parse_content("sorry I cannot");
        assert_eq!(result.esi_score, EsiScore::NEUTRAL);
        assert_eq!(result.explanation, "sorry I cannot");
    }

    #[test]
    fn out_of_range_score_falls_back_to_neutral() {
        let result = parse_content("{\"esi_score\": 9, \"explanation\": \"x\"}");
        assert_eq!(result.esi_score, EsiScore::NEUTRAL);
        assert_eq!(result.explanation, "{\"esi_score\": 9, \"explanation\": \"x\"}");
    }

    #[test]
    fn prompt_renders_placeholders_for_missing_data() {
        let prompt = build_prompt(&TriageRequest::default());

        assert!(prompt.contains("- Age: N/A"));
        assert!(prompt.contains("- Symptoms: N/A"));
        assert!(prompt.contains("- Heart Rate: N/A bpm"));
        assert!(prompt.contains("- Blood Pressure: N/A/N/A mmHg"));
        assert!(prompt.contains("- Chronic Conditions: None"));
        assert!(prompt.contains("- Encounters: None"));
    }

    #[test]
    fn prompt_renders_populated_history() {
        let mut request = TriageRequest {
            age: 61,
            gender: "male".to_string(),
            symptoms: "chest pain".to_string(),
            conditions: vec!["Hypertension".to_string(), "Asthma".to_string()],
            medications: vec![MedicationSummary {
                name: "Lisinopril".to_string(),
            }],
            clinical_notes: vec![NoteSummary {
                note_type: "Discharge summary".to_string(),
                date: "2024-02-10".to_string(),
            }],
            encounters: vec![EncounterSummary {
                types: vec!["ER visit".to_string()],
                class_name: "emergency".to_string(),
                reason: "Chest pain".to_string(),
                start: "2024-01-03".to_string(),
                end: String::new(),
            }],
            ..TriageRequest::default()
        };
        request
            .vitals
            .insert("heartRate".to_string(), "96".to_string());

        let prompt = build_prompt(&request);
        assert!(prompt.contains("- Age: 61"));
        assert!(prompt.contains("- Heart Rate: 96 bpm"));
        assert!(prompt.contains("- Chronic Conditions: Hypertension, Asthma"));
        assert!(prompt.contains("- Medications: Lisinopril"));
        assert!(prompt.contains("Discharge summary (2024-02-10)"));
        assert!(prompt.contains(
            "ER visit. Encounter class: emergency. Reason for visit: Chest pain \
             (Encounter start: 2024-01-03 - Encounter end: Unknown)"
        ));
    }
}
