//! Judge nodes: persona-biased scorers over the accumulated evidence.
//!
//! A judge sees the full rubric and evidence store, never another judge's
//! output. The generation backend is untrusted: its output is parsed and
//! validated against the rubric, and a bounded retry loop feeds validation
//! failures back as corrective context. Exhausting the retry budget degrades
//! the run (zero opinions from this seat) instead of failing it.

use crate::errors::ValidationError;
use crate::graph::Node;
use crate::model::{JudgePersona, JudicialOpinion, RubricDimension};
use crate::providers::llm::LlmClient;
use crate::state::{AgentState, StateUpdate};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Wire shape of a backend response, before validation.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct OpinionsResponse {
    pub opinions: Vec<RawOpinion>,
}

/// One unvalidated opinion as emitted by the backend.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RawOpinion {
    pub criterion_id: String,
    pub judge: String,
    pub score: i64,
    pub argument: String,
    #[serde(default)]
    pub cited_evidence: Vec<String>,
}

/// Generation settings the judge stage cares about.
#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// One seat on the panel, bound to a persona and a generation backend.
pub struct JudgeNode {
    persona: JudgePersona,
    client: Arc<dyn LlmClient>,
    settings: JudgeSettings,
    name: String,
}

impl JudgeNode {
    pub fn new(persona: JudgePersona, client: Arc<dyn LlmClient>, settings: JudgeSettings) -> Self {
        let name = format!("judge_{}", persona.as_str().to_lowercase());
        Self {
            persona,
            client,
            settings,
            name,
        }
    }
}

#[async_trait]
impl Node for JudgeNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &AgentState) -> anyhow::Result<StateUpdate> {
        if state.rubric.is_empty() {
            tracing::info!(persona = %self.persona, "rubric is empty; skipping judgment");
            return Ok(StateUpdate::default());
        }

        let system = system_prompt(self.persona);
        let base_prompt = render_prompt(&state.rubric, state);

        // Explicit retry state: attempt counter plus accumulated corrective
        // feedback, appended to each subsequent generation attempt.
        let mut feedback: Vec<String> = Vec::new();
        for attempt in 1..=self.settings.max_attempts {
            let prompt = if feedback.is_empty() {
                base_prompt.clone()
            } else {
                format!(
                    "{base_prompt}\n\nPrevious attempts were rejected:\n{}",
                    feedback.join("\n")
                )
            };

            let completion = tokio::time::timeout(
                self.settings.request_timeout,
                self.client.complete(&prompt, Some(&system)),
            )
            .await;

            let detail = match completion {
                Err(_) => format!(
                    "request timed out after {}s",
                    self.settings.request_timeout.as_secs()
                ),
                Ok(Err(err)) => err.to_string(),
                Ok(Ok(response)) => {
                    match parse_opinions(&response.text, self.persona, &state.rubric) {
                        Ok(opinions) => {
                            tracing::info!(
                                persona = %self.persona,
                                attempt,
                                opinions = opinions.len(),
                                "judgment rendered"
                            );
                            return Ok(StateUpdate::with_opinions(opinions));
                        }
                        Err(err) => err.to_string(),
                    }
                }
            };

            tracing::warn!(persona = %self.persona, attempt, %detail, "attempt rejected");
            feedback.push(format!(
                "Attempt {attempt} was rejected: {detail}. Correct the output and return \
                 valid JSON with exactly one opinion per rubric dimension."
            ));
        }

        tracing::warn!(
            persona = %self.persona,
            attempts = self.settings.max_attempts,
            "retry budget exhausted; this seat contributes no opinions"
        );
        Ok(StateUpdate::default())
    }
}

fn system_prompt(persona: JudgePersona) -> String {
    format!(
        "You are the {persona} Judge in an automated audit courtroom.\n\nYour perspective:\n{}",
        persona.perspective()
    )
}

/// Render the generation prompt: rubric, evidence snapshot, response schema,
/// and the safe-default rules for insufficient evidence.
fn render_prompt(rubric: &[RubricDimension], state: &AgentState) -> String {
    let rubric_json =
        serde_json::to_string_pretty(rubric).unwrap_or_else(|_| "[]".to_string());
    let evidence_json =
        serde_json::to_string_pretty(&state.evidence).unwrap_or_else(|_| "{}".to_string());
    let schema = schemars::schema_for!(OpinionsResponse);
    let schema_json =
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are given:\n\
         1) Rubric dimensions (each with an \"id\" and \"name\"):\n{rubric_json}\n\n\
         2) Forensic evidence collected by detectives, keyed by criterion id:\n{evidence_json}\n\n\
         Your task:\n\
         - For EVERY dimension in the rubric list, create EXACTLY ONE opinion.\n\
         - Set criterion_id to that dimension's id. Do not invent new ids.\n\
         - Set judge to your persona name exactly.\n\
         - Score each dimension from 1 to 100, based only on the rubric and evidence. \
         Evidence outweighs opinion.\n\
         - Use cited_evidence to list any file paths, ids, or snippets you reference.\n\n\
         If the evidence is missing, empty, or clearly insufficient for a dimension, assume an \
         upstream collection failure and still return one opinion for it with score 1, a \
         non-empty argument explaining the safe default, and an empty cited_evidence list. \
         Never return an empty opinions list and never leave any field blank.\n\n\
         Return a single JSON object matching this schema:\n{schema_json}"
    )
}

/// Parse and validate a backend response into rubric-complete opinions.
///
/// Duplicates per dimension keep the last valid occurrence. The result is
/// ordered by the rubric, one opinion per dimension.
pub fn parse_opinions(
    text: &str,
    persona: JudgePersona,
    rubric: &[RubricDimension],
) -> Result<Vec<JudicialOpinion>, ValidationError> {
    let payload = strip_code_fences(text);
    let response: OpinionsResponse =
        serde_json::from_str(payload).map_err(|e| ValidationError::Malformed {
            detail: e.to_string(),
        })?;
    if response.opinions.is_empty() {
        return Err(ValidationError::EmptyOpinions);
    }

    let known: BTreeMap<&str, ()> = rubric.iter().map(|d| (d.id.as_str(), ())).collect();
    let mut by_criterion: BTreeMap<String, JudicialOpinion> = BTreeMap::new();
    for raw in response.opinions {
        let raw_judge = JudgePersona::parse(&raw.judge)?;
        if raw_judge != persona {
            return Err(ValidationError::WrongJudge {
                expected: persona.as_str().to_string(),
                got: raw.judge,
            });
        }
        if !known.contains_key(raw.criterion_id.as_str()) {
            return Err(ValidationError::UnknownCriterion(raw.criterion_id));
        }
        let opinion = JudicialOpinion::new(
            raw.criterion_id,
            persona,
            raw.score,
            raw.argument,
            raw.cited_evidence,
        )?;
        // Last valid duplicate wins (retried generations sometimes repeat).
        by_criterion.insert(opinion.criterion_id.clone(), opinion);
    }

    let missing: Vec<String> = rubric
        .iter()
        .filter(|d| !by_criterion.contains_key(&d.id))
        .map(|d| d.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingDimensions(missing));
    }

    Ok(rubric
        .iter()
        .map(|d| by_criterion.remove(&d.id).expect("checked above"))
        .collect())
}

/// Tolerate backends that wrap JSON in markdown code fences.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_end_matches('`').trim()
}
