use super::client::GeminiClient;
use super::ports::{Evaluator, VariantGenerator};
use super::prompts;
use super::schema_utils;
use crate::core::model::{Evaluation, EvaluationStatus, Variant};
use crate::error::{DesignerError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VariantDraft {
    #[schemars(description = "Short label for the prompt style.")]
    pub name: String,
    #[schemars(description = "The complete system prompt.")]
    pub content: String,
    #[schemars(description = "Fit estimate between 0 and 1.")]
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VariantBatchResponse {
    pub variants: Vec<VariantDraft>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EvaluationResponse {
    #[schemars(description = "Quality score from 0 to 100.")]
    pub score: f64,
    #[schemars(description = "False when the safety or quality gate rejects the prompt.")]
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

pub struct GeminiVariantGenerator {
    client: Arc<GeminiClient>,
    variant_count: usize,
}

impl GeminiVariantGenerator {
    pub fn new(client: Arc<GeminiClient>, variant_count: usize) -> Self {
        Self { client, variant_count }
    }
}

#[async_trait]
impl VariantGenerator for GeminiVariantGenerator {
    async fn generate(&self, role: &str, task_context: &str) -> Result<Vec<Variant>> {
        let (schema, raw_schema_text) = schema_utils::response_schema::<VariantBatchResponse>()?;
        let system = format!("{}\n\nREQUIRED OUTPUT SCHEMA:\n{}", prompts::VARIANT_WRITER_PROMPT, raw_schema_text);
        let user = format!(
            "Role: {role}\nTask context: \"{task_context}\"\n\nWrite {} variants.",
            self.variant_count
        );

        let resp = self.client.generate(&system, &user, Some(schema), "Variants").await?;
        let batch: VariantBatchResponse = parse_response(&resp, "Variants")?;
        Ok(into_variants(batch.variants, self.variant_count))
    }
}

pub struct GeminiEvaluator {
    client: Arc<GeminiClient>,
    pass_score: u8,
}

impl GeminiEvaluator {
    pub fn new(client: Arc<GeminiClient>, pass_score: u8) -> Self {
        Self { client, pass_score }
    }
}

#[async_trait]
impl Evaluator for GeminiEvaluator {
    async fn evaluate(&self, variant: &Variant) -> Result<Evaluation> {
        let (schema, raw_schema_text) = schema_utils::response_schema::<EvaluationResponse>()?;
        let system = format!("{}\n\nREQUIRED OUTPUT SCHEMA:\n{}", prompts::EVALUATOR_PROMPT, raw_schema_text);
        let user = format!("PROMPT UNDER TEST ({}):\n{}", variant.name, variant.content);

        let started = Instant::now();
        let resp = self.client.generate(&system, &user, Some(schema), "Evaluation").await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let verdict: EvaluationResponse = parse_response(&resp, "Evaluation")?;
        for issue in &verdict.issues {
            log::debug!("   Issue: {issue}");
        }
        Ok(into_evaluation(&verdict, self.pass_score, latency_ms))
    }
}

fn parse_response<T: DeserializeOwned>(text: &str, stage: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| DesignerError::PortFailure(format!("{stage} parse failed: {e}")))
}

/// Assigns fresh ids so batch uniqueness never depends on the model.
fn into_variants(drafts: Vec<VariantDraft>, limit: usize) -> Vec<Variant> {
    drafts
        .into_iter()
        .take(limit)
        .map(|draft| Variant {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            content: draft.content.trim().to_string(),
            confidence: normalize_confidence(draft.confidence),
        })
        .collect()
}

/// Models sometimes answer in percent; anything else is left for batch validation to judge.
fn normalize_confidence(raw: f64) -> f64 {
    if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw }
}

fn into_evaluation(verdict: &EvaluationResponse, pass_score: u8, latency_ms: u64) -> Evaluation {
    let score = verdict.score.clamp(0.0, 100.0).round() as u8;
    let status = if verdict.passed && score >= pass_score {
        EvaluationStatus::Success
    } else {
        EvaluationStatus::Failure
    };
    Evaluation::new(score, status, latency_ms)
}
