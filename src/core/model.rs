use crate::error::{DesignerError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One candidate prompt formulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Variant {
    #[schemars(description = "Identifier, unique within one generated batch.")]
    pub id: String,
    #[schemars(description = "Short human label describing the prompt style.")]
    pub name: String,
    #[schemars(description = "The full prompt text.")]
    pub content: String,
    #[schemars(description = "Relevance estimate between 0 and 1.")]
    pub confidence: f64,
}

impl Variant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            confidence,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DesignerError::PortFailure("variant has an empty id".into()));
        }
        if self.name.trim().is_empty() {
            return Err(DesignerError::PortFailure(format!("variant '{}' has an empty name", self.id)));
        }
        if self.content.trim().is_empty() {
            return Err(DesignerError::PortFailure(format!("variant '{}' has empty content", self.id)));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(DesignerError::PortFailure(format!(
                "variant '{}' has confidence {} outside [0, 1]",
                self.id, self.confidence
            )));
        }
        Ok(())
    }

    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Checks a whole generator batch: at least one variant, every variant valid, ids unique.
pub fn validate_batch(variants: &[Variant]) -> Result<()> {
    if variants.is_empty() {
        return Err(DesignerError::EmptyGenerationResult);
    }
    let mut seen = HashSet::with_capacity(variants.len());
    for variant in variants {
        variant.validate()?;
        if !seen.insert(variant.id.as_str()) {
            return Err(DesignerError::PortFailure(format!("duplicate variant id '{}' in batch", variant.id)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Success,
    Failure,
}

/// Outcome of one live test against a single variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u8,
    pub status: EvaluationStatus,
    pub latency_ms: u64,
}

impl Evaluation {
    pub fn new(score: u8, status: EvaluationStatus, latency_ms: u64) -> Self {
        Self { score, status, latency_ms }
    }

    pub fn validate(&self) -> Result<()> {
        if self.score > 100 {
            return Err(DesignerError::PortFailure(format!("evaluation score {} exceeds 100", self.score)));
        }
        Ok(())
    }

    pub fn is_success(&self) -> bool {
        self.status == EvaluationStatus::Success
    }

    pub fn verdict(&self) -> &'static str {
        match self.status {
            EvaluationStatus::Success => "System is ready to deploy.",
            EvaluationStatus::Failure => "Safety guard triggered.",
        }
    }
}
