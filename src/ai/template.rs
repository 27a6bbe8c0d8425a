//! Offline generator: fills fixed prompt styles with the role and task context.

use super::ports::VariantGenerator;
use crate::core::model::Variant;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

struct Style {
    name: &'static str,
    confidence: f64,
    render: fn(&str, &str) -> String,
}

const STYLES: [Style; 3] = [
    Style { name: "Direct & Efficient", confidence: 0.92, render: direct },
    Style { name: "Analytical & Safe", confidence: 0.88, render: analytical },
    Style { name: "Creative Assistant", confidence: 0.85, render: creative },
];

fn direct(role: &str, ctx: &str) -> String {
    format!(
        "You are a {role}. Your task is to execute the following based on context: \"{ctx}\".\n\n\
         Requirements:\n\
         1. Optimize for code generation speed.\n\
         2. Keep error handling minimal.\n\
         3. Return the result in markdown code blocks."
    )
}

fn analytical(role: &str, ctx: &str) -> String {
    format!(
        "Act as a {role}. Analyze this context: \"{ctx}\".\n\n\
         Consider the following constraints:\n\
         - Maintain high code quality standards.\n\
         - Review for potential bugs.\n\
         - Provide a step-by-step solution before execution."
    )
}

fn creative(role: &str, ctx: &str) -> String {
    format!(
        "You are an expert {role} helping design an AI workflow. Context: \"{ctx}\".\n\n\
         Approach:\n\
         - Think outside the box.\n\
         - Propose innovative solutions.\n\
         - Focus on scalability."
    )
}

/// Deterministic content, fresh ids per batch. Yields at most one variant per style.
pub struct TemplateGenerator {
    count: usize,
    delay: Option<Duration>,
}

impl TemplateGenerator {
    pub fn new(count: usize) -> Self {
        Self { count, delay: None }
    }

    /// Sleeps before answering, to mimic model latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl VariantGenerator for TemplateGenerator {
    async fn generate(&self, role: &str, task_context: &str) -> Result<Vec<Variant>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let role = role.trim();
        let ctx = task_context.trim();
        Ok(STYLES
            .iter()
            .take(self.count)
            .map(|style| Variant::new(Uuid::new_v4().to_string(), style.name, (style.render)(role, ctx), style.confidence))
            .collect())
    }
}
