//! Seams between the workflow controller and whatever actually writes or judges prompts.

use crate::core::model::{Evaluation, Variant};
use crate::error::{DesignerError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;

/// Produces an ordered batch of candidate prompts for a role and task.
#[async_trait]
pub trait VariantGenerator: Send + Sync {
    async fn generate(&self, role: &str, task_context: &str) -> Result<Vec<Variant>>;
}

/// Runs a live test against one variant.
///
/// A `Failure` status is a normal outcome (the quality gate rejected the prompt);
/// an `Err` means the evaluator itself could not be reached or misbehaved.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, variant: &Variant) -> Result<Evaluation>;
}

/// Puts an upper bound on every call to the wrapped port.
pub struct Bounded<P> {
    inner: P,
    limit: Duration,
}

impl<P> Bounded<P> {
    pub fn new(inner: P, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<P: VariantGenerator> VariantGenerator for Bounded<P> {
    async fn generate(&self, role: &str, task_context: &str) -> Result<Vec<Variant>> {
        match timeout(self.limit, self.inner.generate(role, task_context)).await {
            Ok(result) => result,
            Err(_) => Err(DesignerError::PortFailure(format!(
                "generator timed out after {}ms",
                self.limit.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl<P: Evaluator> Evaluator for Bounded<P> {
    async fn evaluate(&self, variant: &Variant) -> Result<Evaluation> {
        match timeout(self.limit, self.inner.evaluate(variant)).await {
            Ok(result) => result,
            Err(_) => Err(DesignerError::PortFailure(format!(
                "evaluator timed out after {}ms",
                self.limit.as_millis()
            ))),
        }
    }
}
