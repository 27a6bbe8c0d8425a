use super::model::{Evaluation, Variant};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Generating,
    Ready,
    Testing,
    Tested,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Generating => "generating",
            Phase::Ready => "ready",
            Phase::Testing => "testing",
            Phase::Tested => "tested",
        };
        f.write_str(label)
    }
}

/// Identifies the variant a dispatched test was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestTicket {
    pub batch: u64,
    pub variant_id: String,
}

/// Mutable session owned by the workflow controller.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub role: String,
    pub task_context: String,
    pub variants: Vec<Variant>,
    pub selected_variant_id: Option<String>,
    pub evaluation: Option<Evaluation>,
    pub phase: Phase,
    /// Bumped every time a generated batch replaces `variants`.
    pub batch: u64,
    pub generate_in_flight: bool,
    pub test_in_flight: Option<TestTicket>,
}

impl SessionState {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            task_context: String::new(),
            variants: Vec::new(),
            selected_variant_id: None,
            evaluation: None,
            phase: Phase::Idle,
            batch: 0,
            generate_in_flight: false,
            test_in_flight: None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.variants.iter().any(|v| v.id == id)
    }

    pub fn selected(&self) -> Option<&Variant> {
        let id = self.selected_variant_id.as_deref()?;
        self.variants.iter().find(|v| v.id == id)
    }

    /// The ticket a test dispatched right now would carry.
    pub fn current_ticket(&self) -> Option<TestTicket> {
        self.selected_variant_id.as_ref().map(|id| TestTicket {
            batch: self.batch,
            variant_id: id.clone(),
        })
    }

    /// Phase to fall back to when no result is being shown.
    pub fn stable_phase(&self) -> Phase {
        if self.variants.is_empty() { Phase::Idle } else { Phase::Ready }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            role: self.role.clone(),
            task_context: self.task_context.clone(),
            variants: self.variants.clone(),
            selected_variant_id: self.selected_variant_id.clone(),
            evaluation: self.evaluation.clone(),
            phase: self.phase,
        }
    }
}

/// Read-only view handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub role: String,
    pub task_context: String,
    pub variants: Vec<Variant>,
    pub selected_variant_id: Option<String>,
    pub evaluation: Option<Evaluation>,
    pub phase: Phase,
}

impl SessionSnapshot {
    pub fn selected_variant(&self) -> Option<&Variant> {
        let id = self.selected_variant_id.as_deref()?;
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Generating | Phase::Testing)
    }
}
