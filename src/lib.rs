pub mod config;
pub mod error;
pub mod report;
pub mod core {
    pub mod controller;
    pub mod model;
    pub mod session;
}
pub mod ai {
    pub mod agents;
    pub mod client;
    pub mod heuristic;
    pub mod ports;
    pub mod prompts;
    pub mod schema_utils;
    pub mod template;
}

pub use crate::core::controller::{Outcome, Pending, WorkflowController};
pub use crate::core::model::{Evaluation, EvaluationStatus, Variant};
pub use crate::core::session::{Phase, SessionSnapshot};
pub use crate::error::{DesignerError, Result};
