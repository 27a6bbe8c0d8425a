use thiserror::Error;

#[derive(Error, Debug)]
pub enum DesignerError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Port Failure: {0}")]
    PortFailure(String),

    #[error("Generator returned no variants")]
    EmptyGenerationResult,

    #[error("API Error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config Error: {0}")]
    Config(String),
}

impl DesignerError {
    /// True for every error that originated in a Generator or Evaluator port.
    pub fn is_port_failure(&self) -> bool {
        matches!(
            self,
            Self::PortFailure(_) | Self::EmptyGenerationResult | Self::Api(_) | Self::Json(_)
        )
    }

    /// Normalises an adapter error into the kind the controller reports.
    pub fn into_port_failure(self) -> Self {
        match self {
            e @ (Self::PortFailure(_) | Self::EmptyGenerationResult) => e,
            other => Self::PortFailure(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DesignerError>;
