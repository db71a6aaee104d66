use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopgraphError {
    // Definition errors
    #[error("Invalid graph definition: {0}")]
    Validation(String),

    // Lookup errors
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    // Run errors
    #[error("Step failed at node '{node}': {cause}")]
    StepExecution { node: String, cause: String },

    #[error("Step limit exceeded ({0} steps); check the loop condition and back_to target")]
    StepLimitExceeded(usize),

    #[error("Step input error: {0}")]
    StepInput(String),

    #[error("Invalid run input: {0}")]
    InvalidInput(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoopgraphError {
    /// Unknown graph id or run id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GraphNotFound(_) | Self::RunNotFound(_))
    }

    /// Errors caused by what the caller sent or declared, as opposed to
    /// failures inside the host process.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::StepExecution { .. }
                | Self::StepLimitExceeded(_)
                | Self::StepInput(_)
                | Self::InvalidInput(_)
                | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LoopgraphError>;
