use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutofillError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Attach failed: {0}")]
    Attach(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AutofillError>;
