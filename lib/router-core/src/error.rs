use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The topology breaks a contract that admission is supposed to enforce
    #[error("Invalid topology: {0}")]
    InvariantViolation(String),

    #[error("Unknown backend kind: {0}")]
    UnknownBackend(String),

    #[error("Invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A gated-in object has no routing rule to render
    #[error("No routing rule {0} for this topology")]
    MissingRule(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
