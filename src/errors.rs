use thiserror::Error;
use uuid::Uuid;

/// Error type that captures engine and storage failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid frequency configuration: {0}")]
    InvalidFrequencyConfig(String),
    #[error("rule {0} is inactive")]
    RuleInactive(Uuid),
    #[error("rule {0} not found")]
    RuleNotFound(Uuid),
    #[error("installment amount error: {0}")]
    AmountComputation(String),
    #[error("rule {0} has a processing claim in flight")]
    ClaimRejected(Uuid),
    #[error("storage timeout: {0}")]
    StorageTimeout(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Transient failures are left for the next scheduled sweep; the
    /// engine never retries them within the same run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::StorageTimeout(_) | EngineError::Storage(_) | EngineError::Io(_)
        )
    }

    /// Data errors that will not resolve on their own and should reach
    /// an operator instead of being silently retried.
    pub fn needs_alert(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidFrequencyConfig(_) | EngineError::AmountComputation(_)
        )
    }
}
