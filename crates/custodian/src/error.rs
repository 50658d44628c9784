//! Engine error types.
//!
//! An `EngineError` means no decision was reached. Callers must report it
//! as a failure, never as a denial.

use std::time::Duration;

use custodian_rbac::RbacError;
use custodian_store::StoreError;
use custodian_types::InvalidInput;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was rejected before any gate ran.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// A policy store failed. The decision fails closed.
    #[error("policy store unavailable: {0}")]
    StoreUnavailable(String),

    /// The caller cancelled the evaluation.
    #[error("evaluation cancelled")]
    Cancelled,

    /// A stage exceeded the store timeout.
    #[error("{stage} timed out after {timeout:?}")]
    TimedOut {
        stage: &'static str,
        timeout: Duration,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => EngineError::StoreUnavailable(msg),
            // Only mutations of missing rows report NotFound; the engine issues none.
            not_found @ StoreError::NotFound { .. } => {
                EngineError::StoreUnavailable(not_found.to_string())
            }
        }
    }
}

impl From<RbacError> for EngineError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::InvalidInput(e) => EngineError::InvalidInput(e),
            RbacError::Store(e) => e.into(),
        }
    }
}
