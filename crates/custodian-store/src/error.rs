//! Store error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A mutation targeted a record that does not exist.
    ///
    /// Lookups report absence as `Ok(None)` instead.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Transient infrastructure failure. Never converted into a decision.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
