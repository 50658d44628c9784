//! Input validation errors.

use thiserror::Error;

/// A request or record field that failed validation before any evaluation ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("unknown action '{0}': expected one of view, edit, share, delete")]
    UnknownAction(String),

    #[error("unknown security level '{0}': expected PUBLIC, INTERNAL or CONFIDENTIAL")]
    UnknownSecurityLevel(String),

    #[error("invalid permission name '{name}': {reason}")]
    PermissionName { name: String, reason: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{0}")]
    Other(String),
}
