//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
