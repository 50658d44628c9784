//! CLI command implementations.

pub mod config;
pub mod decide;
pub mod fixture;
pub mod rules;
