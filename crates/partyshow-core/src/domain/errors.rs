//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures raised by the newtype constructors.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// File name is empty or not a single path component
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Invalid remote folder path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid change cursor
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
