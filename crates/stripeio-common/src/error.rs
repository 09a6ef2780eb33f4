//! Error types for StripeIO
//!
//! This module defines the common error types used throughout the system.

use thiserror::Error;

/// Common result type for StripeIO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for StripeIO
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data corruption detected in fragment {index}")]
    DataCorruption { index: usize },

    // Erasure coding errors
    #[error("insufficient fragments for reconstruction: have {available}, need {required}")]
    InsufficientFragments { available: usize, required: usize },

    #[error("erasure coding error: {0}")]
    ErasureCoding(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
