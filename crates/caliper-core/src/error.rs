//! # Error Types — Shared Error Hierarchy
//!
//! Errors for the foundational layer. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations. Domain-specific
//! taxonomies (workflow, ledger) live in their own crates and wrap these
//! where a core operation can fail underneath them.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A field failed validation at construction.
    #[error("validation error: {0}")]
    Validation(String),

    /// A timestamp could not be parsed or normalized.
    #[error("timestamp error: {0}")]
    Timestamp(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Confidence scores and counts must be integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
