//! # Service Result Envelope
//!
//! Every service operation returns the same shape: `success` plus either
//! `data` or an `error` carrying a stable machine-readable code and a
//! human-readable message. Transport layers serialize the envelope as-is;
//! programmatic callers unwrap it back into a `Result`.

use serde::Serialize;

use caliper_decision::WorkflowError;

/// A failure as reported across the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceError {
    /// Stable machine-readable code, e.g. `INSUFFICIENT_AUTHORITY`.
    pub code: String,
    /// Human-readable description of the failure.
    pub message: String,
    /// Whether retrying the same call with the same intent may succeed.
    pub retryable: bool,
}

impl From<WorkflowError> for ServiceError {
    fn from(e: WorkflowError) -> Self {
        Self {
            code: e.error_code().to_string(),
            message: e.to_string(),
            retryable: e.is_retryable(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// The uniform `{success, data | error}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResult<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The payload, present exactly when `success` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// The failure, present exactly when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

impl<T> ServiceResult<T> {
    /// A successful result.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed result.
    pub fn err(error: impl Into<ServiceError>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Unwrap the envelope back into a `Result` for programmatic callers.
    pub fn into_result(self) -> Result<T, ServiceError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(ServiceError {
                code: "INTERNAL".to_string(),
                message: "service result carried neither data nor error".to_string(),
                retryable: false,
            }),
        }
    }
}

impl<T> From<Result<T, WorkflowError>> for ServiceResult<T> {
    fn from(result: Result<T, WorkflowError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e),
        }
    }
}
