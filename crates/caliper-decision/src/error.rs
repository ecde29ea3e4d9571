//! # Workflow Error Taxonomy
//!
//! One error type for the whole workflow surface, with a stable
//! machine-readable code per failure class. Authority and authentication
//! failures are terminal for the call; ledger failures are retryable with
//! the same intent because the orchestrator's units of work leave no
//! partial state behind.

use thiserror::Error;

use caliper_core::{ActorId, ApplicationId, DecisionId, DecisionType};
use caliper_ledger::LedgerError;

use crate::authority::AuthorityError;

/// Failures surfaced by the decision workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No actor could be resolved for the request.
    #[error("caller is not authenticated")]
    Unauthenticated,

    /// The actor's authority level does not permit the decision type.
    #[error("actor {actor} lacks authority for {decision_type} decisions")]
    InsufficientAuthority {
        /// The actor that was gated.
        actor: ActorId,
        /// The decision type that was refused.
        decision_type: DecisionType,
    },

    /// The application already has a concluded decision.
    #[error("application {application_id} already has a final decision")]
    DuplicateDecision {
        /// The application with the existing decision.
        application_id: ApplicationId,
    },

    /// A concurrent operation finalized the decision with a different
    /// outcome, or the requested change contradicts the final state.
    #[error("decision {decision_id} is final: {detail}")]
    Conflict {
        /// The decision in conflict.
        decision_id: DecisionId,
        /// What contradicted the final state.
        detail: String,
    },

    /// The audit ledger failed underneath the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The authority table could not answer for the actor.
    #[error(transparent)]
    AuthorityLookup(#[from] AuthorityError),

    /// Unknown decision, record, or application.
    #[error("not found: {0}")]
    NotFound(String),

    /// A request field failed validation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<caliper_core::CanonicalizationError> for WorkflowError {
    fn from(e: caliper_core::CanonicalizationError) -> Self {
        Self::Ledger(LedgerError::Canonicalization(e))
    }
}

impl WorkflowError {
    /// The stable code reported to callers alongside the message.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InsufficientAuthority { .. } => "INSUFFICIENT_AUTHORITY",
            Self::DuplicateDecision { .. } => "DUPLICATE_DECISION",
            Self::Conflict { .. } => "CONFLICT",
            Self::Ledger(LedgerError::Read(_)) => "LEDGER_READ_FAILED",
            Self::Ledger(_) => "LEDGER_WRITE_FAILED",
            Self::AuthorityLookup(_) => "AUTHORITY_LOOKUP_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_FAILED",
        }
    }

    /// Whether the caller may retry the operation with the same intent.
    ///
    /// Only storage-layer failures qualify; authority and authentication
    /// failures are terminal for the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ledger(_) | Self::AuthorityLookup(AuthorityError::Lookup(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_codes() {
        assert_eq!(WorkflowError::Unauthenticated.error_code(), "UNAUTHENTICATED");
        assert_eq!(
            WorkflowError::InsufficientAuthority {
                actor: ActorId::new(),
                decision_type: DecisionType::Approved,
            }
            .error_code(),
            "INSUFFICIENT_AUTHORITY"
        );
        assert_eq!(
            WorkflowError::Ledger(LedgerError::Write("disk".into())).error_code(),
            "LEDGER_WRITE_FAILED"
        );
        assert_eq!(
            WorkflowError::Validation("bad field".into()).error_code(),
            "VALIDATION_FAILED"
        );
    }

    #[test]
    fn test_retryability_policy() {
        assert!(WorkflowError::Ledger(LedgerError::Write("disk".into())).is_retryable());
        assert!(!WorkflowError::Unauthenticated.is_retryable());
        assert!(!WorkflowError::InsufficientAuthority {
            actor: ActorId::new(),
            decision_type: DecisionType::Rejected,
        }
        .is_retryable());
    }
}
