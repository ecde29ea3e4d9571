//! # Authority Validation
//!
//! The seam to the external authority table and the predicate the
//! orchestrator gates every submission through.
//!
//! ## Contract
//!
//! A recognized actor lacking authority is an answer (`Ok(false)`), not an
//! error. Errors are reserved for actors the table cannot resolve and for
//! the table being unreachable. The predicate is pure: repeated calls for
//! the same `(actor, decision type)` within one workflow invocation are
//! idempotent and side-effect-free.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use caliper_core::{ActorId, AuthorityLevel, DecisionType};

/// Failures answering an authority question.
#[derive(Error, Debug)]
pub enum AuthorityError {
    /// The authority table is unreachable or failed to answer.
    #[error("authority lookup failed: {0}")]
    Lookup(String),

    /// The actor is not present in the authority table at all.
    #[error("actor {0} is not present in the authority directory")]
    UnknownActor(ActorId),
}

/// The external authority table: who holds which level.
///
/// Implementations must be side-effect-free; the validator may consult
/// them repeatedly within one workflow invocation.
pub trait AuthorityDirectory: Send + Sync {
    /// The actor's authority level, or `None` when the actor cannot be
    /// resolved.
    ///
    /// # Errors
    ///
    /// Only for the table being unreachable — an unknown actor is `None`,
    /// not an error, so the validator can distinguish the two.
    fn authority_of(&self, actor_id: &ActorId) -> Result<Option<AuthorityLevel>, AuthorityError>;
}

/// In-memory authority directory for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct StaticAuthorityDirectory {
    levels: BTreeMap<ActorId, AuthorityLevel>,
}

impl StaticAuthorityDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor at the given level.
    pub fn with_actor(mut self, actor_id: ActorId, level: AuthorityLevel) -> Self {
        self.levels.insert(actor_id, level);
        self
    }
}

impl AuthorityDirectory for StaticAuthorityDirectory {
    fn authority_of(&self, actor_id: &ActorId) -> Result<Option<AuthorityLevel>, AuthorityError> {
        Ok(self.levels.get(actor_id).copied())
    }
}

/// The authority predicate over a directory.
#[derive(Clone)]
pub struct AuthorityValidator {
    directory: Arc<dyn AuthorityDirectory>,
}

impl AuthorityValidator {
    /// A validator over the given directory.
    pub fn new(directory: Arc<dyn AuthorityDirectory>) -> Self {
        Self { directory }
    }

    /// Whether the actor may submit the given decision type.
    ///
    /// `Ok(false)` for a recognized actor lacking authority.
    ///
    /// # Errors
    ///
    /// `AuthorityError::UnknownActor` when the actor cannot be resolved,
    /// `AuthorityError::Lookup` when the table is unreachable.
    pub fn validate(
        &self,
        actor_id: &ActorId,
        decision_type: DecisionType,
    ) -> Result<bool, AuthorityError> {
        Ok(self.level_of(actor_id)?.permits(decision_type))
    }

    /// The actor's authority level.
    pub fn level_of(&self, actor_id: &ActorId) -> Result<AuthorityLevel, AuthorityError> {
        self.directory
            .authority_of(actor_id)?
            .ok_or(AuthorityError::UnknownActor(*actor_id))
    }

    /// Whether the actor may review appeals.
    pub fn may_review_appeals(&self, actor_id: &ActorId) -> Result<bool, AuthorityError> {
        Ok(self.level_of(actor_id)?.may_review_appeals())
    }
}

impl std::fmt::Debug for AuthorityValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator_with(level: AuthorityLevel) -> (AuthorityValidator, ActorId) {
        let actor = ActorId::new();
        let directory = StaticAuthorityDirectory::new().with_actor(actor, level);
        (AuthorityValidator::new(Arc::new(directory)), actor)
    }

    #[test]
    fn test_sufficient_authority_validates() {
        let (validator, actor) = validator_with(AuthorityLevel::SeniorManager);
        assert!(validator.validate(&actor, DecisionType::Approved).unwrap());
    }

    #[test]
    fn test_insufficient_authority_is_false_not_error() {
        let (validator, actor) = validator_with(AuthorityLevel::Manager);
        assert!(!validator.validate(&actor, DecisionType::Approved).unwrap());
        assert!(validator.validate(&actor, DecisionType::Delegated).unwrap());
    }

    #[test]
    fn test_unknown_actor_is_error() {
        let (validator, _actor) = validator_with(AuthorityLevel::Admin);
        let err = validator
            .validate(&ActorId::new(), DecisionType::Approved)
            .unwrap_err();
        assert!(matches!(err, AuthorityError::UnknownActor(_)));
    }

    #[test]
    fn test_unreachable_table_is_error() {
        struct DownDirectory;
        impl AuthorityDirectory for DownDirectory {
            fn authority_of(
                &self,
                _actor_id: &ActorId,
            ) -> Result<Option<AuthorityLevel>, AuthorityError> {
                Err(AuthorityError::Lookup("connection refused".to_string()))
            }
        }
        let validator = AuthorityValidator::new(Arc::new(DownDirectory));
        let err = validator
            .validate(&ActorId::new(), DecisionType::Rejected)
            .unwrap_err();
        assert!(matches!(err, AuthorityError::Lookup(_)));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let (validator, actor) = validator_with(AuthorityLevel::RegionalManager);
        for _ in 0..3 {
            assert!(validator.validate(&actor, DecisionType::Rejected).unwrap());
        }
    }

    #[test]
    fn test_appeal_review_gate() {
        let (validator, senior) = validator_with(AuthorityLevel::SeniorManager);
        assert!(!validator.may_review_appeals(&senior).unwrap());
        let (validator, regional) = validator_with(AuthorityLevel::RegionalManager);
        assert!(validator.may_review_appeals(&regional).unwrap());
    }
}
