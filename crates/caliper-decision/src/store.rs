//! # Decision Record Store
//!
//! Owns every `HiringDecision` and enforces the rules that protect them:
//! duplicate gating per application, finality, and serialized finalization.
//!
//! ## Two-Phase Creation
//!
//! The orchestrator must make a decision and its `DecisionCreated` audit
//! record observable together. `stage()` validates and reserves the
//! decision invisibly; after the audit append succeeds, `commit_staged()`
//! flips it visible (an infallible map move), and on append failure
//! `abort_staged()` drops it — readers never see either half alone.
//!
//! ## Serialized Finalization
//!
//! `finalize()` runs under the store's write lock: of two concurrent
//! finalizes, the first wins and the second observes the already-final
//! state — success when its requested outcome matches, `Conflict` when it
//! does not.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use caliper_core::{ActorId, ApplicationId, AuthorityLevel, DecisionId, DecisionType, Timestamp};

use crate::decision::{AppealOutcome, DecisionConfidence, DecisionState, HiringDecision};
use crate::error::WorkflowError;

/// The outcome a new decision is created with.
#[derive(Debug, Clone)]
pub enum NewDecisionOutcome {
    /// Approved; final immediately.
    Approval,
    /// Rejected; appealable for the given window.
    Rejection {
        /// Days from creation until the appeals deadline.
        appeal_window_days: u32,
    },
    /// A delegation successor awaiting its approver.
    Pending,
}

/// Input for creating a decision. The store assigns the id and stamps
/// `created_at`/`effective_date` when unset.
#[derive(Debug, Clone)]
pub struct NewDecision {
    /// The application being decided.
    pub application_id: ApplicationId,
    /// The outcome to create the decision in.
    pub outcome: NewDecisionOutcome,
    /// Short reason category.
    pub decision_reason: String,
    /// Free-form rationale.
    pub decision_rationale: String,
    /// Approver confidence.
    pub confidence: DecisionConfidence,
    /// The responsible approver.
    pub approver: ActorId,
    /// The approver's authority level at decision time.
    pub authority_level: AuthorityLevel,
    /// When the decision takes effect; defaults to `created_at`.
    pub effective_date: Option<Timestamp>,
    /// Event time override; defaults to the creation instant.
    pub created_at: Option<Timestamp>,
    /// The delegated decision this one succeeds.
    pub delegated_from: Option<DecisionId>,
}

/// How a pending delegation successor is concluded.
#[derive(Debug, Clone)]
pub struct PendingConclusion {
    /// `Approval` or `Rejection` — a pending conclusion cannot stay
    /// pending.
    pub outcome: NewDecisionOutcome,
    /// Short reason category.
    pub decision_reason: String,
    /// Free-form rationale.
    pub decision_rationale: String,
    /// Approver confidence.
    pub confidence: DecisionConfidence,
    /// When the decision takes effect; defaults to `concluded_at`.
    pub effective_date: Option<Timestamp>,
    /// The conclusion instant; anchors a rejection's appeal window.
    pub concluded_at: Timestamp,
}

impl PendingConclusion {
    /// The decision as it will read once concluded. Pure: the orchestrator
    /// snapshots this for the audit append that precedes the mutation, and
    /// the store applies the identical transform.
    pub fn applied_to(&self, decision: &HiringDecision) -> Result<HiringDecision, WorkflowError> {
        if decision.state != DecisionState::Pending {
            return Err(WorkflowError::Validation(format!(
                "decision in state {} is not pending",
                decision.state
            )));
        }
        let (state, is_final) = match self.outcome {
            NewDecisionOutcome::Approval => (DecisionState::Approved, true),
            NewDecisionOutcome::Rejection { appeal_window_days } => (
                DecisionState::Rejected {
                    appeals_deadline: self.concluded_at.plus_days(appeal_window_days),
                },
                false,
            ),
            NewDecisionOutcome::Pending => {
                return Err(WorkflowError::Validation(
                    "a pending decision cannot be concluded as pending".to_string(),
                ))
            }
        };
        let mut updated = decision.clone();
        updated.state = state;
        updated.is_final = is_final;
        updated.decision_reason = self.decision_reason.clone();
        updated.decision_rationale = self.decision_rationale.clone();
        updated.confidence = self.confidence;
        updated.effective_date = self.effective_date.unwrap_or(self.concluded_at);
        Ok(updated)
    }
}

#[derive(Default)]
struct Inner {
    decisions: BTreeMap<DecisionId, HiringDecision>,
    by_application: BTreeMap<ApplicationId, Vec<DecisionId>>,
    staged: BTreeMap<DecisionId, HiringDecision>,
}

/// The authoritative in-memory decision store — single writer per record,
/// readers see only committed state.
#[derive(Default)]
pub struct DecisionStore {
    inner: RwLock<Inner>,
    guards: Mutex<BTreeMap<DecisionId, Arc<Mutex<()>>>>,
}

impl DecisionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and reserve a new decision without making it visible.
    ///
    /// # Errors
    ///
    /// `DuplicateDecision` if the application already has a concluded
    /// final decision (delegations and overturned appeals do not block a
    /// fresh decision), or another creation for it is in flight.
    pub fn stage(&self, new: NewDecision) -> Result<HiringDecision, WorkflowError> {
        let mut inner = self.write();
        if Self::has_blocking_decision(&inner, &new.application_id) {
            return Err(WorkflowError::DuplicateDecision {
                application_id: new.application_id,
            });
        }

        let created_at = new.created_at.unwrap_or_else(Timestamp::now);
        let (state, is_final) = match new.outcome {
            NewDecisionOutcome::Approval => (DecisionState::Approved, true),
            NewDecisionOutcome::Rejection { appeal_window_days } => (
                DecisionState::Rejected {
                    appeals_deadline: created_at.plus_days(appeal_window_days),
                },
                false,
            ),
            NewDecisionOutcome::Pending => (DecisionState::Pending, false),
        };
        let decision = HiringDecision {
            id: DecisionId::new(),
            application_id: new.application_id,
            state,
            decision_reason: new.decision_reason,
            decision_rationale: new.decision_rationale,
            confidence: new.confidence,
            approver: new.approver,
            authority_level: new.authority_level,
            created_at,
            effective_date: new.effective_date.unwrap_or(created_at),
            is_final,
            delegated_from: new.delegated_from,
        };
        inner.staged.insert(decision.id, decision.clone());
        Ok(decision)
    }

    /// Make a staged decision visible. Infallible once the id exists.
    pub fn commit_staged(&self, id: &DecisionId) -> Result<HiringDecision, WorkflowError> {
        let mut inner = self.write();
        let decision = inner
            .staged
            .remove(id)
            .ok_or_else(|| WorkflowError::NotFound(format!("staged decision {id}")))?;
        inner
            .by_application
            .entry(decision.application_id)
            .or_default()
            .push(decision.id);
        inner.decisions.insert(decision.id, decision.clone());
        Ok(decision)
    }

    /// Drop a staged decision. Absent ids are ignored — aborting twice is
    /// harmless.
    pub fn abort_staged(&self, id: &DecisionId) {
        self.write().staged.remove(id);
    }

    /// Stage and commit in one step, for callers outside the orchestrated
    /// unit of work.
    pub fn create(&self, new: NewDecision) -> Result<HiringDecision, WorkflowError> {
        let staged = self.stage(new)?;
        self.commit_staged(&staged.id)
    }

    /// Fetch one decision.
    pub fn get(&self, id: &DecisionId) -> Result<HiringDecision, WorkflowError> {
        self.read()
            .decisions
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("decision {id}")))
    }

    /// All decisions for an application, newest first (history view).
    pub fn list_by_application(&self, application_id: &ApplicationId) -> Vec<HiringDecision> {
        let inner = self.read();
        let mut decisions: Vec<HiringDecision> = inner
            .by_application
            .get(application_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.decisions.get(id).cloned())
            .collect();
        decisions.sort_by_key(|d| d.created_at);
        decisions.reverse();
        decisions
    }

    /// Set a decision final.
    ///
    /// Idempotent: finalizing an already-final decision succeeds when the
    /// requested outcome matches the final state, and fails with
    /// `Conflict` when it does not. Pending, delegated, and under-appeal
    /// decisions cannot be finalized directly.
    pub fn finalize(
        &self,
        id: &DecisionId,
        expected: DecisionType,
    ) -> Result<HiringDecision, WorkflowError> {
        let mut inner = self.write();
        let decision = inner
            .decisions
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound(format!("decision {id}")))?;

        if decision.is_final {
            return if decision.state.decision_type() == Some(expected) {
                Ok(decision.clone())
            } else {
                Err(WorkflowError::Conflict {
                    decision_id: *id,
                    detail: format!(
                        "finalized as {} but {} was requested",
                        decision.state, expected
                    ),
                })
            };
        }

        match &decision.state {
            DecisionState::Approved | DecisionState::Rejected { .. } => {
                decision.is_final = true;
                Ok(decision.clone())
            }
            other => Err(WorkflowError::Validation(format!(
                "decision {id} in state {other} cannot be finalized"
            ))),
        }
    }

    /// Mark a decision delegated to the given successor.
    pub fn apply_delegation(
        &self,
        id: &DecisionId,
        successor: DecisionId,
    ) -> Result<HiringDecision, WorkflowError> {
        self.mutate(id, |decision| match &decision.state {
            DecisionState::Pending | DecisionState::Rejected { .. } => {
                decision.state = DecisionState::Delegated { successor };
                Ok(())
            }
            other => Err(WorkflowError::Validation(format!(
                "decision in state {other} cannot be delegated"
            ))),
        })
    }

    /// Mark a rejected decision appealed.
    pub fn apply_appeal(&self, id: &DecisionId) -> Result<HiringDecision, WorkflowError> {
        self.mutate(id, |decision| match &decision.state {
            DecisionState::Rejected { .. } => {
                decision.state = DecisionState::Appealed;
                Ok(())
            }
            other => Err(WorkflowError::Validation(format!(
                "decision in state {other} cannot be appealed"
            ))),
        })
    }

    /// Conclude an appeal; the decision becomes final.
    pub fn apply_appeal_review(
        &self,
        id: &DecisionId,
        outcome: AppealOutcome,
    ) -> Result<HiringDecision, WorkflowError> {
        self.mutate(id, |decision| match &decision.state {
            DecisionState::Appealed => {
                decision.state = DecisionState::AppealReviewed { outcome };
                decision.is_final = true;
                Ok(())
            }
            other => Err(WorkflowError::Validation(format!(
                "decision in state {other} has no appeal to review"
            ))),
        })
    }

    /// Conclude a pending delegation successor.
    pub fn conclude_pending(
        &self,
        id: &DecisionId,
        conclusion: PendingConclusion,
    ) -> Result<HiringDecision, WorkflowError> {
        self.mutate(id, |decision| {
            *decision = conclusion.applied_to(decision)?;
            Ok(())
        })
    }

    /// The committed pending successor for this application assigned to
    /// the given approver, if one exists.
    pub fn pending_for_approver(
        &self,
        application_id: &ApplicationId,
        approver: &ActorId,
    ) -> Option<HiringDecision> {
        let inner = self.read();
        inner
            .by_application
            .get(application_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.decisions.get(id))
            .find(|d| d.state == DecisionState::Pending && d.approver == *approver)
            .cloned()
    }

    /// Rejections whose appeal window has lapsed without action.
    pub fn lapsed_rejections(&self, now: Timestamp) -> Vec<DecisionId> {
        self.read()
            .decisions
            .values()
            .filter(|d| d.appeal_window_lapsed(now))
            .map(|d| d.id)
            .collect()
    }

    /// Snapshot of every committed decision, for report rollups.
    pub fn decisions(&self) -> Vec<HiringDecision> {
        self.read().decisions.values().cloned().collect()
    }

    /// Whether the application already carries a decision that blocks a
    /// new one (or has a creation in flight).
    pub fn has_blocking_final(&self, application_id: &ApplicationId) -> bool {
        Self::has_blocking_decision(&self.read(), application_id)
    }

    /// The per-decision mutation guard the orchestrator holds across a
    /// mutate-plus-append unit of work, serializing writers per decision.
    pub fn mutation_guard(&self, id: &DecisionId) -> Arc<Mutex<()>> {
        let mut guards = self
            .guards
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(guards.entry(*id).or_default())
    }

    fn mutate(
        &self,
        id: &DecisionId,
        f: impl FnOnce(&mut HiringDecision) -> Result<(), WorkflowError>,
    ) -> Result<HiringDecision, WorkflowError> {
        let mut inner = self.write();
        let decision = inner
            .decisions
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound(format!("decision {id}")))?;
        if decision.is_final {
            return Err(WorkflowError::Conflict {
                decision_id: *id,
                detail: "final decisions do not change".to_string(),
            });
        }
        f(decision)?;
        Ok(decision.clone())
    }

    fn has_blocking_decision(inner: &Inner, application_id: &ApplicationId) -> bool {
        let committed_blocks = inner
            .by_application
            .get(application_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.decisions.get(id))
            .any(|d| {
                d.is_final
                    && d.state.decision_type() != Some(DecisionType::Delegated)
                    && d.state
                        != DecisionState::AppealReviewed {
                            outcome: AppealOutcome::Overturned,
                        }
            });
        let staged_in_flight = inner
            .staged
            .values()
            .any(|d| d.application_id == *application_id);
        committed_blocks || staged_in_flight
    }

    // A poisoned lock means a panic elsewhere mid-access; the maps stay
    // structurally valid, so continue with the inner value.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
