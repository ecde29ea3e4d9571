//! # Decision Workflow Orchestrator
//!
//! The façade callers use. Every operation follows the same shape:
//! authenticate, gate authority, then perform the decision mutation and
//! its audit append as one unit of work.
//!
//! ## Unit of Work
//!
//! Creation: stage the decision invisibly, append `DecisionCreated`,
//! commit. Mutation: under the decision's mutation guard, append the event
//! record first (the pending-marker convention), then apply the mutation —
//! the guard keeps the validated state from shifting between the two, so
//! the apply step cannot fail and the trail never references a state
//! change that did not happen. A ledger failure aborts the whole unit;
//! retrying the same intent is safe.
//!
//! Authority and authentication failures happen before any of that — a
//! gated request appends nothing and stages nothing.

use std::sync::Arc;

use caliper_core::{
    Actor, ActorId, ApplicationId, DecisionId, DecisionType, Timestamp,
};
use caliper_ledger::record::{absent_state, snapshot};
use caliper_ledger::{AuditEventType, AuditLedger, NewAuditRecord};

use crate::authority::{AuthorityDirectory, AuthorityValidator};
use crate::decision::{AppealOutcome, DecisionConfidence, DecisionState, HiringDecision};
use crate::error::WorkflowError;
use crate::store::{DecisionStore, NewDecision, NewDecisionOutcome, PendingConclusion};

/// Process name of the appeal-window sweeper, the system principal that
/// finalizes lapsed rejections. Deployments recognize it in their
/// [`AnomalyConfig`].
///
/// [`AnomalyConfig`]: caliper_ledger::AnomalyConfig
pub const APPEAL_SWEEPER_PROCESS: &str = "appeal-window-sweeper";

/// Workflow tunables.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Days a rejection stays appealable.
    pub appeal_window_days: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            appeal_window_days: 30,
        }
    }
}

/// Per-request context produced by the authentication collaborator.
///
/// Carries the resolved actor and request metadata; request-scoped
/// controls such as deadlines thread through here.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The resolved caller, or `None` when unauthenticated.
    pub actor: Option<Actor>,
    /// Client IP of the originating request.
    pub client_ip: Option<String>,
}

impl RequestContext {
    /// A context for an authenticated caller.
    pub fn authenticated(actor: Actor) -> Self {
        Self {
            actor: Some(actor),
            client_ip: None,
        }
    }

    /// A context with no resolved caller.
    pub fn anonymous() -> Self {
        Self {
            actor: None,
            client_ip: None,
        }
    }

    /// Attach the originating client IP.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }
}

/// The profile-creation collaborator, signalled once per approval.
///
/// Retry semantics are the external system's responsibility; the engine
/// fires the signal and moves on.
pub trait ProfileNotifier: Send + Sync {
    /// An application was approved; a candidate profile should exist.
    fn profile_created(&self, application_id: &ApplicationId, decision_id: &DecisionId);
}

/// A notifier that drops the signal, for deployments without the
/// profile-creation collaborator wired up.
#[derive(Debug, Default)]
pub struct NullProfileNotifier;

impl ProfileNotifier for NullProfileNotifier {
    fn profile_created(&self, application_id: &ApplicationId, decision_id: &DecisionId) {
        tracing::debug!(
            application = %application_id,
            decision = %decision_id,
            "profile-creation signal dropped (no notifier configured)"
        );
    }
}

/// Fields of an approval submission.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Short reason category, e.g. `qualifications_met`.
    pub decision_reason: String,
    /// Free-form rationale.
    pub decision_rationale: String,
    /// Approver confidence, 1-10.
    pub confidence: DecisionConfidence,
    /// When the approval takes effect; defaults to the decision instant.
    pub effective_date: Option<Timestamp>,
}

/// Fields of a rejection submission.
#[derive(Debug, Clone)]
pub struct RejectionRequest {
    /// Short reason category, e.g. `experience_gap`.
    pub decision_reason: String,
    /// Free-form rationale.
    pub decision_rationale: String,
    /// Approver confidence, 1-10.
    pub confidence: DecisionConfidence,
    /// When the rejection takes effect; defaults to the decision instant.
    pub effective_date: Option<Timestamp>,
}

/// The decision workflow façade.
pub struct DecisionEngine {
    store: Arc<DecisionStore>,
    ledger: Arc<AuditLedger>,
    validator: AuthorityValidator,
    notifier: Arc<dyn ProfileNotifier>,
    config: WorkflowConfig,
}

impl DecisionEngine {
    /// An engine over the given store, ledger, and authority directory,
    /// with the profile signal dropped until a notifier is attached.
    pub fn new(
        store: Arc<DecisionStore>,
        ledger: Arc<AuditLedger>,
        directory: Arc<dyn AuthorityDirectory>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            validator: AuthorityValidator::new(directory),
            notifier: Arc::new(NullProfileNotifier),
            config,
        }
    }

    /// Attach the profile-creation collaborator.
    pub fn with_profile_notifier(mut self, notifier: Arc<dyn ProfileNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The decision store behind this engine.
    pub fn store(&self) -> &Arc<DecisionStore> {
        &self.store
    }

    /// The audit ledger behind this engine.
    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    /// The authority validator behind this engine.
    pub fn validator(&self) -> &AuthorityValidator {
        &self.validator
    }

    /// Submit an approval for an application.
    ///
    /// Approvals are final immediately — there is no appeal path. On
    /// success the profile-creation collaborator is signalled.
    pub fn submit_approval(
        &self,
        ctx: &RequestContext,
        application_id: ApplicationId,
        request: ApprovalRequest,
    ) -> Result<HiringDecision, WorkflowError> {
        let decision = self.submit_concluded(
            ctx,
            application_id,
            DecisionType::Approved,
            NewDecisionOutcome::Approval,
            request.decision_reason,
            request.decision_rationale,
            request.confidence,
            request.effective_date,
        )?;
        self.notifier.profile_created(&application_id, &decision.id);
        tracing::info!(
            application = %application_id,
            decision = %decision.id,
            "application approved"
        );
        Ok(decision)
    }

    /// Submit a rejection for an application.
    ///
    /// Rejections stay appealable until `created_at` plus the configured
    /// appeal window; they become final when the window lapses without an
    /// appeal or when an appeal is reviewed.
    pub fn submit_rejection(
        &self,
        ctx: &RequestContext,
        application_id: ApplicationId,
        request: RejectionRequest,
    ) -> Result<HiringDecision, WorkflowError> {
        let decision = self.submit_concluded(
            ctx,
            application_id,
            DecisionType::Rejected,
            NewDecisionOutcome::Rejection {
                appeal_window_days: self.config.appeal_window_days,
            },
            request.decision_reason,
            request.decision_rationale,
            request.confidence,
            request.effective_date,
        )?;
        tracing::info!(
            application = %application_id,
            decision = %decision.id,
            "application rejected"
        );
        Ok(decision)
    }

    /// Hand a decision to a different approver.
    ///
    /// Only the original approver may delegate, their authority must still
    /// cover delegation, and the decision must not be final. Spawns a
    /// pending successor under the new approver and marks the original
    /// `Delegated` referencing it.
    pub fn delegate(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        to_actor: ActorId,
        reason: impl Into<String>,
    ) -> Result<HiringDecision, WorkflowError> {
        let reason = reason.into();
        let (actor_id, actor) = self.require_human(ctx)?;
        self.gate(&actor_id, DecisionType::Delegated)?;
        let successor_level = self
            .validator
            .level_of(&to_actor)
            .map_err(WorkflowError::AuthorityLookup)?;

        let guard = self.store.mutation_guard(&decision_id);
        let _held = guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let original = self.store.get(&decision_id)?;
        if original.is_final {
            return Err(WorkflowError::Conflict {
                decision_id,
                detail: "final decisions cannot be delegated".to_string(),
            });
        }
        if original.approver != actor_id {
            return Err(WorkflowError::InsufficientAuthority {
                actor: actor_id,
                decision_type: DecisionType::Delegated,
            });
        }
        if let Some(decision_type) = original.decision_type() {
            if decision_type != DecisionType::Delegated {
                self.gate(&actor_id, decision_type)?;
            }
        }

        let staged = self.store.stage(NewDecision {
            application_id: original.application_id,
            outcome: NewDecisionOutcome::Pending,
            decision_reason: reason.clone(),
            decision_rationale: String::new(),
            confidence: original.confidence,
            approver: to_actor,
            authority_level: successor_level,
            effective_date: None,
            created_at: None,
            delegated_from: Some(original.id),
        })?;

        let mut updated = original.clone();
        updated.state = DecisionState::Delegated {
            successor: staged.id,
        };
        let record = self.event_record(
            ctx,
            decision_id,
            AuditEventType::DecisionDelegated,
            actor,
            &reason,
            &original,
            &updated,
        )?;
        if let Err(e) = self.ledger.append(record) {
            self.store.abort_staged(&staged.id);
            return Err(e.into());
        }
        self.store.commit_staged(&staged.id)?;
        let updated = self.store.apply_delegation(&decision_id, staged.id)?;
        tracing::info!(
            decision = %decision_id,
            successor = %staged.id,
            to = %to_actor,
            "decision delegated"
        );
        Ok(updated)
    }

    /// Appeal a rejection before its deadline.
    ///
    /// Any authenticated caller may appeal — candidates are not in the
    /// authority table.
    pub fn appeal(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        reason: impl Into<String>,
    ) -> Result<HiringDecision, WorkflowError> {
        let reason = reason.into();
        let (_, actor) = self.require_human(ctx)?;

        let guard = self.store.mutation_guard(&decision_id);
        let _held = guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let decision = self.store.get(&decision_id)?;
        let deadline = match (&decision.state, decision.is_final) {
            (DecisionState::Rejected { appeals_deadline }, false) => *appeals_deadline,
            _ => {
                return Err(WorkflowError::Validation(format!(
                    "decision in state {} is not appealable",
                    decision.state
                )))
            }
        };
        if Timestamp::now() > deadline {
            return Err(WorkflowError::Validation(format!(
                "appeal window closed at {deadline}"
            )));
        }

        let mut updated = decision.clone();
        updated.state = DecisionState::Appealed;
        let record = self.event_record(
            ctx,
            decision_id,
            AuditEventType::DecisionAppealed,
            actor,
            &reason,
            &decision,
            &updated,
        )?;
        self.ledger.append(record)?;
        let updated = self.store.apply_appeal(&decision_id)?;
        tracing::info!(decision = %decision_id, "rejection appealed");
        Ok(updated)
    }

    /// Review an appeal to a terminal outcome.
    ///
    /// Requires appeal-review authority. The decision becomes final; an
    /// overturned rejection frees the application for a fresh decision.
    pub fn review_appeal(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        outcome: AppealOutcome,
        reason: impl Into<String>,
    ) -> Result<HiringDecision, WorkflowError> {
        let reason = reason.into();
        let (actor_id, actor) = self.require_human(ctx)?;
        let may_review = self
            .validator
            .may_review_appeals(&actor_id)
            .map_err(WorkflowError::AuthorityLookup)?;
        if !may_review {
            return Err(WorkflowError::InsufficientAuthority {
                actor: actor_id,
                decision_type: DecisionType::Rejected,
            });
        }

        let guard = self.store.mutation_guard(&decision_id);
        let _held = guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let decision = self.store.get(&decision_id)?;
        if decision.state != DecisionState::Appealed {
            return Err(WorkflowError::Validation(format!(
                "decision in state {} has no appeal to review",
                decision.state
            )));
        }

        let mut updated = decision.clone();
        updated.state = DecisionState::AppealReviewed { outcome };
        updated.is_final = true;
        let record = self.event_record(
            ctx,
            decision_id,
            AuditEventType::AppealReviewed,
            actor,
            &reason,
            &decision,
            &updated,
        )?;
        self.ledger.append(record)?;
        let updated = self.store.apply_appeal_review(&decision_id, outcome)?;
        tracing::info!(decision = %decision_id, outcome = %outcome, "appeal reviewed");
        Ok(updated)
    }

    /// Finalize rejections whose appeal window lapsed without action.
    ///
    /// A system sweep the hosting application schedules; each finalized
    /// decision gets a system-generated `DecisionModified` record. Returns
    /// the finalized decision ids.
    pub fn finalize_lapsed_rejections(
        &self,
        now: Timestamp,
    ) -> Result<Vec<DecisionId>, WorkflowError> {
        let sweeper = Actor::system(APPEAL_SWEEPER_PROCESS);
        let mut finalized = Vec::new();
        for decision_id in self.store.lapsed_rejections(now) {
            let guard = self.store.mutation_guard(&decision_id);
            let _held = guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

            let decision = self.store.get(&decision_id)?;
            if !decision.appeal_window_lapsed(now) {
                continue; // appealed or finalized since the scan
            }
            let mut updated = decision.clone();
            updated.is_final = true;
            let record = NewAuditRecord::new(
                decision_id,
                AuditEventType::DecisionModified,
                sweeper.clone(),
                "appeal window lapsed without action",
            )
            .with_created_at(now)
            .with_previous_state(snapshot(&decision)?)
            .with_new_state(snapshot(&updated)?);
            self.ledger.append(record)?;
            self.store.finalize(&decision_id, DecisionType::Rejected)?;
            finalized.push(decision_id);
        }
        if !finalized.is_empty() {
            tracing::info!(count = finalized.len(), "lapsed rejections finalized");
        }
        Ok(finalized)
    }

    // ── internals ────────────────────────────────────────────────────

    /// Shared create path for approvals and rejections: gate, then either
    /// conclude the caller's pending successor or stage a fresh decision,
    /// appending `DecisionCreated` inside the unit either way.
    #[allow(clippy::too_many_arguments)]
    fn submit_concluded(
        &self,
        ctx: &RequestContext,
        application_id: ApplicationId,
        decision_type: DecisionType,
        outcome: NewDecisionOutcome,
        decision_reason: String,
        decision_rationale: String,
        confidence: DecisionConfidence,
        effective_date: Option<Timestamp>,
    ) -> Result<HiringDecision, WorkflowError> {
        if decision_reason.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "decision_reason must not be empty".to_string(),
            ));
        }
        let (actor_id, actor) = self.require_human(ctx)?;
        let level = self.gate(&actor_id, decision_type)?;

        // A delegation successor assigned to this approver is concluded in
        // place rather than duplicated.
        if let Some(pending) = self.store.pending_for_approver(&application_id, &actor_id) {
            if self.store.has_blocking_final(&application_id) {
                return Err(WorkflowError::DuplicateDecision { application_id });
            }
            let conclusion = PendingConclusion {
                outcome,
                decision_reason: decision_reason.clone(),
                decision_rationale,
                confidence,
                effective_date,
                concluded_at: Timestamp::now(),
            };

            let guard = self.store.mutation_guard(&pending.id);
            let _held = guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

            let current = self.store.get(&pending.id)?;
            let concluded = conclusion.applied_to(&current)?;
            let record = self.event_record(
                ctx,
                pending.id,
                AuditEventType::DecisionCreated,
                actor,
                &decision_reason,
                &current,
                &concluded,
            )?;
            self.ledger.append(record)?;
            return self.store.conclude_pending(&pending.id, conclusion);
        }

        let staged = self.store.stage(NewDecision {
            application_id,
            outcome,
            decision_reason: decision_reason.clone(),
            decision_rationale,
            confidence,
            approver: actor_id,
            authority_level: level,
            effective_date,
            created_at: None,
            delegated_from: None,
        })?;
        let record = NewAuditRecord::new(
            staged.id,
            AuditEventType::DecisionCreated,
            actor,
            decision_reason,
        )
        .with_created_at(staged.created_at)
        .with_previous_state(absent_state(&application_id))
        .with_new_state(snapshot(&staged)?);
        let record = match ctx.client_ip.clone() {
            Some(ip) => record.with_client_ip(ip),
            None => record,
        };
        if let Err(e) = self.ledger.append(record) {
            self.store.abort_staged(&staged.id);
            return Err(e.into());
        }
        self.store.commit_staged(&staged.id)
    }

    /// Build the audit record for a state transition on an existing
    /// decision.
    #[allow(clippy::too_many_arguments)]
    fn event_record(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        event_type: AuditEventType,
        actor: Actor,
        reason: &str,
        before: &HiringDecision,
        after: &HiringDecision,
    ) -> Result<NewAuditRecord, WorkflowError> {
        let record = NewAuditRecord::new(decision_id, event_type, actor, reason)
            .with_previous_state(snapshot(before)?)
            .with_new_state(snapshot(after)?);
        Ok(match ctx.client_ip.clone() {
            Some(ip) => record.with_client_ip(ip),
            None => record,
        })
    }

    /// Resolve the calling human actor.
    fn require_human(&self, ctx: &RequestContext) -> Result<(ActorId, Actor), WorkflowError> {
        match &ctx.actor {
            None => Err(WorkflowError::Unauthenticated),
            Some(actor @ Actor::Human { id, .. }) => Ok((*id, actor.clone())),
            Some(Actor::System { process }) => Err(WorkflowError::Validation(format!(
                "system principal {process:?} cannot submit workflow operations"
            ))),
        }
    }

    /// Authority gate: the actor's level must permit the decision type.
    fn gate(
        &self,
        actor_id: &ActorId,
        decision_type: DecisionType,
    ) -> Result<caliper_core::AuthorityLevel, WorkflowError> {
        let level = self
            .validator
            .level_of(actor_id)
            .map_err(WorkflowError::AuthorityLookup)?;
        if !level.permits(decision_type) {
            return Err(WorkflowError::InsufficientAuthority {
                actor: *actor_id,
                decision_type,
            });
        }
        Ok(level)
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
