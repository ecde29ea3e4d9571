//! # caliper-decision — Decision Workflow
//!
//! The hiring decision lifecycle and the orchestrator that drives it.
//!
//! ## States
//!
//! ```text
//!            (submit)
//! Pending ──────────────▶ Approved (terminal, final immediately)
//!    │                 └▶ Rejected ──▶ Appealed ──▶ AppealReviewed (terminal)
//!    │                        │
//!    │                        └─ appeal window lapses ──▶ final
//!    │
//!    └──▶ Delegated { successor } ──▶ (successor Pending under new approver)
//! ```
//!
//! ## Atomic Unit
//!
//! Every state-changing operation produces exactly one audit record, inside
//! the same logical unit of work. Creation stages the decision invisibly,
//! appends the record, then commits; mutations append first under a
//! per-decision guard, then apply. A ledger write failure aborts the unit —
//! neither artifact becomes observable, and the caller may retry the same
//! intent safely.
//!
//! ## Module Map
//!
//! - [`decision`] — the decision type and its state machine.
//! - [`store`] — the decision record store with duplicate gating and
//!   staged two-phase creation.
//! - [`authority`] — the authority directory seam and validator predicate.
//! - [`orchestrator`] — the façade callers use.
//! - [`error`] — the workflow error taxonomy with stable codes.

pub mod authority;
pub mod decision;
pub mod error;
pub mod orchestrator;
pub mod store;

pub use authority::{AuthorityDirectory, AuthorityError, AuthorityValidator, StaticAuthorityDirectory};
pub use decision::{AppealOutcome, DecisionConfidence, DecisionState, HiringDecision};
pub use error::WorkflowError;
pub use orchestrator::{
    ApprovalRequest, DecisionEngine, NullProfileNotifier, ProfileNotifier, RejectionRequest,
    RequestContext, WorkflowConfig, APPEAL_SWEEPER_PROCESS,
};
pub use store::{DecisionStore, NewDecision, NewDecisionOutcome, PendingConclusion};
