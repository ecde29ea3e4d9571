//! # Audit Records
//!
//! The record type the ledger stores, the caller-facing input type, and the
//! canonical signing payload that binds the two to the signature scheme.
//!
//! ## Signing Payload
//!
//! The signature covers every stored field except the signature itself and
//! the sequence position, which the ledger assigns after signing. Excluding
//! the sequence keeps verification reproducible: the tag depends only on
//! what the writer asserted, not on where the backend happened to slot the
//! record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use caliper_core::{
    Actor, ApplicationId, AuditRecordId, CanonicalBytes, CanonicalizationError, DecisionId,
    Timestamp,
};

use crate::signature::LedgerSignature;

/// The kind of action an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A decision was created through the orchestrator.
    DecisionCreated,
    /// A decision was modified (including appeal-window finalization).
    DecisionModified,
    /// A decision was handed to a different approver.
    DecisionDelegated,
    /// A rejection was appealed.
    DecisionAppealed,
    /// An appeal was reviewed to a terminal outcome.
    AppealReviewed,
    /// The profile-creation collaborator was signalled for an approval.
    ProfileCreated,
    /// A compliance review touched this decision.
    ComplianceReview,
    /// A bulk export of audit data was produced.
    AuditExport,
}

impl AuditEventType {
    /// Every event type, in declaration order. Used by report rollups.
    pub const ALL: [AuditEventType; 8] = [
        Self::DecisionCreated,
        Self::DecisionModified,
        Self::DecisionDelegated,
        Self::DecisionAppealed,
        Self::AppealReviewed,
        Self::ProfileCreated,
        Self::ComplianceReview,
        Self::AuditExport,
    ];

    /// The stored string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionCreated => "decision_created",
            Self::DecisionModified => "decision_modified",
            Self::DecisionDelegated => "decision_delegated",
            Self::DecisionAppealed => "decision_appealed",
            Self::AppealReviewed => "appeal_reviewed",
            Self::ProfileCreated => "profile_created",
            Self::ComplianceReview => "compliance_review",
            Self::AuditExport => "audit_export",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing input for one audit append.
///
/// The ledger assigns the record id, sequence, and signature; `created_at`
/// defaults to the append instant when unset.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    /// The decision this record describes.
    pub decision_id: DecisionId,
    /// What happened.
    pub event_type: AuditEventType,
    /// Who did it.
    pub actor: Actor,
    /// Why, in the actor's words.
    pub change_reason: String,
    /// Snapshot of the decision before the action, if it existed.
    pub previous_state: Option<Value>,
    /// Snapshot of the decision after the action.
    pub new_state: Option<Value>,
    /// Marks records a compliance review should surface.
    pub compliance_flag: bool,
    /// Client IP of the originating request, when one exists.
    pub client_ip: Option<String>,
    /// Event time; `None` stamps the append instant.
    pub created_at: Option<Timestamp>,
}

impl NewAuditRecord {
    /// A record with the required fields set and everything else empty.
    pub fn new(
        decision_id: DecisionId,
        event_type: AuditEventType,
        actor: Actor,
        change_reason: impl Into<String>,
    ) -> Self {
        Self {
            decision_id,
            event_type,
            actor,
            change_reason: change_reason.into(),
            previous_state: None,
            new_state: None,
            compliance_flag: false,
            client_ip: None,
            created_at: None,
        }
    }

    /// Attach the pre-action decision snapshot.
    pub fn with_previous_state(mut self, state: Value) -> Self {
        self.previous_state = Some(state);
        self
    }

    /// Attach the post-action decision snapshot.
    pub fn with_new_state(mut self, state: Value) -> Self {
        self.new_state = Some(state);
        self
    }

    /// Mark the record for compliance review.
    pub fn with_compliance_flag(mut self) -> Self {
        self.compliance_flag = true;
        self
    }

    /// Attach the originating client IP.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Pin the event time instead of stamping the append instant.
    pub fn with_created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }
}

/// One immutable entry in a decision's audit trail.
///
/// Instances are created only by [`AuditLedger::append`]; the ledger stores
/// its own copy, so nothing a caller does to a returned record reaches the
/// trail.
///
/// [`AuditLedger::append`]: crate::ledger::AuditLedger::append
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: AuditRecordId,
    /// The decision this record describes.
    pub decision_id: DecisionId,
    /// What happened.
    pub event_type: AuditEventType,
    /// Who did it.
    pub actor: Actor,
    /// Why.
    pub change_reason: String,
    /// Snapshot before the action.
    pub previous_state: Option<Value>,
    /// Snapshot after the action.
    pub new_state: Option<Value>,
    /// Keyed integrity tag over the signing payload.
    pub signature: LedgerSignature,
    /// Event time, seconds precision.
    pub created_at: Timestamp,
    /// Marks records a compliance review should surface.
    pub compliance_flag: bool,
    /// Client IP of the originating request.
    pub client_ip: Option<String>,
    /// Append-assigned position in the decision's trail, strictly
    /// increasing with insertion order.
    pub sequence: u64,
}

impl AuditRecord {
    /// Whether this record was produced by a system process.
    pub fn is_system_generated(&self) -> bool {
        self.actor.is_system()
    }

    /// The canonical bytes the signature covers.
    ///
    /// Everything except `signature` and `sequence`. The verifier calls
    /// this with the stored fields to recompute the tag.
    pub fn signing_payload(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        signing_payload(
            &self.id,
            &self.decision_id,
            self.event_type,
            &self.actor,
            &self.change_reason,
            self.previous_state.as_ref(),
            self.new_state.as_ref(),
            self.created_at,
            self.compliance_flag,
            self.client_ip.as_deref(),
        )
    }
}

/// The serialized form the signature covers.
#[derive(Serialize)]
struct SigningPayload<'a> {
    id: &'a AuditRecordId,
    decision_id: &'a DecisionId,
    event_type: AuditEventType,
    actor: &'a Actor,
    change_reason: &'a str,
    previous_state: Option<&'a Value>,
    new_state: Option<&'a Value>,
    created_at: String,
    compliance_flag: bool,
    client_ip: Option<&'a str>,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn signing_payload(
    id: &AuditRecordId,
    decision_id: &DecisionId,
    event_type: AuditEventType,
    actor: &Actor,
    change_reason: &str,
    previous_state: Option<&Value>,
    new_state: Option<&Value>,
    created_at: Timestamp,
    compliance_flag: bool,
    client_ip: Option<&str>,
) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::new(&SigningPayload {
        id,
        decision_id,
        event_type,
        actor,
        change_reason,
        previous_state,
        new_state,
        created_at: created_at.to_iso8601(),
        compliance_flag,
        client_ip,
    })
}

/// Decision state snapshot helper for orchestrator callers: serializes any
/// decision representation into the `previous_state`/`new_state` slot.
pub fn snapshot<T: Serialize>(value: &T) -> Result<Value, CanonicalizationError> {
    Ok(serde_json::to_value(value)?)
}

/// Convenience: the snapshot slot for a decision that did not exist yet,
/// tagged with the application it will belong to.
pub fn absent_state(application_id: &ApplicationId) -> Value {
    serde_json::json!({ "application_id": application_id, "exists": false })
}
