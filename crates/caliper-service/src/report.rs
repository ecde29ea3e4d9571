//! # Compliance Report Generator
//!
//! Periodic rollups over the decision store, the audit ledger, and the
//! integrity verifier. Strictly read-only: the only write a report run can
//! cause is the ledger's own self-audit when a caller follows a report
//! with an export.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use caliper_core::{ActorId, ApplicationId, DecisionId, DecisionType, Timestamp};
use caliper_decision::{DecisionState, DecisionStore, HiringDecision, WorkflowError};
use caliper_ledger::{AuditLedger, AuditQuery, IntegrityVerifier};

/// The available report types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceReportType {
    /// Decision outcome totals and approval rate.
    ApprovalSummary,
    /// Audit record volume by event type.
    AuditTrail,
    /// Delegation chains and their participants.
    DelegationReport,
    /// Integrity scores across decisions.
    DecisionIntegrity,
}

/// Date-range filters applied to a report run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportFilters {
    /// Include decisions/records at or after this instant.
    pub from: Option<Timestamp>,
    /// Include decisions/records at or before this instant.
    pub until: Option<Timestamp>,
    /// Restrict to one application.
    pub application_id: Option<ApplicationId>,
}

impl ReportFilters {
    fn keeps_decision(&self, decision: &HiringDecision) -> bool {
        if let Some(app) = &self.application_id {
            if decision.application_id != *app {
                return false;
            }
        }
        if let Some(from) = self.from {
            if decision.created_at < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if decision.created_at > until {
                return false;
            }
        }
        true
    }

    fn as_audit_query(&self) -> AuditQuery {
        AuditQuery::all().with_date_range(self.from, self.until)
    }
}

/// Outcome totals and approval rate.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalSummary {
    /// Decisions examined.
    pub total_decisions: u64,
    /// Approved count.
    pub approved: u64,
    /// Rejected count (including appealed and reviewed).
    pub rejected: u64,
    /// Delegated count.
    pub delegated: u64,
    /// Pending successors awaiting a decision.
    pub pending: u64,
    /// `approved / (approved + rejected)` as an integer percentage; 0 when
    /// no concluded decisions exist.
    pub approval_rate_percent: u8,
    /// Mean confidence across concluded decisions.
    pub average_confidence: f64,
    /// Decision counts per authority level.
    pub by_authority_level: BTreeMap<String, u64>,
}

/// Audit record volume.
#[derive(Debug, Clone, Serialize)]
pub struct AuditTrailSummary {
    /// Records examined.
    pub total_records: u64,
    /// Record counts per event type.
    pub by_event_type: BTreeMap<String, u64>,
    /// Records carrying the compliance flag.
    pub compliance_flagged: u64,
    /// Records produced by system principals.
    pub system_generated: u64,
}

/// One delegation hand-off.
#[derive(Debug, Clone, Serialize)]
pub struct DelegationChain {
    /// The delegated decision.
    pub origin: DecisionId,
    /// The pending (or since concluded) successor.
    pub successor: DecisionId,
    /// The application both belong to.
    pub application_id: ApplicationId,
    /// Who handed the decision off.
    pub from_approver: ActorId,
    /// Who received it.
    pub to_approver: ActorId,
    /// The successor's current state.
    pub successor_state: String,
}

/// Delegation activity.
#[derive(Debug, Clone, Serialize)]
pub struct DelegationReport {
    /// Every delegation hand-off in scope.
    pub chains: Vec<DelegationChain>,
    /// Total hand-offs.
    pub total_delegations: u64,
}

/// One decision's integrity standing.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionIntegrityEntry {
    /// The decision.
    pub decision_id: DecisionId,
    /// Its integrity score.
    pub integrity_score: u8,
    /// How many suspicious activities its report carries.
    pub suspicious_count: u64,
}

/// Integrity standing across decisions.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionIntegritySummary {
    /// Decisions verified.
    pub decisions_verified: u64,
    /// Mean integrity score.
    pub average_integrity_score: f64,
    /// Decisions scoring below 100 or carrying suspicious activity.
    pub flagged: Vec<DecisionIntegrityEntry>,
}

/// The body of a generated report.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportBody {
    /// See [`ApprovalSummary`].
    ApprovalSummary(ApprovalSummary),
    /// See [`AuditTrailSummary`].
    AuditTrail(AuditTrailSummary),
    /// See [`DelegationReport`].
    Delegation(DelegationReport),
    /// See [`DecisionIntegritySummary`].
    DecisionIntegrity(DecisionIntegritySummary),
}

/// A generated compliance report.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    /// Which report was run.
    pub report_type: ComplianceReportType,
    /// When it was generated.
    pub generated_at: Timestamp,
    /// The filters it ran under.
    pub filters: ReportFilters,
    /// The rollup itself.
    pub body: ReportBody,
}

/// Read-only rollups over the store, ledger, and verifier.
pub struct ComplianceReportGenerator {
    store: Arc<DecisionStore>,
    ledger: Arc<AuditLedger>,
    verifier: Arc<IntegrityVerifier>,
}

impl ComplianceReportGenerator {
    /// A generator over the given components.
    pub fn new(
        store: Arc<DecisionStore>,
        ledger: Arc<AuditLedger>,
        verifier: Arc<IntegrityVerifier>,
    ) -> Self {
        Self {
            store,
            ledger,
            verifier,
        }
    }

    /// Run one report.
    pub fn generate(
        &self,
        report_type: ComplianceReportType,
        filters: ReportFilters,
    ) -> Result<ComplianceReport, WorkflowError> {
        let body = match report_type {
            ComplianceReportType::ApprovalSummary => {
                ReportBody::ApprovalSummary(self.approval_summary(&filters))
            }
            ComplianceReportType::AuditTrail => {
                ReportBody::AuditTrail(self.audit_trail_summary(&filters)?)
            }
            ComplianceReportType::DelegationReport => {
                ReportBody::Delegation(self.delegation_report(&filters))
            }
            ComplianceReportType::DecisionIntegrity => {
                ReportBody::DecisionIntegrity(self.decision_integrity(&filters)?)
            }
        };
        let report = ComplianceReport {
            report_type,
            generated_at: Timestamp::now(),
            filters,
            body,
        };
        tracing::info!(report = ?report.report_type, "compliance report generated");
        Ok(report)
    }

    fn decisions_in_scope(&self, filters: &ReportFilters) -> Vec<HiringDecision> {
        self.store
            .decisions()
            .into_iter()
            .filter(|d| filters.keeps_decision(d))
            .collect()
    }

    fn approval_summary(&self, filters: &ReportFilters) -> ApprovalSummary {
        let decisions = self.decisions_in_scope(filters);
        let mut approved = 0u64;
        let mut rejected = 0u64;
        let mut delegated = 0u64;
        let mut pending = 0u64;
        let mut confidence_sum = 0u64;
        let mut concluded = 0u64;
        let mut by_authority_level: BTreeMap<String, u64> = BTreeMap::new();

        for decision in &decisions {
            *by_authority_level
                .entry(decision.authority_level.to_string())
                .or_default() += 1;
            match decision.decision_type() {
                Some(DecisionType::Approved) => {
                    approved += 1;
                    concluded += 1;
                    confidence_sum += u64::from(decision.confidence.get());
                }
                Some(DecisionType::Rejected) => {
                    rejected += 1;
                    concluded += 1;
                    confidence_sum += u64::from(decision.confidence.get());
                }
                Some(DecisionType::Delegated) => delegated += 1,
                None => pending += 1,
            }
        }

        let approval_rate_percent = if approved + rejected == 0 {
            0
        } else {
            ((approved * 100) / (approved + rejected)) as u8
        };
        let average_confidence = if concluded == 0 {
            0.0
        } else {
            confidence_sum as f64 / concluded as f64
        };
        ApprovalSummary {
            total_decisions: decisions.len() as u64,
            approved,
            rejected,
            delegated,
            pending,
            approval_rate_percent,
            average_confidence,
            by_authority_level,
        }
    }

    fn audit_trail_summary(
        &self,
        filters: &ReportFilters,
    ) -> Result<AuditTrailSummary, WorkflowError> {
        let query = filters.as_audit_query();
        let mut total_records = 0u64;
        let mut by_event_type: BTreeMap<String, u64> = BTreeMap::new();
        let mut compliance_flagged = 0u64;
        let mut system_generated = 0u64;

        for decision_id in self.ledger.decisions_with_records()? {
            for record in self.ledger.query(&decision_id, &query)? {
                total_records += 1;
                *by_event_type
                    .entry(record.event_type.as_str().to_string())
                    .or_default() += 1;
                if record.compliance_flag {
                    compliance_flagged += 1;
                }
                if record.is_system_generated() {
                    system_generated += 1;
                }
            }
        }
        Ok(AuditTrailSummary {
            total_records,
            by_event_type,
            compliance_flagged,
            system_generated,
        })
    }

    fn delegation_report(&self, filters: &ReportFilters) -> DelegationReport {
        let decisions = self.decisions_in_scope(filters);
        let mut chains = Vec::new();
        for decision in &decisions {
            if let DecisionState::Delegated { successor } = &decision.state {
                let successor_decision = self.store.get(successor).ok();
                chains.push(DelegationChain {
                    origin: decision.id,
                    successor: *successor,
                    application_id: decision.application_id,
                    from_approver: decision.approver,
                    to_approver: successor_decision
                        .as_ref()
                        .map(|s| s.approver)
                        .unwrap_or(decision.approver),
                    successor_state: successor_decision
                        .map(|s| s.state.to_string())
                        .unwrap_or_else(|| "UNKNOWN".to_string()),
                });
            }
        }
        DelegationReport {
            total_delegations: chains.len() as u64,
            chains,
        }
    }

    fn decision_integrity(
        &self,
        filters: &ReportFilters,
    ) -> Result<DecisionIntegritySummary, WorkflowError> {
        let decisions = self.decisions_in_scope(filters);
        let mut score_sum = 0u64;
        let mut flagged = Vec::new();
        for decision in &decisions {
            let report = self.verifier.verify(&decision.id)?;
            score_sum += u64::from(report.integrity_score);
            if !report.is_clean() {
                flagged.push(DecisionIntegrityEntry {
                    decision_id: decision.id,
                    integrity_score: report.integrity_score,
                    suspicious_count: report.suspicious_activities.len() as u64,
                });
            }
        }
        let average_integrity_score = if decisions.is_empty() {
            100.0
        } else {
            score_sum as f64 / decisions.len() as f64
        };
        Ok(DecisionIntegritySummary {
            decisions_verified: decisions.len() as u64,
            average_integrity_score,
            flagged,
        })
    }
}

impl std::fmt::Debug for ComplianceReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceReportGenerator").finish_non_exhaustive()
    }
}
