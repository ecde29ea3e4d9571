//! # Decision Service Façade
//!
//! The full operation set from one place: workflow submissions, audit
//! trail reads, integrity verification, exports, and compliance reports.
//! Every method returns the uniform [`ServiceResult`] envelope.

use std::sync::Arc;

use caliper_core::{ActorId, ApplicationId, DecisionId, DecisionType, Timestamp};
use caliper_decision::{
    AppealOutcome, ApprovalRequest, DecisionEngine, HiringDecision, RejectionRequest,
    RequestContext, WorkflowError,
};
use caliper_ledger::{
    AnomalyConfig, AuditExport, AuditLedger, AuditQuery, AuditRecord, ExportRequest,
    IntegrityReport, IntegrityVerifier, NewAuditRecord,
};

use crate::report::{
    ComplianceReport, ComplianceReportGenerator, ComplianceReportType, ReportFilters,
};
use crate::result::ServiceResult;

/// The service boundary over the decision engine.
pub struct DecisionService {
    engine: Arc<DecisionEngine>,
    verifier: Arc<IntegrityVerifier>,
    reports: ComplianceReportGenerator,
}

impl DecisionService {
    /// A service over the given engine, verifying with the given anomaly
    /// tunables.
    pub fn new(engine: Arc<DecisionEngine>, anomaly_config: AnomalyConfig) -> Self {
        let verifier = Arc::new(IntegrityVerifier::new(
            Arc::clone(engine.ledger()),
            anomaly_config,
        ));
        let reports = ComplianceReportGenerator::new(
            Arc::clone(engine.store()),
            Arc::clone(engine.ledger()),
            Arc::clone(&verifier),
        );
        Self {
            engine,
            verifier,
            reports,
        }
    }

    /// The engine behind this service.
    pub fn engine(&self) -> &Arc<DecisionEngine> {
        &self.engine
    }

    /// The ledger behind this service.
    pub fn ledger(&self) -> &Arc<AuditLedger> {
        self.engine.ledger()
    }

    // ── workflow operations ──────────────────────────────────────────

    /// Submit an approval decision for an application.
    pub fn submit_approval_decision(
        &self,
        ctx: &RequestContext,
        application_id: ApplicationId,
        request: ApprovalRequest,
    ) -> ServiceResult<HiringDecision> {
        self.engine
            .submit_approval(ctx, application_id, request)
            .into()
    }

    /// Submit a rejection decision for an application.
    pub fn submit_rejection_decision(
        &self,
        ctx: &RequestContext,
        application_id: ApplicationId,
        request: RejectionRequest,
    ) -> ServiceResult<HiringDecision> {
        self.engine
            .submit_rejection(ctx, application_id, request)
            .into()
    }

    /// Hand a decision to a different approver.
    pub fn delegate_decision(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        to_actor: ActorId,
        reason: impl Into<String>,
    ) -> ServiceResult<HiringDecision> {
        self.engine.delegate(ctx, decision_id, to_actor, reason).into()
    }

    /// Appeal a rejection before its deadline.
    pub fn appeal_decision(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        reason: impl Into<String>,
    ) -> ServiceResult<HiringDecision> {
        self.engine.appeal(ctx, decision_id, reason).into()
    }

    /// Review an appeal to a terminal outcome.
    pub fn review_appeal(
        &self,
        ctx: &RequestContext,
        decision_id: DecisionId,
        outcome: AppealOutcome,
        reason: impl Into<String>,
    ) -> ServiceResult<HiringDecision> {
        self.engine
            .review_appeal(ctx, decision_id, outcome, reason)
            .into()
    }

    /// Finalize rejections whose appeal window lapsed without action.
    pub fn finalize_lapsed_rejections(&self, now: Timestamp) -> ServiceResult<Vec<DecisionId>> {
        self.engine.finalize_lapsed_rejections(now).into()
    }

    /// Decision history for an application, newest first.
    pub fn get_decision_history(
        &self,
        application_id: &ApplicationId,
    ) -> ServiceResult<Vec<HiringDecision>> {
        ServiceResult::ok(self.engine.store().list_by_application(application_id))
    }

    /// Whether the actor may submit the given decision type.
    pub fn validate_decision_authority(
        &self,
        actor_id: &ActorId,
        decision_type: DecisionType,
    ) -> ServiceResult<bool> {
        self.engine
            .validator()
            .validate(actor_id, decision_type)
            .map_err(WorkflowError::AuthorityLookup)
            .into()
    }

    // ── audit operations ─────────────────────────────────────────────

    /// Append an audit record directly, for external collaborators
    /// recording events of their own (profile creation confirmations,
    /// compliance reviews).
    pub fn create_audit_record(&self, record: NewAuditRecord) -> ServiceResult<AuditRecord> {
        self.ledger()
            .append(record)
            .map_err(WorkflowError::from)
            .into()
    }

    /// A decision's audit trail, optionally filtered; always time-ordered.
    pub fn get_audit_trail(
        &self,
        decision_id: &DecisionId,
        query: Option<AuditQuery>,
    ) -> ServiceResult<Vec<AuditRecord>> {
        self.ledger()
            .query(decision_id, &query.unwrap_or_default())
            .map_err(WorkflowError::from)
            .into()
    }

    /// Verify a decision's audit trail and report anomalies.
    pub fn validate_audit_integrity(&self, decision_id: &DecisionId) -> ServiceResult<IntegrityReport> {
        self.verifier
            .verify(decision_id)
            .map_err(WorkflowError::from)
            .into()
    }

    /// Produce a bulk audit export; the export itself is audited.
    pub fn export_audit_data(&self, request: ExportRequest) -> ServiceResult<AuditExport> {
        self.ledger()
            .export(request)
            .map_err(WorkflowError::from)
            .into()
    }

    /// Run a compliance report.
    pub fn generate_compliance_report(
        &self,
        report_type: ComplianceReportType,
        filters: ReportFilters,
    ) -> ServiceResult<ComplianceReport> {
        self.reports.generate(report_type, filters).into()
    }
}

impl std::fmt::Debug for DecisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use caliper_core::{Actor, AuthorityLevel};

    use caliper_decision::{
        DecisionConfidence, DecisionState, DecisionStore, StaticAuthorityDirectory,
        WorkflowConfig, APPEAL_SWEEPER_PROCESS,
    };
    use caliper_ledger::{AuditEventType, SigningKey};

    use crate::report::ReportBody;

    fn actor(name: &str) -> (ActorId, Actor) {
        let id = ActorId::new();
        (id, Actor::human(id, name))
    }

    struct Harness {
        service: DecisionService,
        senior: (ActorId, Actor),
        manager: (ActorId, Actor),
        regional: (ActorId, Actor),
    }

    fn harness() -> Harness {
        let senior = actor("Dana Whitfield");
        let manager = actor("Luis Ortega");
        let regional = actor("Priya Raman");
        let directory = StaticAuthorityDirectory::new()
            .with_actor(senior.0, AuthorityLevel::SeniorManager)
            .with_actor(manager.0, AuthorityLevel::Manager)
            .with_actor(regional.0, AuthorityLevel::RegionalManager);
        let engine = Arc::new(DecisionEngine::new(
            Arc::new(DecisionStore::new()),
            Arc::new(AuditLedger::in_memory(
                SigningKey::from_bytes(b"service-test-key").unwrap(),
            )),
            Arc::new(directory),
            WorkflowConfig::default(),
        ));
        let service = DecisionService::new(
            engine,
            AnomalyConfig::default().recognize_system_principal(APPEAL_SWEEPER_PROCESS),
        );
        Harness {
            service,
            senior,
            manager,
            regional,
        }
    }

    fn ctx(actor: &(ActorId, Actor)) -> RequestContext {
        RequestContext::authenticated(actor.1.clone())
    }

    fn approval_request() -> ApprovalRequest {
        ApprovalRequest {
            decision_reason: "qualifications_met".to_string(),
            decision_rationale: "strong loop".to_string(),
            confidence: DecisionConfidence::new(8).unwrap(),
            effective_date: None,
        }
    }

    fn rejection_request() -> RejectionRequest {
        RejectionRequest {
            decision_reason: "experience_gap".to_string(),
            decision_rationale: "below the bar".to_string(),
            confidence: DecisionConfidence::new(7).unwrap(),
            effective_date: None,
        }
    }

    // Spec scenario 1: senior manager approval.
    #[test]
    fn test_approval_end_to_end() {
        let h = harness();
        let app = ApplicationId::new();
        let result = h
            .service
            .submit_approval_decision(&ctx(&h.senior), app, approval_request());
        assert!(result.success);
        let decision = result.into_result().unwrap();
        assert_eq!(decision.state, DecisionState::Approved);
        assert!(decision.is_final);

        let trail = h
            .service
            .get_audit_trail(&decision.id, None)
            .into_result()
            .unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].event_type, AuditEventType::DecisionCreated);
        assert_eq!(trail[0].actor.actor_id(), Some(h.senior.0));
    }

    // Spec scenario 2: gated actor, nothing persisted.
    #[test]
    fn test_gated_approval_reports_code_and_writes_nothing() {
        let h = harness();
        let app = ApplicationId::new();
        let result = h
            .service
            .submit_approval_decision(&ctx(&h.manager), app, approval_request());
        assert!(!result.success);
        let err = result.into_result().unwrap_err();
        assert_eq!(err.code, "INSUFFICIENT_AUTHORITY");
        assert!(!err.retryable);

        let history = h.service.get_decision_history(&app).into_result().unwrap();
        assert!(history.is_empty());
    }

    // Spec scenario 4: rejection deadline arithmetic.
    #[test]
    fn test_rejection_deadline_thirty_days() {
        let h = harness();
        let decision = h
            .service
            .submit_rejection_decision(&ctx(&h.senior), ApplicationId::new(), rejection_request())
            .into_result()
            .unwrap();
        assert!(!decision.is_final);
        assert_eq!(
            decision.appeals_deadline(),
            Some(decision.created_at.plus_days(30))
        );
    }

    // Spec scenario 5: filtered trail, still time-ordered.
    #[test]
    fn test_filtered_trail() {
        let h = harness();
        let decision = h
            .service
            .submit_rejection_decision(&ctx(&h.senior), ApplicationId::new(), rejection_request())
            .into_result()
            .unwrap();
        // A compliance review recorded by an external collaborator.
        h.service
            .create_audit_record(
                NewAuditRecord::new(
                    decision.id,
                    AuditEventType::ComplianceReview,
                    h.regional.1.clone(),
                    "quarterly review",
                )
                .with_compliance_flag(),
            )
            .into_result()
            .unwrap();

        let query = AuditQuery::all()
            .with_event_types([AuditEventType::ComplianceReview])
            .with_compliance_flag(true);
        let hits = h
            .service
            .get_audit_trail(&decision.id, Some(query))
            .into_result()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event_type, AuditEventType::ComplianceReview);
        assert!(hits[0].compliance_flag);
    }

    #[test]
    fn test_integrity_verification_clean() {
        let h = harness();
        let decision = h
            .service
            .submit_approval_decision(&ctx(&h.senior), ApplicationId::new(), approval_request())
            .into_result()
            .unwrap();
        let report = h
            .service
            .validate_audit_integrity(&decision.id)
            .into_result()
            .unwrap();
        assert_eq!(report.integrity_score, 100);
        assert!(report.suspicious_activities.is_empty());
    }

    #[test]
    fn test_authority_predicate_exposed() {
        let h = harness();
        assert!(h
            .service
            .validate_decision_authority(&h.senior.0, DecisionType::Approved)
            .into_result()
            .unwrap());
        assert!(!h
            .service
            .validate_decision_authority(&h.manager.0, DecisionType::Approved)
            .into_result()
            .unwrap());
        // Unknown actors are an error, not a false.
        let err = h
            .service
            .validate_decision_authority(&ActorId::new(), DecisionType::Approved)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, "AUTHORITY_LOOKUP_FAILED");
    }

    #[test]
    fn test_export_is_audited() {
        let h = harness();
        h.service
            .submit_approval_decision(&ctx(&h.senior), ApplicationId::new(), approval_request())
            .into_result()
            .unwrap();
        let export = h
            .service
            .export_audit_data(ExportRequest::all(h.regional.1.clone()))
            .into_result()
            .unwrap();
        assert_eq!(export.record_count, 1);

        let journal = h
            .service
            .get_audit_trail(&h.service.ledger().export_journal(), None)
            .into_result()
            .unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].event_type, AuditEventType::AuditExport);
    }

    #[test]
    fn test_approval_summary_report() {
        let h = harness();
        h.service
            .submit_approval_decision(&ctx(&h.senior), ApplicationId::new(), approval_request())
            .into_result()
            .unwrap();
        h.service
            .submit_rejection_decision(&ctx(&h.senior), ApplicationId::new(), rejection_request())
            .into_result()
            .unwrap();

        let report = h
            .service
            .generate_compliance_report(
                ComplianceReportType::ApprovalSummary,
                ReportFilters::default(),
            )
            .into_result()
            .unwrap();
        match report.body {
            ReportBody::ApprovalSummary(s) => {
                assert_eq!(s.total_decisions, 2);
                assert_eq!(s.approved, 1);
                assert_eq!(s.rejected, 1);
                assert_eq!(s.approval_rate_percent, 50);
                assert!((s.average_confidence - 7.5).abs() < f64::EPSILON);
                assert_eq!(s.by_authority_level.get("SENIOR_MANAGER"), Some(&2));
            }
            other => panic!("wrong body: {other:?}"),
        }
    }

    #[test]
    fn test_delegation_report() {
        let h = harness();
        let app = ApplicationId::new();
        let original = h
            .service
            .submit_rejection_decision(&ctx(&h.senior), app, rejection_request())
            .into_result()
            .unwrap();
        h.service
            .delegate_decision(&ctx(&h.senior), original.id, h.regional.0, "second opinion")
            .into_result()
            .unwrap();

        let report = h
            .service
            .generate_compliance_report(
                ComplianceReportType::DelegationReport,
                ReportFilters::default(),
            )
            .into_result()
            .unwrap();
        match report.body {
            ReportBody::Delegation(d) => {
                assert_eq!(d.total_delegations, 1);
                assert_eq!(d.chains[0].origin, original.id);
                assert_eq!(d.chains[0].from_approver, h.senior.0);
                assert_eq!(d.chains[0].to_approver, h.regional.0);
            }
            other => panic!("wrong body: {other:?}"),
        }
    }

    #[test]
    fn test_audit_trail_report_counts_sweeper_records() {
        let h = harness();
        let decision = h
            .service
            .submit_rejection_decision(&ctx(&h.senior), ApplicationId::new(), rejection_request())
            .into_result()
            .unwrap();
        let finalized = h
            .service
            .finalize_lapsed_rejections(decision.created_at.plus_days(31))
            .into_result()
            .unwrap();
        assert_eq!(finalized, vec![decision.id]);

        let report = h
            .service
            .generate_compliance_report(ComplianceReportType::AuditTrail, ReportFilters::default())
            .into_result()
            .unwrap();
        match report.body {
            ReportBody::AuditTrail(t) => {
                assert_eq!(t.total_records, 2);
                assert_eq!(t.by_event_type.get("decision_created"), Some(&1));
                assert_eq!(t.by_event_type.get("decision_modified"), Some(&1));
                assert_eq!(t.system_generated, 1);
            }
            other => panic!("wrong body: {other:?}"),
        }
    }

    #[test]
    fn test_decision_integrity_report_clean_system() {
        let h = harness();
        h.service
            .submit_approval_decision(&ctx(&h.senior), ApplicationId::new(), approval_request())
            .into_result()
            .unwrap();

        let report = h
            .service
            .generate_compliance_report(
                ComplianceReportType::DecisionIntegrity,
                ReportFilters::default(),
            )
            .into_result()
            .unwrap();
        match report.body {
            ReportBody::DecisionIntegrity(i) => {
                assert_eq!(i.decisions_verified, 1);
                assert!((i.average_integrity_score - 100.0).abs() < f64::EPSILON);
                assert!(i.flagged.is_empty());
            }
            other => panic!("wrong body: {other:?}"),
        }
    }
}
