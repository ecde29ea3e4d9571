//! # caliper-service — Service Boundary
//!
//! The operation set callers integrate against, and the compliance report
//! generator. This crate owns no wire format: every operation is a plain
//! method returning the uniform [`ServiceResult`] envelope — `success`
//! plus either `data` or an `error` with a stable code and readable
//! message — which an HTTP or RPC layer can serialize directly.
//!
//! ## Module Map
//!
//! - [`result`] — the `{success, data | error}` envelope.
//! - [`report`] — periodic compliance rollups over the store and ledger.
//! - [`service`] — the façade exposing the full operation set.

pub mod report;
pub mod result;
pub mod service;

pub use report::{
    ApprovalSummary, AuditTrailSummary, ComplianceReport, ComplianceReportGenerator,
    ComplianceReportType, DecisionIntegrityEntry, DecisionIntegritySummary, DelegationChain,
    DelegationReport, ReportBody, ReportFilters,
};
pub use result::{ServiceError, ServiceResult};
pub use service::DecisionService;
