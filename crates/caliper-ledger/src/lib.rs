//! # caliper-ledger — Append-Only Audit Ledger
//!
//! The integrity spine of the decision engine. Every state-changing
//! operation on a hiring decision produces exactly one audit record here,
//! signed with a process-wide keyed integrity tag and ordered by a strictly
//! increasing per-decision sequence.
//!
//! ## Correctness Properties
//!
//! - **Immutability.** The public contract has no update or delete. A
//!   caller that needs to "correct" history appends a `DecisionModified`
//!   record referencing the correction; the original stays.
//! - **Ordering.** Records for one decision are returned in `created_at`
//!   ascending order with ties broken by the append-assigned sequence.
//! - **Verifiability.** Signatures are HMAC-SHA256 over the canonical
//!   serialization of every field except the signature itself and the
//!   sequence, keyed by an injected [`SigningKey`]. The
//!   [`IntegrityVerifier`] recomputes them on demand.
//!
//! ## Module Map
//!
//! - [`signature`] — signing key lifecycle and the versioned integrity tag.
//! - [`record`] — audit record types and the canonical signing payload.
//! - [`ledger`] — the ledger itself, its storage seam, query and export.
//! - [`verifier`] — signature verification walk plus anomaly heuristics.

pub mod ledger;
pub mod record;
pub mod signature;
pub mod verifier;

pub use ledger::{
    AuditExport, AuditLedger, AuditQuery, ExportFormat, ExportRequest, LedgerBackend,
    LedgerError, MemoryBackend,
};
pub use record::{AuditEventType, AuditRecord, NewAuditRecord};
pub use signature::{LedgerSignature, SignatureError, SignatureVersion, SigningKey};
pub use verifier::{
    AnomalyConfig, IntegrityReport, IntegrityVerifier, Severity, SuspiciousActivity,
};
