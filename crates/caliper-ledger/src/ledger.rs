//! # The Audit Ledger
//!
//! Append-only store of audit records, one ordered stream per decision.
//!
//! ## Correctness Property
//!
//! Nothing here updates or removes a stored record. The backend trait has
//! exactly one write operation — `insert` — and the ledger's public surface
//! is `append`, `query`, and `export`. History is corrected by appending a
//! `DecisionModified` record that references the correction, never by
//! rewriting.
//!
//! ## Ordering
//!
//! `insert` assigns each record the next sequence position in its
//! decision's stream under the backend's write lock; that stream is the
//! only serialized resource. Queries return `created_at` ascending with
//! ties broken by sequence, so same-second appends (common at seconds
//! precision) still read back in insertion order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;

use caliper_core::{
    sha256_digest, Actor, AuditRecordId, CanonicalBytes, CanonicalizationError, ContentDigest,
    DecisionId, ExportId, Timestamp,
};

use crate::record::{AuditEventType, AuditRecord, NewAuditRecord};
use crate::signature::SigningKey;

/// Errors from ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backend failed to persist an append. Callers may retry with the
    /// same intent; a failed append leaves no record behind.
    #[error("ledger write failed: {0}")]
    Write(String),

    /// The backend failed to serve a read.
    #[error("ledger read failed: {0}")]
    Read(String),

    /// A record could not be canonicalized for signing.
    #[error("ledger canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Storage seam for the ledger.
///
/// The authoritative deployment is the in-memory single-writer
/// [`MemoryBackend`]; a relational backend implements the same three
/// operations. There is deliberately no update or delete.
pub trait LedgerBackend: Send + Sync {
    /// Persist a record, assigning the next sequence position in its
    /// decision's stream. The incoming `sequence` value is ignored.
    ///
    /// Must be atomic: on error, no partial state is observable.
    fn insert(&self, record: AuditRecord) -> Result<AuditRecord, LedgerError>;

    /// All records for one decision, in insertion order.
    fn records_of(&self, decision_id: &DecisionId) -> Result<Vec<AuditRecord>, LedgerError>;

    /// Every decision with at least one record.
    fn decision_ids(&self) -> Result<Vec<DecisionId>, LedgerError>;
}

/// In-memory ledger storage: one ordered stream per decision.
#[derive(Default)]
pub struct MemoryBackend {
    streams: RwLock<BTreeMap<DecisionId, Vec<AuditRecord>>>,
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerBackend for MemoryBackend {
    fn insert(&self, mut record: AuditRecord) -> Result<AuditRecord, LedgerError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| LedgerError::Write("ledger lock poisoned".to_string()))?;
        let stream = streams.entry(record.decision_id).or_default();
        record.sequence = stream.len() as u64;
        stream.push(record.clone());
        Ok(record)
    }

    fn records_of(&self, decision_id: &DecisionId) -> Result<Vec<AuditRecord>, LedgerError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| LedgerError::Read("ledger lock poisoned".to_string()))?;
        Ok(streams.get(decision_id).cloned().unwrap_or_default())
    }

    fn decision_ids(&self) -> Result<Vec<DecisionId>, LedgerError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| LedgerError::Read("ledger lock poisoned".to_string()))?;
        Ok(streams.keys().copied().collect())
    }
}

/// Filters for reading a decision's audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Keep only these event types. `None` keeps all.
    pub event_types: Option<BTreeSet<AuditEventType>>,
    /// Keep only records with this compliance flag value.
    pub compliance_flag: Option<bool>,
    /// Keep records at or after this instant.
    pub from: Option<Timestamp>,
    /// Keep records at or before this instant.
    pub until: Option<Timestamp>,
    /// Return newest records first instead of the default ascending order.
    pub newest_first: bool,
}

impl AuditQuery {
    /// A query matching every record in ascending time order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only the given event types.
    pub fn with_event_types(mut self, types: impl IntoIterator<Item = AuditEventType>) -> Self {
        self.event_types = Some(types.into_iter().collect());
        self
    }

    /// Keep only records with the given compliance flag value.
    pub fn with_compliance_flag(mut self, flag: bool) -> Self {
        self.compliance_flag = Some(flag);
        self
    }

    /// Keep records within `[from, until]` inclusive.
    pub fn with_date_range(mut self, from: Option<Timestamp>, until: Option<Timestamp>) -> Self {
        self.from = from;
        self.until = until;
        self
    }

    /// Reverse the output to newest-first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(types) = &self.event_types {
            if !types.contains(&record.event_type) {
                return false;
            }
        }
        if let Some(flag) = self.compliance_flag {
            if record.compliance_flag != flag {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        true
    }
}

/// The export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One JSON document containing the matched records.
    Json,
}

/// A request for a bulk audit export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Who is exporting — recorded in the self-audit entry.
    pub requested_by: Actor,
    /// Restrict to these decisions; `None` exports across the ledger.
    pub decision_ids: Option<Vec<DecisionId>>,
    /// Record filters applied within each decision's stream.
    pub query: AuditQuery,
    /// Output format.
    pub format: ExportFormat,
    /// Client IP of the originating request.
    pub client_ip: Option<String>,
}

impl ExportRequest {
    /// Export everything, as JSON, on behalf of `requested_by`.
    pub fn all(requested_by: Actor) -> Self {
        Self {
            requested_by,
            decision_ids: None,
            query: AuditQuery::all(),
            format: ExportFormat::Json,
            client_ip: None,
        }
    }
}

/// The result of a bulk audit export.
#[derive(Debug, Clone)]
pub struct AuditExport {
    /// Unique export identifier, also named in the self-audit record.
    pub export_id: ExportId,
    /// Output format of `payload`.
    pub format: ExportFormat,
    /// Number of records in the payload.
    pub record_count: usize,
    /// The serialized export document.
    pub payload: String,
    /// SHA-256 digest of the canonical payload, named in the self-audit
    /// record so the export can be referenced without embedding it.
    pub payload_digest: ContentDigest,
    /// When the export was produced.
    pub exported_at: Timestamp,
}

/// The append-only audit ledger.
///
/// Holds the injected signing key and a storage backend. Appends for one
/// decision are strictly ordered by the backend; appends for different
/// decisions are independent.
pub struct AuditLedger {
    key: SigningKey,
    backend: Arc<dyn LedgerBackend>,
    /// Synthetic stream recording export operations. Exports are not tied
    /// to a single decision, but every export must still land in the trail;
    /// this journal is the stream those records live in.
    export_journal: DecisionId,
}

impl AuditLedger {
    /// A ledger over the given backend.
    pub fn new(key: SigningKey, backend: Arc<dyn LedgerBackend>) -> Self {
        Self {
            key,
            backend,
            export_journal: DecisionId::new(),
        }
    }

    /// A ledger over a fresh in-memory backend.
    pub fn in_memory(key: SigningKey) -> Self {
        Self::new(key, Arc::new(MemoryBackend::new()))
    }

    /// The stream export self-audit records are appended to.
    pub fn export_journal(&self) -> DecisionId {
        self.export_journal
    }

    /// Sign and persist one audit record.
    ///
    /// Assigns the record id, stamps `created_at` when the caller left it
    /// unset, computes the integrity tag, and hands the record to the
    /// backend, which assigns its sequence position.
    ///
    /// # Errors
    ///
    /// `LedgerError::Write` on backend failure. A failed append leaves no
    /// record; callers may retry with the same intent.
    pub fn append(&self, new: NewAuditRecord) -> Result<AuditRecord, LedgerError> {
        let id = AuditRecordId::new();
        let created_at = new.created_at.unwrap_or_else(Timestamp::now);
        let payload = crate::record::signing_payload(
            &id,
            &new.decision_id,
            new.event_type,
            &new.actor,
            &new.change_reason,
            new.previous_state.as_ref(),
            new.new_state.as_ref(),
            created_at,
            new.compliance_flag,
            new.client_ip.as_deref(),
        )?;
        let record = AuditRecord {
            id,
            decision_id: new.decision_id,
            event_type: new.event_type,
            actor: new.actor,
            change_reason: new.change_reason,
            previous_state: new.previous_state,
            new_state: new.new_state,
            signature: self.key.sign(&payload),
            created_at,
            compliance_flag: new.compliance_flag,
            client_ip: new.client_ip,
            sequence: 0,
        };
        let stored = self.backend.insert(record)?;
        tracing::debug!(
            decision = %stored.decision_id,
            event = %stored.event_type,
            sequence = stored.sequence,
            "audit record appended"
        );
        Ok(stored)
    }

    /// All records for one decision in trail order (`created_at` ascending,
    /// ties by sequence). Used by the verifier and by `query`.
    pub fn records(&self, decision_id: &DecisionId) -> Result<Vec<AuditRecord>, LedgerError> {
        let mut records = self.backend.records_of(decision_id)?;
        records.sort_by_key(|r| (r.created_at, r.sequence));
        Ok(records)
    }

    /// Filtered read of one decision's trail.
    pub fn query(
        &self,
        decision_id: &DecisionId,
        query: &AuditQuery,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        let mut records = self.records(decision_id)?;
        records.retain(|r| query.matches(r));
        if query.newest_first {
            records.reverse();
        }
        Ok(records)
    }

    /// Every decision with at least one record.
    pub fn decisions_with_records(&self) -> Result<Vec<DecisionId>, LedgerError> {
        self.backend.decision_ids()
    }

    /// Recompute a record's integrity tag against the stored fields.
    pub fn verify_record(&self, record: &AuditRecord) -> bool {
        match record.signing_payload() {
            Ok(payload) => self.key.verify(&payload, &record.signature),
            Err(_) => false,
        }
    }

    /// Produce a bulk export of matching records.
    ///
    /// The export itself appends one `AuditExport` record to the export
    /// journal naming who exported, how many records, and the payload
    /// digest — the operation is self-auditing, so a failed self-audit
    /// append fails the whole export.
    pub fn export(&self, request: ExportRequest) -> Result<AuditExport, LedgerError> {
        let export_id = ExportId::new();
        let exported_at = Timestamp::now();

        let scope = match &request.decision_ids {
            Some(ids) => ids.clone(),
            None => self.backend.decision_ids()?,
        };
        let mut records = Vec::new();
        for decision_id in &scope {
            records.extend(self.query(decision_id, &request.query)?);
        }

        let document = serde_json::json!({
            "export_id": export_id,
            "exported_at": exported_at.to_iso8601(),
            "record_count": records.len(),
            "records": records,
        });
        let canonical = CanonicalBytes::new(&document)?;
        let payload_digest = sha256_digest(&canonical);
        let payload = serde_json::to_string(&document)
            .map_err(|e| LedgerError::Canonicalization(e.into()))?;

        let mut self_audit = NewAuditRecord::new(
            self.export_journal,
            AuditEventType::AuditExport,
            request.requested_by,
            "bulk audit data export",
        )
        .with_created_at(exported_at)
        .with_new_state(serde_json::json!({
            "export_id": export_id,
            "format": request.format,
            "record_count": records.len(),
            "payload_digest": payload_digest.to_string(),
            "decision_scope": request.decision_ids.as_ref().map(Vec::len),
        }));
        if let Some(ip) = request.client_ip {
            self_audit = self_audit.with_client_ip(ip);
        }
        let stored = self.append(self_audit)?;
        tracing::info!(
            export = %export_id,
            records = records.len(),
            audit_sequence = stored.sequence,
            "audit export produced"
        );

        Ok(AuditExport {
            export_id,
            format: request.format,
            record_count: records.len(),
            payload,
            payload_digest,
            exported_at,
        })
    }
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger")
            .field("key", &self.key)
            .field("export_journal", &self.export_journal)
            .finish_non_exhaustive()
    }
}
