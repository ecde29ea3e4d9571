//! # Integrity Verification
//!
//! Walks a decision's audit trail, recomputes every integrity tag, and
//! flags anomalies worth a human look. Verification is read-only and
//! regenerated on demand — an [`IntegrityReport`] is derived state, never
//! persisted back into the trail.
//!
//! ## Anomaly Heuristics
//!
//! All heuristics are advisory: they produce [`SuspiciousActivity`] entries
//! for review, they never fail the verification call.
//!
//! 1. **Unrecognized system principal** (medium) — a system-tagged record
//!    whose process name is not in the configured allow-list. With the
//!    tagged actor type the classic flag/name mismatch cannot be produced
//!    in-process, but records ingested from elsewhere can still carry
//!    unknown principals.
//! 2. **Rapid successive changes** — two or more modifications of the same
//!    decision by the same actor inside the configured window (medium),
//!    escalating at three or more (high). The thresholds are illustrative
//!    defaults, not policy, so they live in [`AnomalyConfig`].
//! 3. **Signature mismatch** (high) — the recomputed tag differs from the
//!    stored one. The record is excluded from the verified count.
//!
//! The score is the percentage of records whose signatures verify. Every
//! record excluded from the count carries a suspicious entry, so a score
//! below 100 always has at least one entry explaining it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use caliper_core::{AuditRecordId, DecisionId, Timestamp};

use crate::ledger::{AuditLedger, LedgerError};
use crate::record::{AuditEventType, AuditRecord};

/// How much attention a suspicious activity warrants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Worth a look during routine review.
    Medium,
    /// Worth a look now.
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// One heuristically flagged anomaly in a decision's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    /// The record the anomaly anchors to.
    pub record_id: AuditRecordId,
    /// Human-readable description of the issue.
    pub issue: String,
    /// How much attention it warrants.
    pub severity: Severity,
}

/// The result of verifying one decision's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// The decision that was verified.
    pub decision_id: DecisionId,
    /// Records examined.
    pub total_records: u64,
    /// Records whose integrity tag verified.
    pub verified_records: u64,
    /// `verified / total × 100`, integer percentage; 100 for an empty
    /// trail.
    pub integrity_score: u8,
    /// Advisory anomalies, in trail order.
    pub suspicious_activities: Vec<SuspiciousActivity>,
    /// When this report was produced.
    pub last_verified: Timestamp,
}

impl IntegrityReport {
    /// Whether the trail verified cleanly with nothing flagged.
    pub fn is_clean(&self) -> bool {
        self.integrity_score == 100 && self.suspicious_activities.is_empty()
    }
}

/// Tunables for the anomaly heuristics.
///
/// The rapid-change thresholds default to the historical values (60-second
/// window, two for medium, three for high) but carry no product intent —
/// deployments set their own.
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// Window within which repeated modifications count as rapid.
    pub rapid_change_window_secs: i64,
    /// Modifications within the window that rate a medium flag.
    pub rapid_change_medium: usize,
    /// Modifications within the window that rate a high flag.
    pub rapid_change_high: usize,
    /// Process names allowed to produce system-generated records.
    pub recognized_system_principals: BTreeSet<String>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            rapid_change_window_secs: 60,
            rapid_change_medium: 2,
            rapid_change_high: 3,
            recognized_system_principals: BTreeSet::new(),
        }
    }
}

impl AnomalyConfig {
    /// Recognize a system principal by process name.
    pub fn recognize_system_principal(mut self, process: impl Into<String>) -> Self {
        self.recognized_system_principals.insert(process.into());
        self
    }
}

/// Recomputes signatures and runs the anomaly heuristics over one
/// decision's trail.
#[derive(Debug)]
pub struct IntegrityVerifier {
    ledger: Arc<AuditLedger>,
    config: AnomalyConfig,
}

impl IntegrityVerifier {
    /// A verifier over the given ledger with the given tunables.
    pub fn new(ledger: Arc<AuditLedger>, config: AnomalyConfig) -> Self {
        Self { ledger, config }
    }

    /// Verify one decision's audit trail.
    ///
    /// # Errors
    ///
    /// Only on ledger read failure. Anomalies and signature mismatches are
    /// reported, not raised.
    pub fn verify(&self, decision_id: &DecisionId) -> Result<IntegrityReport, LedgerError> {
        let records = self.ledger.records(decision_id)?;
        let mut suspicious = Vec::new();
        let mut verified = 0u64;

        for record in &records {
            if self.ledger.verify_record(record) {
                verified += 1;
            } else {
                suspicious.push(SuspiciousActivity {
                    record_id: record.id,
                    issue: format!(
                        "stored signature does not match recomputed tag for {} record",
                        record.event_type
                    ),
                    severity: Severity::High,
                });
            }
        }

        self.flag_unrecognized_system_principals(&records, &mut suspicious);
        self.flag_rapid_changes(&records, &mut suspicious);

        let total = records.len() as u64;
        let integrity_score = if total == 0 {
            100
        } else {
            ((verified * 100) / total) as u8
        };
        let report = IntegrityReport {
            decision_id: *decision_id,
            total_records: total,
            verified_records: verified,
            integrity_score,
            suspicious_activities: suspicious,
            last_verified: Timestamp::now(),
        };
        if !report.is_clean() {
            tracing::warn!(
                decision = %decision_id,
                score = report.integrity_score,
                flagged = report.suspicious_activities.len(),
                "audit trail verification found anomalies"
            );
        }
        Ok(report)
    }

    /// Heuristic 1: system-tagged records from unrecognized principals.
    fn flag_unrecognized_system_principals(
        &self,
        records: &[AuditRecord],
        suspicious: &mut Vec<SuspiciousActivity>,
    ) {
        for record in records {
            if let caliper_core::Actor::System { process } = &record.actor {
                if !self.config.recognized_system_principals.contains(process) {
                    suspicious.push(SuspiciousActivity {
                        record_id: record.id,
                        issue: format!(
                            "system-generated record from unrecognized principal {process:?}"
                        ),
                        severity: Severity::Medium,
                    });
                }
            }
        }
    }

    /// Heuristic 2: repeated modifications by one actor inside the window.
    ///
    /// Walks each actor's `DecisionModified` records in trail order and
    /// counts, for each record, how many of that actor's modifications
    /// fall inside the window ending at it. A record completing the medium
    /// threshold is flagged medium; completing the high threshold (and
    /// beyond) is flagged high.
    fn flag_rapid_changes(
        &self,
        records: &[AuditRecord],
        suspicious: &mut Vec<SuspiciousActivity>,
    ) {
        let mut by_actor: BTreeMap<String, Vec<&AuditRecord>> = BTreeMap::new();
        for record in records {
            if record.event_type == AuditEventType::DecisionModified {
                by_actor.entry(record.actor.key()).or_default().push(record);
            }
        }

        for (actor_key, mods) in by_actor {
            for (i, record) in mods.iter().enumerate() {
                let in_window = mods[..=i]
                    .iter()
                    .filter(|earlier| {
                        record.created_at.secs_since(&earlier.created_at)
                            <= self.config.rapid_change_window_secs
                    })
                    .count();
                if in_window >= self.config.rapid_change_high {
                    suspicious.push(SuspiciousActivity {
                        record_id: record.id,
                        issue: format!(
                            "{in_window} modifications by {actor_key} within {}s",
                            self.config.rapid_change_window_secs
                        ),
                        severity: Severity::High,
                    });
                } else if in_window >= self.config.rapid_change_medium {
                    suspicious.push(SuspiciousActivity {
                        record_id: record.id,
                        issue: format!(
                            "{in_window} modifications by {actor_key} within {}s",
                            self.config.rapid_change_window_secs
                        ),
                        severity: Severity::Medium,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caliper_core::{Actor, ActorId};

    use crate::ledger::{AuditLedger, LedgerBackend, MemoryBackend};
    use crate::record::NewAuditRecord;
    use crate::signature::SigningKey;

    fn setup() -> (Arc<AuditLedger>, IntegrityVerifier) {
        let ledger = Arc::new(AuditLedger::in_memory(
            SigningKey::from_bytes(b"verifier-test-key").unwrap(),
        ));
        let verifier = IntegrityVerifier::new(
            Arc::clone(&ledger),
            AnomalyConfig::default().recognize_system_principal("appeal-window-sweeper"),
        );
        (ledger, verifier)
    }

    fn human() -> Actor {
        Actor::human(ActorId::new(), "Dana Whitfield")
    }

    fn t0() -> Timestamp {
        Timestamp::parse("2026-03-01T09:00:00Z").unwrap()
    }

    #[test]
    fn test_clean_trail_scores_100() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        ledger
            .append(NewAuditRecord::new(
                d,
                AuditEventType::DecisionCreated,
                human(),
                "qualifications met",
            ))
            .unwrap();

        let report = verifier.verify(&d).unwrap();
        assert_eq!(report.total_records, 1);
        assert_eq!(report.verified_records, 1);
        assert_eq!(report.integrity_score, 100);
        assert!(report.is_clean());
    }

    #[test]
    fn test_empty_trail_scores_100() {
        let (_ledger, verifier) = setup();
        let report = verifier.verify(&DecisionId::new()).unwrap();
        assert_eq!(report.total_records, 0);
        assert_eq!(report.integrity_score, 100);
        assert!(report.is_clean());
    }

    #[test]
    fn test_tampered_record_drops_score_and_flags_high() {
        // A second ledger over the same backend with a different key plays
        // the tamperer: its records carry tags the real key cannot verify.
        let backend = Arc::new(MemoryBackend::new());
        let ledger = Arc::new(AuditLedger::new(
            SigningKey::from_bytes(b"real-key").unwrap(),
            Arc::clone(&backend) as Arc<dyn LedgerBackend>,
        ));
        let forger = AuditLedger::new(
            SigningKey::from_bytes(b"forged-key").unwrap(),
            Arc::clone(&backend) as Arc<dyn LedgerBackend>,
        );
        let d = DecisionId::new();
        ledger
            .append(NewAuditRecord::new(
                d,
                AuditEventType::DecisionCreated,
                human(),
                "legit",
            ))
            .unwrap();
        forger
            .append(NewAuditRecord::new(
                d,
                AuditEventType::DecisionModified,
                human(),
                "forged",
            ))
            .unwrap();

        let verifier = IntegrityVerifier::new(Arc::clone(&ledger), AnomalyConfig::default());
        let report = verifier.verify(&d).unwrap();
        assert_eq!(report.total_records, 2);
        assert_eq!(report.verified_records, 1);
        assert_eq!(report.integrity_score, 50);
        assert!(report
            .suspicious_activities
            .iter()
            .any(|s| s.severity == Severity::High && s.issue.contains("signature")));
    }

    #[test]
    fn test_unrecognized_system_principal_flagged_medium() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        ledger
            .append(NewAuditRecord::new(
                d,
                AuditEventType::DecisionModified,
                Actor::system("rogue-batch-job"),
                "automated adjustment",
            ))
            .unwrap();

        let report = verifier.verify(&d).unwrap();
        assert_eq!(report.integrity_score, 100);
        assert_eq!(report.suspicious_activities.len(), 1);
        assert_eq!(report.suspicious_activities[0].severity, Severity::Medium);
        assert!(report.suspicious_activities[0]
            .issue
            .contains("rogue-batch-job"));
    }

    #[test]
    fn test_recognized_system_principal_not_flagged() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        ledger
            .append(NewAuditRecord::new(
                d,
                AuditEventType::DecisionModified,
                Actor::system("appeal-window-sweeper"),
                "appeal window lapsed",
            ))
            .unwrap();

        let report = verifier.verify(&d).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_two_rapid_changes_flag_medium() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        let actor = human();
        for offset in [0, 30] {
            ledger
                .append(
                    NewAuditRecord::new(
                        d,
                        AuditEventType::DecisionModified,
                        actor.clone(),
                        "adjustment",
                    )
                    .with_created_at(t0().plus_secs(offset)),
                )
                .unwrap();
        }

        let report = verifier.verify(&d).unwrap();
        let severities: Vec<Severity> = report
            .suspicious_activities
            .iter()
            .map(|s| s.severity)
            .collect();
        assert!(severities.contains(&Severity::Medium));
        assert!(!severities.contains(&Severity::High));
    }

    #[test]
    fn test_three_rapid_changes_flag_high() {
        // Spec scenario: modifications at t, t+30s, t+45s.
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        let actor = human();
        for offset in [0, 30, 45] {
            ledger
                .append(
                    NewAuditRecord::new(
                        d,
                        AuditEventType::DecisionModified,
                        actor.clone(),
                        "adjustment",
                    )
                    .with_created_at(t0().plus_secs(offset)),
                )
                .unwrap();
        }

        let report = verifier.verify(&d).unwrap();
        assert!(report
            .suspicious_activities
            .iter()
            .any(|s| s.severity == Severity::High));
    }

    #[test]
    fn test_slow_changes_not_flagged() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        let actor = human();
        for offset in [0, 300, 600] {
            ledger
                .append(
                    NewAuditRecord::new(
                        d,
                        AuditEventType::DecisionModified,
                        actor.clone(),
                        "adjustment",
                    )
                    .with_created_at(t0().plus_secs(offset)),
                )
                .unwrap();
        }

        assert!(verifier.verify(&d).unwrap().is_clean());
    }

    #[test]
    fn test_rapid_changes_by_different_actors_not_flagged() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        for offset in [0, 10, 20] {
            ledger
                .append(
                    NewAuditRecord::new(
                        d,
                        AuditEventType::DecisionModified,
                        human(), // fresh actor each time
                        "adjustment",
                    )
                    .with_created_at(t0().plus_secs(offset)),
                )
                .unwrap();
        }

        assert!(verifier.verify(&d).unwrap().is_clean());
    }

    #[test]
    fn test_rapid_non_modification_events_not_flagged() {
        let (ledger, verifier) = setup();
        let d = DecisionId::new();
        let actor = human();
        for (offset, et) in [
            (0, AuditEventType::DecisionCreated),
            (5, AuditEventType::DecisionAppealed),
            (10, AuditEventType::AppealReviewed),
        ] {
            ledger
                .append(
                    NewAuditRecord::new(d, et, actor.clone(), "workflow step")
                        .with_created_at(t0().plus_secs(offset)),
                )
                .unwrap();
        }

        assert!(verifier.verify(&d).unwrap().is_clean());
    }

    #[test]
    fn test_configured_thresholds_respected() {
        let ledger = Arc::new(AuditLedger::in_memory(
            SigningKey::from_bytes(b"k").unwrap(),
        ));
        let strict = IntegrityVerifier::new(
            Arc::clone(&ledger),
            AnomalyConfig {
                rapid_change_window_secs: 3600,
                rapid_change_medium: 2,
                rapid_change_high: 2,
                recognized_system_principals: BTreeSet::new(),
            },
        );
        let d = DecisionId::new();
        let actor = human();
        for offset in [0, 1800] {
            ledger
                .append(
                    NewAuditRecord::new(
                        d,
                        AuditEventType::DecisionModified,
                        actor.clone(),
                        "adjustment",
                    )
                    .with_created_at(t0().plus_secs(offset)),
                )
                .unwrap();
        }

        let report = strict.verify(&d).unwrap();
        assert!(report
            .suspicious_activities
            .iter()
            .any(|s| s.severity == Severity::High));
    }
}
