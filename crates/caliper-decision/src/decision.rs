//! # Hiring Decision — Lifecycle State Machine
//!
//! The decision type and the tagged state enum that carries its lifecycle.
//!
//! ## Design Decision
//!
//! The lifecycle is an enum with data-carrying variants rather than a flat
//! `decision_type` string plus scattered nullable columns. A rejection
//! cannot exist without its appeals deadline, and a delegated decision
//! cannot exist without its successor — the variants make those pairings
//! structural. `DecisionType` remains as the reporting/authority view of a
//! state.

use serde::{Deserialize, Serialize};

use caliper_core::{ActorId, ApplicationId, AuthorityLevel, DecisionId, DecisionType, Timestamp};

/// Approver confidence in a decision, on the 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DecisionConfidence(u8);

impl DecisionConfidence {
    /// Construct a confidence value, rejecting anything outside 1-10.
    pub fn new(value: u8) -> Result<Self, String> {
        if (1..=10).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("decision confidence must be 1-10, got {value}"))
        }
    }

    /// The raw 1-10 value.
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DecisionConfidence {
    type Error = String;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DecisionConfidence> for u8 {
    fn from(c: DecisionConfidence) -> u8 {
        c.0
    }
}

/// The outcome of an appeal review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealOutcome {
    /// The rejection stands.
    Upheld,
    /// The rejection is overturned; the application may receive a fresh
    /// decision.
    Overturned,
}

impl std::fmt::Display for AppealOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Upheld => "upheld",
            Self::Overturned => "overturned",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a hiring decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DecisionState {
    /// Spawned by a delegation, awaiting the new approver's decision.
    Pending,
    /// Candidate approved. Terminal; always final.
    Approved,
    /// Candidate rejected; appealable until the deadline.
    Rejected {
        /// Last instant an appeal is accepted.
        appeals_deadline: Timestamp,
    },
    /// Rejection under appeal.
    Appealed,
    /// Appeal reviewed to a terminal outcome.
    AppealReviewed {
        /// How the review concluded.
        outcome: AppealOutcome,
    },
    /// Superseded by a delegation to another approver.
    Delegated {
        /// The pending decision spawned under the new approver.
        successor: DecisionId,
    },
}

impl DecisionState {
    /// Whether this state accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::AppealReviewed { .. })
    }

    /// The reporting/authority view of this state, if the decision has
    /// been made. `Pending` has none.
    pub fn decision_type(&self) -> Option<DecisionType> {
        match self {
            Self::Pending => None,
            Self::Approved => Some(DecisionType::Approved),
            Self::Rejected { .. } | Self::Appealed | Self::AppealReviewed { .. } => {
                Some(DecisionType::Rejected)
            }
            Self::Delegated { .. } => Some(DecisionType::Delegated),
        }
    }

    /// The appeals deadline, when one applies.
    pub fn appeals_deadline(&self) -> Option<Timestamp> {
        match self {
            Self::Rejected { appeals_deadline } => Some(*appeals_deadline),
            _ => None,
        }
    }
}

impl std::fmt::Display for DecisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected { .. } => "REJECTED",
            Self::Appealed => "APPEALED",
            Self::AppealReviewed { .. } => "APPEAL_REVIEWED",
            Self::Delegated { .. } => "DELEGATED",
        };
        f.write_str(s)
    }
}

/// One hiring decision for one application.
///
/// Mutated only through the orchestrator. Once `is_final` is set, no field
/// changes; the store enforces this on every mutation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringDecision {
    /// Unique decision identifier.
    pub id: DecisionId,
    /// The application this decision concludes.
    pub application_id: ApplicationId,
    /// Lifecycle state.
    pub state: DecisionState,
    /// Short reason category, e.g. `qualifications_met`.
    pub decision_reason: String,
    /// Free-form rationale in the approver's words.
    pub decision_rationale: String,
    /// Approver confidence, 1-10.
    pub confidence: DecisionConfidence,
    /// The approver responsible for this decision.
    pub approver: ActorId,
    /// The approver's authority level at decision time.
    pub authority_level: AuthorityLevel,
    /// When the decision record was created.
    pub created_at: Timestamp,
    /// When the decision takes effect.
    pub effective_date: Timestamp,
    /// Whether the decision is closed to further change.
    pub is_final: bool,
    /// The delegated decision this one succeeds, if any.
    pub delegated_from: Option<DecisionId>,
}

impl HiringDecision {
    /// The appeals deadline, when one applies.
    pub fn appeals_deadline(&self) -> Option<Timestamp> {
        self.state.appeals_deadline()
    }

    /// The reporting/authority view of the state.
    pub fn decision_type(&self) -> Option<DecisionType> {
        self.state.decision_type()
    }

    /// Whether a rejection's appeal window has lapsed without action.
    pub fn appeal_window_lapsed(&self, now: Timestamp) -> bool {
        match &self.state {
            DecisionState::Rejected { appeals_deadline } => {
                !self.is_final && now > *appeals_deadline
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds() {
        assert!(DecisionConfidence::new(0).is_err());
        assert!(DecisionConfidence::new(1).is_ok());
        assert!(DecisionConfidence::new(10).is_ok());
        assert!(DecisionConfidence::new(11).is_err());
    }

    #[test]
    fn test_confidence_serde_validates() {
        let ok: Result<DecisionConfidence, _> = serde_json::from_str("8");
        assert_eq!(ok.unwrap().get(), 8);
        let bad: Result<DecisionConfidence, _> = serde_json::from_str("12");
        assert!(bad.is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(DecisionState::Approved.is_terminal());
        assert!(DecisionState::AppealReviewed {
            outcome: AppealOutcome::Upheld
        }
        .is_terminal());
        assert!(!DecisionState::Pending.is_terminal());
        assert!(!DecisionState::Rejected {
            appeals_deadline: Timestamp::now()
        }
        .is_terminal());
        assert!(!DecisionState::Appealed.is_terminal());
    }

    #[test]
    fn test_decision_type_mapping() {
        assert_eq!(DecisionState::Pending.decision_type(), None);
        assert_eq!(
            DecisionState::Approved.decision_type(),
            Some(DecisionType::Approved)
        );
        assert_eq!(
            DecisionState::Appealed.decision_type(),
            Some(DecisionType::Rejected)
        );
        assert_eq!(
            DecisionState::Delegated {
                successor: DecisionId::new()
            }
            .decision_type(),
            Some(DecisionType::Delegated)
        );
    }

    #[test]
    fn test_appeal_window_lapse() {
        let deadline = Timestamp::parse("2026-03-31T09:00:00Z").unwrap();
        let decision = HiringDecision {
            id: DecisionId::new(),
            application_id: ApplicationId::new(),
            state: DecisionState::Rejected {
                appeals_deadline: deadline,
            },
            decision_reason: "experience_gap".to_string(),
            decision_rationale: "below the bar for the role".to_string(),
            confidence: DecisionConfidence::new(7).unwrap(),
            approver: ActorId::new(),
            authority_level: AuthorityLevel::SeniorManager,
            created_at: Timestamp::parse("2026-03-01T09:00:00Z").unwrap(),
            effective_date: Timestamp::parse("2026-03-01T09:00:00Z").unwrap(),
            is_final: false,
            delegated_from: None,
        };
        assert!(!decision.appeal_window_lapsed(deadline));
        assert!(decision.appeal_window_lapsed(deadline.plus_secs(1)));
    }

    #[test]
    fn test_state_serde_tagged() {
        let state = DecisionState::Rejected {
            appeals_deadline: Timestamp::parse("2026-03-31T09:00:00Z").unwrap(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "rejected");
        assert!(json["appeals_deadline"].is_string());
        let back: DecisionState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
