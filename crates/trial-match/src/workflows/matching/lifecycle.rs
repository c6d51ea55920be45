use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ConsultationId, MatchId, PatientId, TrialId};
use super::scoring::ScoredTrial;

/// Consent workflow state of a trial match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Approved,
    Declined,
    Enrolled,
}

impl MatchStatus {
    pub const ORDERED: [MatchStatus; 4] = [
        MatchStatus::Pending,
        MatchStatus::Approved,
        MatchStatus::Declined,
        MatchStatus::Enrolled,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Approved => "approved",
            MatchStatus::Declined => "declined",
            MatchStatus::Enrolled => "enrolled",
        }
    }

    /// `pending -> approved|declined`, `approved -> enrolled|declined`.
    pub const fn can_transition_to(self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Pending, MatchStatus::Approved)
                | (MatchStatus::Pending, MatchStatus::Declined)
                | (MatchStatus::Approved, MatchStatus::Enrolled)
                | (MatchStatus::Approved, MatchStatus::Declined)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Declined | MatchStatus::Enrolled)
    }
}

/// Patient consent captured for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Pending,
    Granted,
    Refused,
}

impl ConsentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ConsentStatus::Pending => "pending",
            ConsentStatus::Granted => "granted",
            ConsentStatus::Refused => "refused",
        }
    }

    fn for_status(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Pending => ConsentStatus::Pending,
            MatchStatus::Approved | MatchStatus::Enrolled => ConsentStatus::Granted,
            MatchStatus::Declined => ConsentStatus::Refused,
        }
    }
}

/// Delivery state of the notification announcing a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }
}

/// Append-only history entry for a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: MatchStatus,
    pub timestamp: DateTime<Utc>,
    pub changed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move match from {} to {}", .from.label(), .to.label())]
pub struct TransitionError {
    pub from: MatchStatus,
    pub to: MatchStatus,
}

/// Identity used to keep at most one match per patient, trial, and consultation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub patient_id: PatientId,
    pub trial_id: TrialId,
    pub consultation_id: ConsultationId,
}

impl MatchKey {
    pub fn matches(&self, record: &TrialMatch) -> bool {
        self.patient_id == record.patient_id
            && self.trial_id == record.trial_id
            && self.consultation_id == record.consultation_id
    }
}

/// Persisted match between a patient and a trial for one consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMatch {
    pub match_id: MatchId,
    pub patient_id: PatientId,
    pub trial_id: TrialId,
    pub consultation_id: ConsultationId,
    pub relevance_score: u8,
    pub match_reason: String,
    pub status: MatchStatus,
    pub notification_status: NotificationStatus,
    pub consent_status: ConsentStatus,
    pub match_date: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl TrialMatch {
    /// Build a fresh `pending` match from a scored trial.
    pub fn from_scored(
        match_id: MatchId,
        patient_id: PatientId,
        consultation_id: ConsultationId,
        scored: &ScoredTrial,
        match_date: DateTime<Utc>,
    ) -> Self {
        Self {
            match_id,
            patient_id,
            trial_id: scored.trial.trial_id.clone(),
            consultation_id,
            relevance_score: scored.relevance_score,
            match_reason: scored.match_reason(),
            status: MatchStatus::Pending,
            notification_status: NotificationStatus::Pending,
            consent_status: ConsentStatus::Pending,
            match_date,
            history: Vec::new(),
        }
    }

    pub fn key(&self) -> MatchKey {
        MatchKey {
            patient_id: self.patient_id.clone(),
            trial_id: self.trial_id.clone(),
            consultation_id: self.consultation_id.clone(),
        }
    }

    /// Apply a status transition, appending to the history log.
    pub fn transition(
        &mut self,
        next: MatchStatus,
        changed_by: impl Into<String>,
        note: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.consent_status = ConsentStatus::for_status(next);
        self.history.push(StatusChange {
            status: next,
            timestamp,
            changed_by: changed_by.into(),
            note,
        });
        Ok(())
    }

    pub fn awaiting_consent(&self) -> bool {
        self.consent_status == ConsentStatus::Pending && !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pending_match() -> TrialMatch {
        TrialMatch {
            match_id: MatchId("match-000001".to_string()),
            patient_id: PatientId("patient-1".to_string()),
            trial_id: TrialId("NCT-1".to_string()),
            consultation_id: ConsultationId("consult-1".to_string()),
            relevance_score: 92,
            match_reason: "Condition match".to_string(),
            status: MatchStatus::Pending,
            notification_status: NotificationStatus::Pending,
            consent_status: ConsentStatus::Pending,
            match_date: Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap(),
            history: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 2, 14, 30, 0).unwrap()
    }

    #[test]
    fn approve_then_enroll_records_history() {
        let mut record = pending_match();
        record
            .transition(MatchStatus::Approved, "dr-house", None, now())
            .expect("pending can be approved");
        record
            .transition(
                MatchStatus::Enrolled,
                "coordinator",
                Some("randomised to arm B".to_string()),
                now(),
            )
            .expect("approved can enroll");

        assert_eq!(record.status, MatchStatus::Enrolled);
        assert_eq!(record.consent_status, ConsentStatus::Granted);
        let statuses: Vec<_> = record.history.iter().map(|change| change.status).collect();
        assert_eq!(statuses, vec![MatchStatus::Approved, MatchStatus::Enrolled]);
        assert_eq!(record.history[1].note.as_deref(), Some("randomised to arm B"));
    }

    #[test]
    fn pending_cannot_skip_to_enrolled() {
        let mut record = pending_match();
        let error = record
            .transition(MatchStatus::Enrolled, "coordinator", None, now())
            .expect_err("enrollment requires approval");

        assert_eq!(
            error,
            TransitionError {
                from: MatchStatus::Pending,
                to: MatchStatus::Enrolled
            }
        );
        assert_eq!(error.to_string(), "cannot move match from pending to enrolled");
        assert!(record.history.is_empty());
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for terminal in [MatchStatus::Declined, MatchStatus::Enrolled] {
            for next in MatchStatus::ORDERED {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn declining_refuses_consent() {
        let mut record = pending_match();
        record
            .transition(MatchStatus::Declined, "patient-1", None, now())
            .expect("pending can be declined");
        assert_eq!(record.consent_status, ConsentStatus::Refused);
        assert!(!record.awaiting_consent());
    }
}
