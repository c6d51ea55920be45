use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ConsultationId, MatchId, PatientId, PatientProfile, TrialId, TrialRecord};
use super::events::MatchEvent;
use super::lifecycle::{MatchKey, TrialMatch};

/// Supplies structured patient data extracted upstream from consultations.
pub trait PatientDirectory: Send + Sync {
    fn profile(&self, id: &PatientId) -> Result<Option<PatientProfile>, RepositoryError>;
}

/// Supplies trials open to enrollment (`recruiting` or `active`).
pub trait TrialCatalog: Send + Sync {
    fn open_trials(&self) -> Result<Vec<TrialRecord>, RepositoryError>;
}

/// Result of an insert that must not duplicate a (patient, trial, consultation) match.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(TrialMatch),
    Duplicate(MatchId),
}

/// Storage abstraction for persisted matches.
///
/// Writes go through closures run while the implementation holds the record
/// exclusively, so concurrent writers never overwrite each other.
pub trait MatchRepository: Send + Sync {
    /// Store the record produced by `build` unless a match for `key` exists. The
    /// duplicate check, `build`, and the insert must happen atomically; `build` is not
    /// called for duplicates.
    fn insert_if_absent<F>(
        &self,
        key: &MatchKey,
        build: F,
    ) -> Result<InsertOutcome, RepositoryError>
    where
        F: FnOnce() -> TrialMatch;

    /// Apply `change` to the stored match and return the result. A change that errors
    /// leaves the stored record untouched.
    fn modify<F, E>(&self, id: &MatchId, change: F) -> Result<TrialMatch, E>
    where
        F: FnOnce(&mut TrialMatch) -> Result<(), E>,
        E: From<RepositoryError>;

    fn fetch(&self, id: &MatchId) -> Result<Option<TrialMatch>, RepositoryError>;
    fn for_patient(&self, id: &PatientId) -> Result<Vec<TrialMatch>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for match events (in-process dispatcher, e-mail adapters, ...).
pub trait MatchNotifier: Send + Sync {
    fn notify(&self, event: &MatchEvent) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of a match for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub patient_id: PatientId,
    pub trial_id: TrialId,
    pub consultation_id: ConsultationId,
    pub relevance_score: u8,
    pub match_reason: String,
    pub status: &'static str,
    pub consent_status: &'static str,
    pub notification_status: &'static str,
    pub match_date: DateTime<Utc>,
    pub history_len: usize,
}

impl TrialMatch {
    pub fn view(&self) -> MatchView {
        MatchView {
            match_id: self.match_id.clone(),
            patient_id: self.patient_id.clone(),
            trial_id: self.trial_id.clone(),
            consultation_id: self.consultation_id.clone(),
            relevance_score: self.relevance_score,
            match_reason: self.match_reason.clone(),
            status: self.status.label(),
            consent_status: self.consent_status.label(),
            notification_status: self.notification_status.label(),
            match_date: self.match_date,
            history_len: self.history.len(),
        }
    }
}
