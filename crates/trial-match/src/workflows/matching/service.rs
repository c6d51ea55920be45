use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{ConsultationId, MatchId, PatientId, PatientProfile, TrialId};
use super::events::MatchEvent;
use super::lifecycle::{MatchKey, MatchStatus, NotificationStatus, TransitionError, TrialMatch};
use super::report::MatchSummary;
use super::repository::{
    InsertOutcome, MatchNotifier, MatchRepository, PatientDirectory, RepositoryError,
    TrialCatalog,
};
use super::scoring::{ScoredTrial, TrialScorer};

/// Workflow composing the patient directory, trial catalog, scorer, match store, and notifier.
///
/// Collaborators are injected; the service owns no global state beyond its match id sequence.
pub struct TrialMatchingService<P, C, M, N> {
    directory: Arc<P>,
    catalog: Arc<C>,
    repository: Arc<M>,
    notifier: Arc<N>,
    scorer: TrialScorer,
    sequence: AtomicU64,
}

/// Outcome of matching one consultation against the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRun {
    pub patient_id: PatientId,
    pub consultation_id: ConsultationId,
    pub created: Vec<TrialMatch>,
    pub duplicates: Vec<TrialId>,
    pub ranked: Vec<ScoredTrial>,
}

impl<P, C, M, N> TrialMatchingService<P, C, M, N>
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    pub fn new(
        directory: Arc<P>,
        catalog: Arc<C>,
        repository: Arc<M>,
        notifier: Arc<N>,
        scorer: TrialScorer,
    ) -> Self {
        Self {
            directory,
            catalog,
            repository,
            notifier,
            scorer,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn scorer(&self) -> &TrialScorer {
        &self.scorer
    }

    fn next_match_id(&self) -> MatchId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        MatchId(format!("match-{id:06}"))
    }

    fn load_profile(&self, patient_id: &PatientId) -> Result<PatientProfile, MatchingServiceError> {
        self.directory
            .profile(patient_id)?
            .ok_or_else(|| MatchingServiceError::PatientNotFound(patient_id.clone()))
    }

    /// Rank open trials for a patient without persisting anything.
    pub fn preview(&self, patient_id: &PatientId) -> Result<Vec<ScoredTrial>, MatchingServiceError> {
        let profile = self.load_profile(patient_id)?;
        self.rank_for(&profile)
    }

    fn rank_for(&self, profile: &PatientProfile) -> Result<Vec<ScoredTrial>, MatchingServiceError> {
        let trials: Vec<_> = self
            .catalog
            .open_trials()?
            .into_iter()
            .filter(|trial| trial.status.is_open())
            .collect();

        let ranked = self
            .scorer
            .score(&profile.medical_data, &profile.demographics, &trials);

        debug!(
            patient_id = %profile.patient_id.0,
            candidates = trials.len(),
            retained = ranked.len(),
            minimum_relevance = self.scorer.minimum_relevance(),
            "scored trial catalog"
        );
        Ok(ranked)
    }

    /// Score the catalog for a consultation and persist new matches, skipping trials
    /// already matched for the same patient and consultation.
    pub fn match_consultation(
        &self,
        patient_id: &PatientId,
        consultation_id: &ConsultationId,
    ) -> Result<MatchRun, MatchingServiceError> {
        let profile = self.load_profile(patient_id)?;
        let ranked = self.rank_for(&profile)?;

        let mut created = Vec::new();
        let mut duplicates = Vec::new();

        for scored in &ranked {
            let key = MatchKey {
                patient_id: patient_id.clone(),
                trial_id: scored.trial.trial_id.clone(),
                consultation_id: consultation_id.clone(),
            };
            let outcome = self.repository.insert_if_absent(&key, || {
                TrialMatch::from_scored(
                    self.next_match_id(),
                    patient_id.clone(),
                    consultation_id.clone(),
                    scored,
                    Utc::now(),
                )
            })?;

            match outcome {
                InsertOutcome::Inserted(record) => created.push(self.announce(record)?),
                InsertOutcome::Duplicate(existing) => {
                    debug!(match_id = %existing.0, trial_id = %scored.trial.trial_id.0, "match already recorded");
                    duplicates.push(scored.trial.trial_id.clone());
                }
            }
        }

        info!(
            patient_id = %patient_id.0,
            consultation_id = %consultation_id.0,
            created = created.len(),
            duplicates = duplicates.len(),
            "consultation matched against trial catalog"
        );

        Ok(MatchRun {
            patient_id: patient_id.clone(),
            consultation_id: consultation_id.clone(),
            created,
            duplicates,
            ranked,
        })
    }

    /// Notify about a freshly stored match and record the delivery state. Delivery
    /// failures are logged and recorded, never propagated. Only the notification status
    /// is written back, so status changes made meanwhile survive.
    fn announce(&self, record: TrialMatch) -> Result<TrialMatch, MatchingServiceError> {
        let event = MatchEvent::MatchCreated {
            match_id: record.match_id.clone(),
            patient_id: record.patient_id.clone(),
            trial_id: record.trial_id.clone(),
            relevance_score: record.relevance_score,
        };

        let delivery = match self.notifier.notify(&event) {
            Ok(()) => NotificationStatus::Sent,
            Err(err) => {
                warn!(match_id = %record.match_id.0, error = %err, "match notification failed");
                NotificationStatus::Failed
            }
        };

        self.repository.modify(&record.match_id, |stored| {
            stored.notification_status = delivery;
            Ok(())
        })
    }

    /// Move a match through the consent lifecycle.
    pub fn update_status(
        &self,
        match_id: &MatchId,
        next: MatchStatus,
        changed_by: &str,
        note: Option<String>,
    ) -> Result<TrialMatch, MatchingServiceError> {
        let mut previous = next;
        let record = self.repository.modify(match_id, |stored| {
            previous = stored.status;
            stored
                .transition(next, changed_by, note, Utc::now())
                .map_err(MatchingServiceError::from)
        })?;

        info!(
            match_id = %match_id.0,
            from = previous.label(),
            to = next.label(),
            changed_by,
            "match status changed"
        );

        let event = MatchEvent::StatusChanged {
            match_id: match_id.clone(),
            patient_id: record.patient_id.clone(),
            from: previous,
            to: next,
            changed_by: changed_by.to_string(),
        };
        if let Err(err) = self.notifier.notify(&event) {
            warn!(match_id = %match_id.0, error = %err, "status change notification failed");
        }

        Ok(record)
    }

    /// Fetch a match for API responses.
    pub fn get(&self, match_id: &MatchId) -> Result<TrialMatch, MatchingServiceError> {
        let record = self
            .repository
            .fetch(match_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Summarise every match recorded for a patient.
    pub fn summary(&self, patient_id: &PatientId) -> Result<MatchSummary, MatchingServiceError> {
        let matches = self.repository.for_patient(patient_id)?;
        Ok(MatchSummary::from_matches(patient_id.clone(), &matches))
    }
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchingServiceError {
    #[error("patient {0} not found")]
    PatientNotFound(PatientId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl MatchingServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MatchingServiceError::PatientNotFound(_)
            | MatchingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            MatchingServiceError::Repository(RepositoryError::Conflict)
            | MatchingServiceError::Transition(_) => StatusCode::CONFLICT,
            MatchingServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
