use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::matching::domain::{
    AgeRange, Condition, PatientDemographics, PatientId, PatientMedicalData, PatientProfile,
    Severity, TrialId, TrialRecord, TrialStatus,
};
use crate::workflows::matching::events::MatchEvent;
use crate::workflows::matching::lifecycle::{MatchKey, MatchStatus, TrialMatch};
use crate::workflows::matching::repository::{
    InsertOutcome, MatchNotifier, MatchRepository, NotifyError, PatientDirectory,
    RepositoryError, TrialCatalog,
};
use crate::workflows::matching::{matching_router, MatchId, TrialMatchingService, TrialScorer};

pub(super) fn diabetes_patient() -> PatientMedicalData {
    PatientMedicalData {
        conditions: vec![Condition::new("Diabetes", Severity::Moderate)],
        medications: Vec::new(),
        allergies: Vec::new(),
        comorbidities: Vec::new(),
    }
}

pub(super) fn demographics(age: Option<u32>, gender: Option<&str>) -> PatientDemographics {
    PatientDemographics {
        age,
        gender: gender.map(str::to_string),
    }
}

pub(super) fn female_45() -> PatientDemographics {
    demographics(Some(45), Some("female"))
}

pub(super) fn diabetes_trial(id: &str) -> TrialRecord {
    TrialRecord {
        trial_id: TrialId(id.to_string()),
        title: format!("Glycemic control study {id}"),
        status: TrialStatus::Recruiting,
        target_conditions: vec!["diabetes".to_string()],
        exclusion_criteria: Vec::new(),
        age_range: Some(AgeRange { min: 18, max: 65 }),
        gender_restriction: Some("female".to_string()),
    }
}

/// Trial the 45-year-old diabetes patient scores exactly 75 against: two years past the
/// age window (9/15) and excluded by gender (0/10), 71.5/95 overall.
pub(super) fn seventy_five_trial(id: &str) -> TrialRecord {
    TrialRecord {
        age_range: Some(AgeRange { min: 18, max: 43 }),
        gender_restriction: Some("male".to_string()),
        ..diabetes_trial(id)
    }
}

pub(super) fn unrelated_trial(id: &str) -> TrialRecord {
    TrialRecord {
        trial_id: TrialId(id.to_string()),
        title: "Pediatric asthma inhaler study".to_string(),
        status: TrialStatus::Recruiting,
        target_conditions: vec!["asthma".to_string()],
        exclusion_criteria: Vec::new(),
        age_range: Some(AgeRange { min: 6, max: 12 }),
        gender_restriction: Some("male".to_string()),
    }
}

pub(super) fn patient_profile(id: &str) -> PatientProfile {
    PatientProfile {
        patient_id: PatientId(id.to_string()),
        demographics: female_45(),
        medical_data: diabetes_patient(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    profiles: Arc<Mutex<HashMap<PatientId, PatientProfile>>>,
}

impl MemoryDirectory {
    pub(super) fn with(profiles: Vec<PatientProfile>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.profiles.lock().expect("directory mutex poisoned");
            for profile in profiles {
                guard.insert(profile.patient_id.clone(), profile);
            }
        }
        directory
    }
}

impl PatientDirectory for MemoryDirectory {
    fn profile(&self, id: &PatientId) -> Result<Option<PatientProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryCatalog {
    trials: Vec<TrialRecord>,
}

impl MemoryCatalog {
    pub(super) fn with(trials: Vec<TrialRecord>) -> Self {
        Self { trials }
    }
}

impl TrialCatalog for MemoryCatalog {
    fn open_trials(&self) -> Result<Vec<TrialRecord>, RepositoryError> {
        Ok(self.trials.clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMatches {
    pub(super) records: Arc<Mutex<Vec<TrialMatch>>>,
}

impl MemoryMatches {
    pub(super) fn all(&self) -> Vec<TrialMatch> {
        self.records.lock().expect("match mutex poisoned").clone()
    }
}

impl MatchRepository for MemoryMatches {
    fn insert_if_absent<F>(
        &self,
        key: &MatchKey,
        build: F,
    ) -> Result<InsertOutcome, RepositoryError>
    where
        F: FnOnce() -> TrialMatch,
    {
        let mut guard = self.records.lock().expect("match mutex poisoned");
        if let Some(existing) = guard.iter().find(|stored| key.matches(stored)) {
            return Ok(InsertOutcome::Duplicate(existing.match_id.clone()));
        }
        let record = build();
        guard.push(record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    fn modify<F, E>(&self, id: &MatchId, change: F) -> Result<TrialMatch, E>
    where
        F: FnOnce(&mut TrialMatch) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.records.lock().expect("match mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|stored| &stored.match_id == id)
            .ok_or(RepositoryError::NotFound)?;
        let mut draft = slot.clone();
        change(&mut draft)?;
        *slot = draft.clone();
        Ok(draft)
    }

    fn fetch(&self, id: &MatchId) -> Result<Option<TrialMatch>, RepositoryError> {
        let guard = self.records.lock().expect("match mutex poisoned");
        Ok(guard.iter().find(|stored| &stored.match_id == id).cloned())
    }

    fn for_patient(&self, id: &PatientId) -> Result<Vec<TrialMatch>, RepositoryError> {
        let guard = self.records.lock().expect("match mutex poisoned");
        Ok(guard
            .iter()
            .filter(|stored| &stored.patient_id == id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableMatches;

impl MatchRepository for UnavailableMatches {
    fn insert_if_absent<F>(
        &self,
        _key: &MatchKey,
        _build: F,
    ) -> Result<InsertOutcome, RepositoryError>
    where
        F: FnOnce() -> TrialMatch,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify<F, E>(&self, _id: &MatchId, _change: F) -> Result<TrialMatch, E>
    where
        F: FnOnce(&mut TrialMatch) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn fetch(&self, _id: &MatchId) -> Result<Option<TrialMatch>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_patient(&self, _id: &PatientId) -> Result<Vec<TrialMatch>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<MatchEvent>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<MatchEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl MatchNotifier for MemoryNotifier {
    fn notify(&self, event: &MatchEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event.clone());
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl MatchNotifier for FailingNotifier {
    fn notify(&self, _event: &MatchEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("push gateway down".to_string()))
    }
}

/// Notifier that approves each new match while the notification is in flight, the way a
/// clinician acting on the alert would.
pub(super) struct ApprovingNotifier {
    pub(super) matches: Arc<MemoryMatches>,
}

impl MatchNotifier for ApprovingNotifier {
    fn notify(&self, event: &MatchEvent) -> Result<(), NotifyError> {
        if let MatchEvent::MatchCreated { match_id, .. } = event {
            self.matches
                .modify(match_id, |stored| {
                    stored
                        .transition(MatchStatus::Approved, "dr-alert", None, Utc::now())
                        .map_err(|err| RepositoryError::Unavailable(err.to_string()))
                })
                .map_err(|err| NotifyError::Transport(err.to_string()))?;
        }
        Ok(())
    }
}

pub(super) type MemoryService =
    TrialMatchingService<MemoryDirectory, MemoryCatalog, MemoryMatches, MemoryNotifier>;

pub(super) fn build_service(
    trials: Vec<TrialRecord>,
) -> (MemoryService, Arc<MemoryMatches>, Arc<MemoryNotifier>) {
    let directory = Arc::new(MemoryDirectory::with(vec![patient_profile("patient-1")]));
    let catalog = Arc::new(MemoryCatalog::with(trials));
    let matches = Arc::new(MemoryMatches::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = TrialMatchingService::new(
        directory,
        catalog,
        matches.clone(),
        notifier.clone(),
        TrialScorer::default(),
    );
    (service, matches, notifier)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    matching_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
