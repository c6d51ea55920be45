use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use trial_match::workflows::matching::{
    EventDispatcher, InsertOutcome, MatchEvent, MatchEventKind, MatchId, MatchKey,
    MatchRepository, PatientDirectory, PatientId, PatientProfile, RepositoryError, TrialMatch,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPatientDirectory {
    profiles: Arc<Mutex<HashMap<PatientId, PatientProfile>>>,
}

impl InMemoryPatientDirectory {
    pub(crate) fn insert(&self, profile: PatientProfile) {
        let mut guard = self.profiles.lock().expect("directory mutex poisoned");
        guard.insert(profile.patient_id.clone(), profile);
    }

    pub(crate) fn len(&self) -> usize {
        self.profiles.lock().expect("directory mutex poisoned").len()
    }
}

impl PatientDirectory for InMemoryPatientDirectory {
    fn profile(&self, id: &PatientId) -> Result<Option<PatientProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Match store keeping insertion order so patient listings stay ranked.
#[derive(Default, Clone)]
pub(crate) struct InMemoryMatchRepository {
    records: Arc<Mutex<Vec<TrialMatch>>>,
}

impl MatchRepository for InMemoryMatchRepository {
    fn insert_if_absent<F>(
        &self,
        key: &MatchKey,
        build: F,
    ) -> Result<InsertOutcome, RepositoryError>
    where
        F: FnOnce() -> TrialMatch,
    {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if let Some(existing) = guard.iter().find(|stored| key.matches(stored)) {
            return Ok(InsertOutcome::Duplicate(existing.match_id.clone()));
        }
        let record = build();
        if guard.iter().any(|stored| stored.match_id == record.match_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    fn modify<F, E>(&self, id: &MatchId, change: F) -> Result<TrialMatch, E>
    where
        F: FnOnce(&mut TrialMatch) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|stored| &stored.match_id == id).cloned())
    }

    fn for_patient(&self, id: &PatientId) -> Result<Vec<TrialMatch>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|stored| &stored.patient_id == id)
            .cloned()
            .collect())
    }
}

/// Dispatcher that records every match event in the service log.
pub(crate) fn logging_dispatcher() -> EventDispatcher {
    let dispatcher = EventDispatcher::new();
    dispatcher.subscribe(MatchEventKind::MatchCreated, |event| {
        if let MatchEvent::MatchCreated {
            match_id,
            patient_id,
            trial_id,
            relevance_score,
        } = event
        {
            info!(%match_id, %patient_id, %trial_id, relevance_score, "trial match created");
        }
        Ok(())
    });
    dispatcher.subscribe(MatchEventKind::StatusChanged, |event| {
        if let MatchEvent::StatusChanged {
            match_id,
            from,
            to,
            changed_by,
            ..
        } = event
        {
            info!(%match_id, from = from.label(), to = to.label(), %changed_by, "trial match status changed");
        }
        Ok(())
    });
    dispatcher
}
