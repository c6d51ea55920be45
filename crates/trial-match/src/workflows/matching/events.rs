//! In-process event dispatch for match notifications.
//!
//! Handlers run synchronously on the caller's thread in subscription order. Nothing is
//! persisted or retried; an event with no subscribers is dropped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::debug;

use super::domain::{MatchId, PatientId, TrialId};
use super::lifecycle::MatchStatus;
use super::repository::{MatchNotifier, NotifyError};

/// Events emitted by the matching workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchCreated {
        match_id: MatchId,
        patient_id: PatientId,
        trial_id: TrialId,
        relevance_score: u8,
    },
    StatusChanged {
        match_id: MatchId,
        patient_id: PatientId,
        from: MatchStatus,
        to: MatchStatus,
        changed_by: String,
    },
}

impl MatchEvent {
    pub fn kind(&self) -> MatchEventKind {
        match self {
            MatchEvent::MatchCreated { .. } => MatchEventKind::MatchCreated,
            MatchEvent::StatusChanged { .. } => MatchEventKind::StatusChanged,
        }
    }

    pub fn match_id(&self) -> &MatchId {
        match self {
            MatchEvent::MatchCreated { match_id, .. } | MatchEvent::StatusChanged { match_id, .. } => {
                match_id
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchEventKind {
    MatchCreated,
    StatusChanged,
}

type Handler = Arc<dyn Fn(&MatchEvent) -> Result<(), NotifyError> + Send + Sync>;

/// Synchronous callback map keyed by event kind.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<MatchEventKind, Vec<Handler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: MatchEventKind, handler: F)
    where
        F: Fn(&MatchEvent) -> Result<(), NotifyError> + Send + Sync + 'static,
    {
        let mut guard = self.handlers.write().expect("dispatcher lock poisoned");
        guard.entry(kind).or_default().push(Arc::new(handler));
    }

    pub fn subscriber_count(&self, kind: MatchEventKind) -> usize {
        let guard = self.handlers.read().expect("dispatcher lock poisoned");
        guard.get(&kind).map(Vec::len).unwrap_or(0)
    }

    /// Invoke every handler for the event's kind. All handlers run even if one fails;
    /// the first failure is returned.
    pub fn dispatch(&self, event: &MatchEvent) -> Result<(), NotifyError> {
        let handlers: Vec<Handler> = {
            let guard = self.handlers.read().expect("dispatcher lock poisoned");
            guard.get(&event.kind()).cloned().unwrap_or_default()
        };

        debug!(kind = ?event.kind(), match_id = %event.match_id().0, handlers = handlers.len(), "dispatching match event");

        let mut first_error = None;
        for handler in handlers {
            if let Err(err) = handler(event) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MatchNotifier for EventDispatcher {
    fn notify(&self, event: &MatchEvent) -> Result<(), NotifyError> {
        self.dispatch(event)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.handlers.read().expect("dispatcher lock poisoned");
        let counts: HashMap<_, _> = guard.iter().map(|(kind, list)| (*kind, list.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .finish()
    }
}
