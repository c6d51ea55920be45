//! Clinical trial matching: relevance scoring, match persistence, and the consent lifecycle.
//!
//! The scorer is a pure function over a patient profile and a trial catalog. Everything
//! stateful (patient lookup, catalog, match storage, notifications) sits behind the traits
//! in [`repository`] and is injected into [`TrialMatchingService`].

pub mod domain;
pub mod events;
pub mod lifecycle;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AgeRange, Condition, ConsultationId, MatchId, PatientDemographics, PatientId,
    PatientMedicalData, PatientProfile, Severity, TrialId, TrialRecord, TrialStatus,
};
pub use events::{EventDispatcher, MatchEvent, MatchEventKind};
pub use lifecycle::{
    ConsentStatus, MatchKey, MatchStatus, NotificationStatus, StatusChange, TransitionError,
    TrialMatch,
};
pub use report::{MatchSummary, StatusCount};
pub use repository::{
    InsertOutcome, MatchNotifier, MatchRepository, MatchView, NotifyError, PatientDirectory,
    RepositoryError, TrialCatalog,
};
pub use router::{matching_router, ScoreRequest, ScoreResponse, StatusUpdateRequest};
pub use scoring::{Criterion, CriterionScore, ScoredTrial, TrialScorer, DEFAULT_MINIMUM_RELEVANCE};
pub use service::{MatchRun, MatchingServiceError, TrialMatchingService};
