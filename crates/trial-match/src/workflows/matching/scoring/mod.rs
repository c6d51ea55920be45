//! Trial relevance scoring.
//!
//! Each trial is scored on six weighted criteria, converted to a 0-100 relevance score
//! against the live sum of the weights, filtered by a minimum relevance and ranked with
//! a stable sort so ties keep catalog order. Scoring is pure: no I/O, no shared state.

mod criteria;
mod factors;
mod rules;

pub use criteria::Criterion;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{PatientDemographics, PatientMedicalData, TrialRecord};
use crate::config::MatchingConfig;

/// Trials below this relevance are dropped unless configured otherwise.
pub const DEFAULT_MINIMUM_RELEVANCE: u8 = 50;

/// Points awarded for a single criterion together with the explanation shown to clinicians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub score: f64,
    pub reason: String,
}

impl CriterionScore {
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score,
            reason: reason.into(),
        }
    }
}

/// A trial with its relevance score and the audit trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrial {
    pub trial: TrialRecord,
    pub relevance_score: u8,
    pub score_components: BTreeMap<Criterion, CriterionScore>,
    pub matching_factors: Vec<String>,
}

impl ScoredTrial {
    /// Comma-joined factors, as stored on persisted matches.
    pub fn match_reason(&self) -> String {
        self.matching_factors.join(", ")
    }

    pub fn component(&self, criterion: Criterion) -> Option<&CriterionScore> {
        self.score_components.get(&criterion)
    }
}

/// Stateless scorer applying the weighted rubric to a trial catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialScorer {
    minimum_relevance: u8,
}

impl Default for TrialScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_RELEVANCE)
    }
}

impl TrialScorer {
    pub fn new(minimum_relevance: u8) -> Self {
        Self {
            minimum_relevance: minimum_relevance.min(100),
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.minimum_relevance)
    }

    pub fn minimum_relevance(&self) -> u8 {
        self.minimum_relevance
    }

    /// Score every trial, keep those at or above the minimum relevance, and rank them
    /// highest first. Equal scores keep their catalog order.
    pub fn score(
        &self,
        patient: &PatientMedicalData,
        demographics: &PatientDemographics,
        trials: &[TrialRecord],
    ) -> Vec<ScoredTrial> {
        let mut ranked: Vec<ScoredTrial> = trials
            .iter()
            .map(|trial| self.score_trial(patient, demographics, trial))
            .filter(|scored| scored.relevance_score >= self.minimum_relevance)
            .collect();

        // `sort_by` is stable.
        ranked.sort_by(|left, right| right.relevance_score.cmp(&left.relevance_score));
        ranked
    }

    /// Score a single trial without applying the relevance threshold.
    pub fn score_trial(
        &self,
        patient: &PatientMedicalData,
        demographics: &PatientDemographics,
        trial: &TrialRecord,
    ) -> ScoredTrial {
        let mut components = BTreeMap::new();
        components.insert(
            Criterion::ConditionMatch,
            rules::score_condition_match(patient, trial),
        );
        components.insert(Criterion::AgeMatch, rules::score_age_match(demographics, trial));
        components.insert(
            Criterion::GenderMatch,
            rules::score_gender_match(demographics, trial),
        );
        components.insert(
            Criterion::MedicationMatch,
            rules::score_medication_match(patient, trial),
        );
        components.insert(
            Criterion::ComorbidityMatch,
            rules::score_comorbidity_match(patient, trial),
        );
        components.insert(
            Criterion::AllergyMatch,
            rules::score_allergy_match(patient, trial),
        );

        let relevance_score = relevance_from(&components);
        let matching_factors = factors::matching_factors(&components);

        ScoredTrial {
            trial: trial.clone(),
            relevance_score,
            score_components: components,
            matching_factors,
        }
    }
}

fn relevance_from(components: &BTreeMap<Criterion, CriterionScore>) -> u8 {
    let total_weighted: f64 = components.values().map(|component| component.score).sum();
    let total_possible = Criterion::total_weight();
    if total_possible <= 0.0 {
        return 0;
    }

    let percentage = (100.0 * total_weighted / total_possible).clamp(0.0, 100.0);
    percentage.round() as u8
}
