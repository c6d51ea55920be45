use serde::Serialize;

use super::domain::{PatientId, TrialId};
use super::lifecycle::{MatchStatus, NotificationStatus, TrialMatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: MatchStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Per-patient roll-up of recorded trial matches for the clinician dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub patient_id: PatientId,
    pub total: usize,
    pub by_status: Vec<StatusCount>,
    pub awaiting_consent: usize,
    pub failed_notifications: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_relevance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_trial: Option<TrialId>,
}

impl MatchSummary {
    pub fn from_matches(patient_id: PatientId, matches: &[TrialMatch]) -> Self {
        let by_status = MatchStatus::ORDERED
            .into_iter()
            .map(|status| StatusCount {
                status,
                status_label: status.label(),
                count: matches.iter().filter(|record| record.status == status).count(),
            })
            .collect();

        let average_relevance = if matches.is_empty() {
            None
        } else {
            let sum: u32 = matches
                .iter()
                .map(|record| u32::from(record.relevance_score))
                .sum();
            Some(f64::from(sum) / matches.len() as f64)
        };

        // First entry in `matches` wins ties.
        let top_trial = matches
            .iter()
            .fold(None::<&TrialMatch>, |best, record| match best {
                Some(current) if current.relevance_score >= record.relevance_score => Some(current),
                _ => Some(record),
            })
            .map(|record| record.trial_id.clone());

        Self {
            patient_id,
            total: matches.len(),
            by_status,
            awaiting_consent: matches.iter().filter(|record| record.awaiting_consent()).count(),
            failed_notifications: matches
                .iter()
                .filter(|record| record.notification_status == NotificationStatus::Failed)
                .count(),
            average_relevance,
            top_trial,
        }
    }

    pub fn count(&self, status: MatchStatus) -> usize {
        self.by_status
            .iter()
            .find(|entry| entry.status == status)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}
