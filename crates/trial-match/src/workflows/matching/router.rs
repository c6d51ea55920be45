use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ConsultationId, MatchId, PatientDemographics, PatientId, PatientMedicalData, TrialId,
    TrialRecord,
};
use super::lifecycle::MatchStatus;
use super::repository::{MatchNotifier, MatchRepository, MatchView, PatientDirectory, TrialCatalog};
use super::scoring::{ScoredTrial, TrialScorer};
use super::service::{MatchingServiceError, TrialMatchingService};

/// Ad-hoc scoring request carrying the patient and the candidate trials inline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoreRequest {
    pub patient: PatientMedicalData,
    #[serde(default)]
    pub demographics: PatientDemographics,
    #[serde(default)]
    pub trials: Vec<TrialRecord>,
    #[serde(default)]
    pub minimum_relevance: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub minimum_relevance: u8,
    pub evaluated: usize,
    pub results: Vec<ScoredTrial>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusUpdateRequest {
    pub status: MatchStatus,
    pub changed_by: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRunView {
    pub patient_id: PatientId,
    pub consultation_id: ConsultationId,
    pub created: Vec<MatchView>,
    pub duplicates: Vec<TrialId>,
    pub ranked: usize,
}

/// Router builder exposing HTTP endpoints for scoring and the match workflow.
pub fn matching_router<P, C, M, N>(service: Arc<TrialMatchingService<P, C, M, N>>) -> Router
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    Router::new()
        .route("/api/v1/trials/score", post(score_handler::<P, C, M, N>))
        .route(
            "/api/v1/patients/:patient_id/consultations/:consultation_id/matches",
            post(match_consultation_handler::<P, C, M, N>),
        )
        .route(
            "/api/v1/patients/:patient_id/matches/summary",
            get(summary_handler::<P, C, M, N>),
        )
        .route("/api/v1/matches/:match_id", get(match_handler::<P, C, M, N>))
        .route(
            "/api/v1/matches/:match_id/status",
            post(status_update_handler::<P, C, M, N>),
        )
        .with_state(service)
}

fn error_response(error: MatchingServiceError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, "matching request failed");
    }
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn score_handler<P, C, M, N>(
    State(service): State<Arc<TrialMatchingService<P, C, M, N>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    let scorer = match request.minimum_relevance {
        Some(threshold) if threshold > 100 => {
            let payload = json!({ "error": "minimum_relevance must be between 0 and 100" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
        Some(threshold) => TrialScorer::new(threshold),
        None => *service.scorer(),
    };

    let results = scorer.score(&request.patient, &request.demographics, &request.trials);
    let response = ScoreResponse {
        minimum_relevance: scorer.minimum_relevance(),
        evaluated: request.trials.len(),
        results,
    };
    (StatusCode::OK, axum::Json(response)).into_response()
}

pub(crate) async fn match_consultation_handler<P, C, M, N>(
    State(service): State<Arc<TrialMatchingService<P, C, M, N>>>,
    Path((patient_id, consultation_id)): Path<(String, String)>,
) -> Response
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    let patient_id = PatientId(patient_id);
    let consultation_id = ConsultationId(consultation_id);
    match service.match_consultation(&patient_id, &consultation_id) {
        Ok(run) => {
            let view = MatchRunView {
                patient_id: run.patient_id,
                consultation_id: run.consultation_id,
                created: run.created.iter().map(|record| record.view()).collect(),
                duplicates: run.duplicates,
                ranked: run.ranked.len(),
            };
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn match_handler<P, C, M, N>(
    State(service): State<Arc<TrialMatchingService<P, C, M, N>>>,
    Path(match_id): Path<String>,
) -> Response
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    match service.get(&MatchId(match_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_update_handler<P, C, M, N>(
    State(service): State<Arc<TrialMatchingService<P, C, M, N>>>,
    Path(match_id): Path<String>,
    axum::Json(request): axum::Json<StatusUpdateRequest>,
) -> Response
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    if request.changed_by.trim().is_empty() {
        let payload = json!({ "error": "changed_by is required" });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    let StatusUpdateRequest {
        status,
        changed_by,
        note,
    } = request;
    match service.update_status(&MatchId(match_id), status, changed_by.trim(), note) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn summary_handler<P, C, M, N>(
    State(service): State<Arc<TrialMatchingService<P, C, M, N>>>,
    Path(patient_id): Path<String>,
) -> Response
where
    P: PatientDirectory + 'static,
    C: TrialCatalog + 'static,
    M: MatchRepository + 'static,
    N: MatchNotifier + 'static,
{
    match service.summary(&PatientId(patient_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}
