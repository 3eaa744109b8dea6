use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use common::evaluator::is_valid_llm_score;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_bulk_ids};
use crate::error::AppError;

/// Query parameters for the evaluation browser.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct EvaluationListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive search over prompt text and participant name.
    pub search: Option<String>,
    pub challenge_id: Option<i32>,
}

#[derive(Clone, Serialize, utoipa::ToSchema)]
pub struct LlmScoreCard {
    pub id: i32,
    #[schema(example = "gpt-4o")]
    pub model: String,
    #[schema(example = 87.5)]
    pub score: f64,
    pub rationale: String,
    pub evaluated_at: DateTime<Utc>,
}

impl From<crate::entity::llm_evaluation::Model> for LlmScoreCard {
    fn from(m: crate::entity::llm_evaluation::Model) -> Self {
        Self {
            id: m.id,
            model: m.model,
            score: m.score,
            rationale: m.rationale,
            evaluated_at: m.evaluated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EvaluationListItem {
    pub participant_id: String,
    pub display_name: String,
    pub challenge_id: i32,
    pub challenge_title: String,
    pub prompt_text: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    /// Mean of the score cards, null when none exist.
    pub average_score: Option<f64>,
    pub score_cards: Vec<LlmScoreCard>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EvaluationListResponse {
    pub data: Vec<EvaluationListItem>,
    pub pagination: Pagination,
}

/// One score card pushed by the evaluator.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct IngestScoreCard {
    pub participant_id: String,
    pub challenge_id: i32,
    pub model: String,
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct IngestEvaluationsRequest {
    pub results: Vec<IngestScoreCard>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct IngestEvaluationsResponse {
    pub ingested: u64,
}

/// Evaluator reply to a forwarded job.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EvaluatorJobResponse {
    pub competition_id: i32,
    /// Body returned by the evaluator, passed through unchanged.
    pub evaluator: serde_json::Value,
}

pub fn validate_ingest_evaluations(req: &IngestEvaluationsRequest) -> Result<(), AppError> {
    if req.results.is_empty() {
        return Err(AppError::Validation("results must not be empty".into()));
    }
    if req.results.len() > 1000 {
        return Err(AppError::Validation("Too many results: max 1000".into()));
    }
    for card in &req.results {
        let model = card.model.trim();
        if model.is_empty() || model.chars().count() > 64 {
            return Err(AppError::Validation(
                "Model name must be 1-64 characters".into(),
            ));
        }
        if !is_valid_llm_score(card.score) {
            return Err(AppError::Validation(
                "LLM score must be between 0 and 100".into(),
            ));
        }
    }
    let keys: Vec<String> = req
        .results
        .iter()
        .map(|c| format!("{}/{}/{}", c.participant_id, c.challenge_id, c.model.trim()))
        .collect();
    validate_bulk_ids(&keys, "score card", 1000)
}
