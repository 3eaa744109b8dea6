use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::{Deserialize, Serialize};

use super::evaluation::LlmScoreCard;
use super::shared::validate_bulk_ids;
use crate::error::AppError;

#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardEntryResponse {
    #[schema(example = 1)]
    pub rank: i32,
    pub user_id: String,
    pub display_name: String,
    pub institution: Option<String>,
    pub total_score: f64,
    pub llm_score: Option<f64>,
    pub judge_score: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    pub competition_id: i32,
    pub entries: Vec<LeaderboardEntryResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PublishedEntry {
    pub user_id: String,
    pub rank: i32,
    pub total_score: f64,
    pub llm_score: Option<f64>,
    pub judge_score: Option<f64>,
}

/// Full replacement of a competition's leaderboard.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct PublishLeaderboardRequest {
    pub entries: Vec<PublishedEntry>,
}

pub fn validate_publish_leaderboard(req: &PublishLeaderboardRequest) -> Result<(), AppError> {
    if req.entries.iter().any(|e| e.rank < 1) {
        return Err(AppError::Validation("rank must be >= 1".into()));
    }
    if req.entries.iter().any(|e| !e.total_score.is_finite()) {
        return Err(AppError::Validation("total_score must be finite".into()));
    }
    if req.entries.is_empty() {
        return Ok(());
    }
    let ids: Vec<&str> = req.entries.iter().map(|e| e.user_id.as_str()).collect();
    validate_bulk_ids(&ids, "user", 10_000)
}

/// One submission in the results modal.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionDetail {
    pub challenge_id: i32,
    pub challenge_title: String,
    pub prompt_text: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub judge_score: Option<i32>,
    pub judge_comment: Option<String>,
    pub score_cards: Vec<LlmScoreCard>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResultsResponse {
    pub user_id: String,
    pub display_name: String,
    pub institution: Option<String>,
    pub entry: Option<LeaderboardEntryResponse>,
    pub submissions: Vec<SubmissionDetail>,
}
