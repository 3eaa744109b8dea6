use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::{Deserialize, Serialize};

/// Request body for saving a judge score.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaveScoreRequest {
    /// Score from 1 to 10.
    #[schema(example = 8)]
    pub score: i32,
    #[serde(default)]
    pub comment: String,
    /// Must be true to replace an existing score.
    #[serde(default)]
    pub confirm_overwrite: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeScoreResponse {
    pub competition_id: i32,
    pub participant_id: String,
    pub challenge_id: i32,
    pub judge_id: String,
    pub score: i32,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::judge_score::Model> for JudgeScoreResponse {
    fn from(m: crate::entity::judge_score::Model) -> Self {
        Self {
            competition_id: m.competition_id,
            participant_id: m.participant_id,
            challenge_id: m.challenge_id,
            judge_id: m.judge_id,
            score: m.score,
            comment: m.comment,
            updated_at: m.updated_at,
        }
    }
}

/// Request body for locking a participant.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LockParticipantRequest {
    /// Must be exactly `SURE`.
    #[schema(example = "SURE")]
    pub confirmation: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LockResponse {
    pub competition_id: i32,
    pub user_id: String,
    pub locked: bool,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    /// Submissions moved to `Finalized`.
    pub finalized_submissions: u64,
}

/// Scoring progress for one participant.
#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeParticipantItem {
    pub user_id: String,
    pub display_name: String,
    pub institution: Option<String>,
    pub locked: bool,
    pub total_submissions: u64,
    pub scored_submissions: u64,
}

/// A submission on the judge's scoring sheet.
#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeSubmissionItem {
    pub challenge_id: i32,
    pub challenge_title: String,
    pub prompt_text: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub judge_score: Option<JudgeScoreResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeSheetResponse {
    pub user_id: String,
    pub locked: bool,
    pub submissions: Vec<JudgeSubmissionItem>,
    /// Submissions still needing a score.
    pub remaining: u64,
}
