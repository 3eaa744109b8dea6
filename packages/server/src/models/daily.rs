use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_body, validate_title};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateDailyChallengeRequest {
    #[schema(example = "Write a haiku generator prompt")]
    pub title: String,
    pub problem_statement: String,
    #[serde(default)]
    pub guidelines: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Defaults to true.
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateDailyChallengeRequest {
    pub title: Option<String>,
    pub problem_statement: Option<String>,
    pub guidelines: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct DailyChallengeListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub active: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DailyChallengeResponse {
    pub id: i32,
    pub title: String,
    pub problem_statement: String,
    pub guidelines: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub total_submissions: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::daily_challenge::Model> for DailyChallengeResponse {
    fn from(m: crate::entity::daily_challenge::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            problem_statement: m.problem_statement,
            guidelines: m.guidelines,
            start_time: m.start_time,
            end_time: m.end_time,
            is_active: m.is_active,
            total_submissions: m.total_submissions,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DailyChallengeListResponse {
    pub data: Vec<DailyChallengeResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct DailySubmissionRequest {
    pub prompt_text: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DailySubmissionResponse {
    pub daily_challenge_id: i32,
    pub user_id: String,
    pub display_name: String,
    pub prompt_text: String,
    pub vote_count: i32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub daily_challenge_id: i32,
    pub author_id: String,
    pub vote_count: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DailyStatsResponse {
    #[schema(example = 12)]
    pub total_challenges: i64,
    #[schema(example = 340)]
    pub total_submissions: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::daily_stats::Model> for DailyStatsResponse {
    fn from(m: crate::entity::daily_stats::Model) -> Self {
        Self {
            total_challenges: m.total_challenges,
            total_submissions: m.total_submissions,
            updated_at: m.updated_at,
        }
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_daily(req: &CreateDailyChallengeRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body(&req.problem_statement, "Problem statement")?;
    validate_window(req.start_time, req.end_time)
}

pub fn validate_update_daily(req: &UpdateDailyChallengeRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref statement) = req.problem_statement {
        validate_body(statement, "Problem statement")?;
    }
    if let (Some(start), Some(end)) = (req.start_time, req.end_time) {
        validate_window(start, end)?;
    }
    Ok(())
}

/// Re-check the window after merging a PATCH with stored values.
pub fn validate_merged_daily(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    validate_window(start, end)
}
