use chrono::{DateTime, Utc};
use common::dashboard::DashboardState;
use common::{CompetitionLevel, CompetitionMode, Phase, SubmissionStatus, TimeWindow};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option, validate_body, validate_title};
use crate::error::AppError;

/// Request body for creating a competition.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCompetitionRequest {
    #[schema(example = "Prompt Masters 2026")]
    pub title: String,
    /// Markdown description.
    pub description: String,
    #[schema(example = "2026-03-01T09:00:00Z")]
    pub start_deadline: DateTime<Utc>,
    #[schema(example = "2026-03-02T09:00:00Z")]
    pub end_deadline: DateTime<Utc>,
    /// Defaults to true.
    pub is_active: Option<bool>,
    /// Defaults to false.
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub mode: CompetitionMode,
    /// Required for offline competitions.
    pub venue: Option<String>,
    #[serde(default)]
    pub level: CompetitionLevel,
    /// Prize pool in whole currency units. Defaults to 0.
    #[schema(example = 5000)]
    pub prize_money: Option<i64>,
    /// Instructions for the LLM evaluators.
    pub system_prompt: Option<String>,
}

/// Request body for updating a competition (PATCH semantics).
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCompetitionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_deadline: Option<DateTime<Utc>>,
    pub end_deadline: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub is_locked: Option<bool>,
    pub is_featured: Option<bool>,
    pub mode: Option<CompetitionMode>,
    /// Set to null to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub venue: Option<Option<String>>,
    pub level: Option<CompetitionLevel>,
    pub prize_money: Option<i64>,
    pub system_prompt: Option<String>,
}

/// Query parameters for competition listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CompetitionListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    /// Only featured competitions.
    pub featured: Option<bool>,
    /// Filter by the `is_active` flag.
    pub active: Option<bool>,
    /// Sort field: `created_at` (default), `start_deadline`, `end_deadline`, `title`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub start_deadline: DateTime<Utc>,
    pub end_deadline: DateTime<Utc>,
    pub is_active: bool,
    pub is_locked: bool,
    pub is_featured: bool,
    pub mode: CompetitionMode,
    pub venue: Option<String>,
    pub level: CompetitionLevel,
    pub prize_money: i64,
    pub system_prompt: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct CompetitionListItem {
    pub id: i32,
    pub title: String,
    pub start_deadline: DateTime<Utc>,
    pub end_deadline: DateTime<Utc>,
    pub is_active: bool,
    pub is_locked: bool,
    pub is_featured: bool,
    pub mode: CompetitionMode,
    pub level: CompetitionLevel,
    pub prize_money: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionListResponse {
    pub data: Vec<CompetitionListItem>,
    pub pagination: Pagination,
}

impl From<crate::entity::competition::Model> for CompetitionResponse {
    fn from(m: crate::entity::competition::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            start_deadline: m.start_deadline,
            end_deadline: m.end_deadline,
            is_active: m.is_active,
            is_locked: m.is_locked,
            is_featured: m.is_featured,
            mode: m.mode,
            venue: m.venue,
            level: m.level,
            prize_money: m.prize_money,
            system_prompt: m.system_prompt,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn validate_deadlines(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Validation(
            "end_deadline must be after start_deadline".into(),
        ));
    }
    Ok(())
}

/// Offline competitions need a venue; a blank venue counts as missing.
pub fn validate_venue(mode: CompetitionMode, venue: Option<&str>) -> Result<(), AppError> {
    let has_venue = venue.is_some_and(|v| !v.trim().is_empty());
    if mode == CompetitionMode::Offline && !has_venue {
        return Err(AppError::Validation(
            "Offline competitions require a venue".into(),
        ));
    }
    if venue.is_some_and(|v| v.chars().count() > 256) {
        return Err(AppError::Validation(
            "Venue must be at most 256 characters".into(),
        ));
    }
    Ok(())
}

fn validate_prize_money(prize_money: Option<i64>) -> Result<(), AppError> {
    if prize_money.is_some_and(|p| p < 0) {
        return Err(AppError::Validation("prize_money must be >= 0".into()));
    }
    Ok(())
}

pub fn validate_create_competition(req: &CreateCompetitionRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body(&req.description, "Description")?;
    validate_deadlines(req.start_deadline, req.end_deadline)?;
    validate_venue(req.mode, req.venue.as_deref())?;
    validate_prize_money(req.prize_money)
}

/// Field-level checks only; cross-field rules are re-checked against stored values.
pub fn validate_update_competition(req: &UpdateCompetitionRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_body(description, "Description")?;
    }
    if let (Some(start), Some(end)) = (req.start_deadline, req.end_deadline) {
        validate_deadlines(start, end)?;
    }
    validate_prize_money(req.prize_money)
}

/// Check the merged state of a competition after a PATCH.
pub fn validate_merged_competition(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mode: CompetitionMode,
    venue: Option<&str>,
) -> Result<(), AppError> {
    validate_deadlines(start, end)?;
    validate_venue(mode, venue)
}

// ---------------------------------------------------------------------------
// Challenges
// ---------------------------------------------------------------------------

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateChallengeRequest {
    #[schema(example = "Summarize a legal contract")]
    pub title: String,
    pub problem_statement: String,
    #[serde(default)]
    pub guidelines: String,
    pub end_deadline: DateTime<Utc>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateChallengeRequest {
    pub title: Option<String>,
    pub problem_statement: Option<String>,
    pub guidelines: Option<String>,
    pub end_deadline: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeResponse {
    pub id: i32,
    pub competition_id: i32,
    pub title: String,
    pub problem_statement: String,
    pub guidelines: String,
    pub end_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::challenge::Model> for ChallengeResponse {
    fn from(m: crate::entity::challenge::Model) -> Self {
        Self {
            id: m.id,
            competition_id: m.competition_id,
            title: m.title,
            problem_statement: m.problem_statement,
            guidelines: m.guidelines,
            end_deadline: m.end_deadline,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_challenge(req: &CreateChallengeRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body(&req.problem_statement, "Problem statement")?;
    if req.guidelines.len() > 1_000_000 {
        return Err(AppError::Validation(
            "Guidelines must be at most 1MB".into(),
        ));
    }
    Ok(())
}

pub fn validate_update_challenge(req: &UpdateChallengeRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref statement) = req.problem_statement {
        validate_body(statement, "Problem statement")?;
    }
    if req.guidelines.as_ref().is_some_and(|g| g.len() > 1_000_000) {
        return Err(AppError::Validation(
            "Guidelines must be at most 1MB".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Participants & batches
// ---------------------------------------------------------------------------

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddParticipantRequest {
    #[schema(example = "uid-alice")]
    pub user_id: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    pub competition_id: i32,
    pub user_id: String,
    pub display_name: String,
    pub institution: Option<String>,
    pub batch_id: Option<i32>,
    pub locked: bool,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub completed_challenges: i32,
    pub registered_at: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateBatchRequest {
    #[schema(example = "Morning batch")]
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchResponse {
    pub id: i32,
    pub competition_id: i32,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::batch::Model> for BatchResponse {
    fn from(m: crate::entity::batch::Model) -> Self {
        Self {
            id: m.id,
            competition_id: m.competition_id,
            name: m.name,
            start_time: m.start_time,
            end_time: m.end_time,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchDetailResponse {
    #[serde(flatten)]
    pub batch: BatchResponse,
    pub participants: Vec<ParticipantResponse>,
    pub challenges: Vec<ChallengeResponse>,
}

/// Assign participants to a batch. Users already in another batch are moved.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AssignBatchRequest {
    pub user_ids: Vec<String>,
}

pub fn validate_create_batch(req: &CreateBatchRequest) -> Result<(), AppError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(AppError::Validation(
            "Batch name must be 1-64 characters".into(),
        ));
    }
    if req.end_time <= req.start_time {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

/// A batch must run inside the competition's deadlines.
pub fn validate_batch_within(
    req: &CreateBatchRequest,
    competition: &TimeWindow,
) -> Result<(), AppError> {
    let batch = TimeWindow::new(req.start_time, req.end_time);
    if !competition.contains(&batch) {
        return Err(AppError::Validation(
            "Batch must fall within the competition's start and end deadlines".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// A challenge tile with the caller's submission badge.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardChallenge {
    pub id: i32,
    pub title: String,
    pub end_deadline: DateTime<Utc>,
    pub submitted: bool,
    pub status: Option<SubmissionStatus>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub competition: CompetitionResponse,
    pub phase: Phase,
    pub dashboard: DashboardState,
    /// When the client should fetch the dashboard again.
    pub refresh_at: Option<DateTime<Utc>>,
    /// Present only while the dashboard is active.
    pub challenges: Vec<DashboardChallenge>,
}
