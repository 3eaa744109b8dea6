use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use common::SubmissionStatus;
use common::score::{check_lock, check_overwrite, validate_score};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{challenge, judge_score, participant, submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::judge::*;
use crate::state::AppState;
use crate::utils::competition::{find_competition, find_participant, find_participant_for_update};
use crate::utils::users::{ensure_user, profiles};

#[utoipa::path(
    put,
    path = "/competitions/{id}/submissions/{participant_id}/{challenge_id}/judge-score",
    tag = "Judging",
    operation_id = "saveJudgeScore",
    summary = "Score a submission",
    description = "Stores a 1-10 score and comment for a submission and marks it `Judged`. Replacing an existing score requires `confirm_overwrite: true`; otherwise 409 CONFIRMATION_REQUIRED carries the stored score. Locked participants cannot be scored. Requires `judge:score` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("participant_id" = String, Path, description = "Participant user ID"),
        ("challenge_id" = i32, Path, description = "Challenge ID"),
    ),
    request_body = SaveScoreRequest,
    responses(
        (status = 200, description = "Score saved", body = JudgeScoreResponse),
        (status = 400, description = "Score out of range or comment too long (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Participant or submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Participant locked (CONFLICT) or overwrite not confirmed (CONFIRMATION_REQUIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, participant_id = %participant_id, challenge_id, score = payload.score))]
pub async fn save_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, participant_id, challenge_id)): Path<(i32, String, i32)>,
    AppJson(payload): AppJson<SaveScoreRequest>,
) -> Result<Json<JudgeScoreResponse>, AppError> {
    auth_user.require_permission("judge:score")?;
    validate_score(payload.score, &payload.comment)?;

    let txn = state.db.begin().await?;
    find_competition(&txn, competition_id).await?;
    let member = find_participant_for_update(&txn, competition_id, &participant_id).await?;
    if member.locked {
        return Err(AppError::Conflict("Participant is locked".into()));
    }

    let key = (competition_id, participant_id.clone(), challenge_id);
    submission::Entity::find_by_id(key.clone())
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    let existing = judge_score::Entity::find_by_id(key.clone())
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    check_overwrite(existing.map(|s| s.score), payload.confirm_overwrite)?;

    ensure_user(&txn, &auth_user.user_id, auth_user.email.as_deref()).await?;

    let now = chrono::Utc::now();
    let model = judge_score::ActiveModel {
        competition_id: Set(competition_id),
        participant_id: Set(participant_id.clone()),
        challenge_id: Set(challenge_id),
        judge_id: Set(auth_user.user_id.clone()),
        score: Set(payload.score),
        comment: Set(payload.comment),
        updated_at: Set(now),
    };
    judge_score::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                judge_score::Column::CompetitionId,
                judge_score::Column::ParticipantId,
                judge_score::Column::ChallengeId,
            ])
            .update_columns([
                judge_score::Column::JudgeId,
                judge_score::Column::Score,
                judge_score::Column::Comment,
                judge_score::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    submission::Entity::update_many()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::ParticipantId.eq(participant_id.as_str()))
        .filter(submission::Column::ChallengeId.eq(challenge_id))
        .col_expr(submission::Column::Status, Expr::value(SubmissionStatus::Judged))
        .exec(&txn)
        .await?;

    let saved = judge_score::Entity::find_by_id(key)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Judge score vanished after upsert".into()))?;
    txn.commit().await?;

    info!(judge_id = %saved.judge_id, "Judge score saved");
    Ok(Json(saved.into()))
}

#[utoipa::path(
    post,
    path = "/competitions/{id}/participants/{user_id}/lock",
    tag = "Judging",
    operation_id = "lockParticipant",
    summary = "Lock a participant permanently",
    description = "Locks a participant's judgement once every submission has a score. `confirmation` must be exactly `SURE`. The lock and the move of every submission to `Finalized` commit together. Requires `judge:lock` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("user_id" = String, Path, description = "Participant user ID"),
    ),
    request_body = LockParticipantRequest,
    responses(
        (status = 200, description = "Participant locked", body = LockResponse),
        (status = 400, description = "Confirmation missing (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Participant not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already locked (CONFLICT) or unscored submissions remain (UNSCORED_SUBMISSIONS)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, user_id = %user_id))]
pub async fn lock_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, user_id)): Path<(i32, String)>,
    AppJson(payload): AppJson<LockParticipantRequest>,
) -> Result<Json<LockResponse>, AppError> {
    auth_user.require_permission("judge:lock")?;

    let txn = state.db.begin().await?;
    find_competition(&txn, competition_id).await?;
    let member = find_participant_for_update(&txn, competition_id, &user_id).await?;

    let total = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::ParticipantId.eq(user_id.as_str()))
        .count(&txn)
        .await?;
    let scored = judge_score::Entity::find()
        .filter(judge_score::Column::CompetitionId.eq(competition_id))
        .filter(judge_score::Column::ParticipantId.eq(user_id.as_str()))
        .count(&txn)
        .await?;
    check_lock(&payload.confirmation, member.locked, total, scored)?;

    ensure_user(&txn, &auth_user.user_id, auth_user.email.as_deref()).await?;

    let now = chrono::Utc::now();
    let mut active: participant::ActiveModel = member.into();
    active.locked = Set(true);
    active.locked_by = Set(Some(auth_user.user_id.clone()));
    active.locked_at = Set(Some(now));
    let locked = active.update(&txn).await?;

    let finalized = submission::Entity::update_many()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::ParticipantId.eq(user_id.as_str()))
        .col_expr(submission::Column::Status, Expr::value(SubmissionStatus::Finalized))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    info!(finalized, locked_by = %auth_user.user_id, "Participant locked");
    Ok(Json(LockResponse {
        competition_id,
        user_id: locked.user_id,
        locked: locked.locked,
        locked_by: locked.locked_by,
        locked_at: locked.locked_at,
        finalized_submissions: finalized,
    }))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/judge/participants",
    tag = "Judging",
    operation_id = "listJudgeParticipants",
    summary = "List participants with scoring progress",
    description = "Returns every participant with their submission count, how many are scored, and the lock flag. Requires `judge:score` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Participants", body = Vec<JudgeParticipantItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn list_judge_participants(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<Vec<JudgeParticipantItem>>, AppError> {
    auth_user.require_permission("judge:score")?;
    let db = &state.db;
    find_competition(db, competition_id).await?;

    let (members, totals, scored) = tokio::try_join!(
        participant::Entity::find()
            .filter(participant::Column::CompetitionId.eq(competition_id))
            .order_by_asc(participant::Column::RegisteredAt)
            .order_by_asc(participant::Column::UserId)
            .all(db),
        submission::Entity::find()
            .filter(submission::Column::CompetitionId.eq(competition_id))
            .select_only()
            .column(submission::Column::ParticipantId)
            .column_as(submission::Column::ChallengeId.count(), "n")
            .group_by(submission::Column::ParticipantId)
            .into_tuple::<(String, i64)>()
            .all(db),
        judge_score::Entity::find()
            .filter(judge_score::Column::CompetitionId.eq(competition_id))
            .select_only()
            .column(judge_score::Column::ParticipantId)
            .column_as(judge_score::Column::ChallengeId.count(), "n")
            .group_by(judge_score::Column::ParticipantId)
            .into_tuple::<(String, i64)>()
            .all(db),
    )?;

    let totals: HashMap<String, i64> = totals.into_iter().collect();
    let scored: HashMap<String, i64> = scored.into_iter().collect();
    let ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
    let profiles = profiles(db, &ids).await?;

    let items = members
        .into_iter()
        .map(|m| {
            let profile = profiles.get(&m.user_id);
            JudgeParticipantItem {
                display_name: profile
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| m.user_id.clone()),
                institution: profile.and_then(|p| p.institution.clone()),
                total_submissions: std::cmp::Ord::max(totals.get(&m.user_id).copied().unwrap_or(0), 0) as u64,
                scored_submissions: std::cmp::Ord::max(scored.get(&m.user_id).copied().unwrap_or(0), 0) as u64,
                locked: m.locked,
                user_id: m.user_id,
            }
        })
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/judge/participants/{user_id}/submissions",
    tag = "Judging",
    operation_id = "getJudgeSheet",
    summary = "Get a participant's scoring sheet",
    description = "Returns every submission of the participant with its challenge title and current judge score, plus how many still need a score. Requires `judge:score` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("user_id" = String, Path, description = "Participant user ID"),
    ),
    responses(
        (status = 200, description = "Scoring sheet", body = JudgeSheetResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Participant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, user_id = %user_id))]
pub async fn get_judge_sheet(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, user_id)): Path<(i32, String)>,
) -> Result<Json<JudgeSheetResponse>, AppError> {
    auth_user.require_permission("judge:score")?;
    let db = &state.db;

    let member = find_participant(db, competition_id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))?;

    let (submissions, challenges, scores) = tokio::try_join!(
        submission::Entity::find()
            .filter(submission::Column::CompetitionId.eq(competition_id))
            .filter(submission::Column::ParticipantId.eq(user_id.as_str()))
            .order_by_asc(submission::Column::ChallengeId)
            .all(db),
        challenge::Entity::find()
            .filter(challenge::Column::CompetitionId.eq(competition_id))
            .select_only()
            .column(challenge::Column::Id)
            .column(challenge::Column::Title)
            .into_tuple::<(i32, String)>()
            .all(db),
        judge_score::Entity::find()
            .filter(judge_score::Column::CompetitionId.eq(competition_id))
            .filter(judge_score::Column::ParticipantId.eq(user_id.as_str()))
            .all(db),
    )?;

    let titles: HashMap<i32, String> = challenges.into_iter().collect();
    let mut scores: HashMap<i32, judge_score::Model> =
        scores.into_iter().map(|s| (s.challenge_id, s)).collect();

    let items: Vec<JudgeSubmissionItem> = submissions
        .into_iter()
        .map(|s| JudgeSubmissionItem {
            challenge_title: titles.get(&s.challenge_id).cloned().unwrap_or_default(),
            judge_score: scores.remove(&s.challenge_id).map(JudgeScoreResponse::from),
            challenge_id: s.challenge_id,
            prompt_text: s.prompt_text,
            status: s.status,
            submitted_at: s.submitted_at,
        })
        .collect();
    let remaining = items.iter().filter(|i| i.judge_score.is_none()).count() as u64;

    Ok(Json(JudgeSheetResponse {
        user_id: member.user_id,
        locked: member.locked,
        submissions: items,
        remaining,
    }))
}
