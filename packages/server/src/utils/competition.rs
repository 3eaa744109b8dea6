use common::{Phase, TimeWindow};
use sea_orm::sea_query::LockType;
use sea_orm::*;

use crate::entity::{
    batch, challenge, competition, judge_score, leaderboard_entry, llm_evaluation, participant,
    submission,
};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// Inactive competitions are hidden from users who cannot manage them.
pub fn check_competition_visible(
    auth_user: &AuthUser,
    competition: &competition::Model,
) -> Result<(), AppError> {
    if competition.is_active || auth_user.has_permission("competition:manage") {
        return Ok(());
    }
    Err(AppError::NotFound("Competition not found".into()))
}

/// Registered participants keep seeing an inactive competition once it has
/// ended, so the dashboard can report the final state.
pub fn check_visible_to_member(
    auth_user: &AuthUser,
    competition: &competition::Model,
    member: Option<&participant::Model>,
) -> Result<(), AppError> {
    let ended = competition_window(competition).phase_at(chrono::Utc::now()) == Phase::Ended;
    if member.is_some() && ended {
        return Ok(());
    }
    check_competition_visible(auth_user, competition)
}

/// Challenge statements stay hidden until the competition starts.
/// Users with `challenge:manage` bypass the check.
pub fn require_started(
    auth_user: &AuthUser,
    competition: &competition::Model,
) -> Result<(), AppError> {
    if auth_user.has_permission("challenge:manage") {
        return Ok(());
    }
    if competition_window(competition).phase_at(chrono::Utc::now()) == Phase::Upcoming {
        return Err(AppError::Validation(
            "Competition has not started yet".into(),
        ));
    }
    Ok(())
}

/// Look up a competition by ID, returning 404 if not found.
pub async fn find_competition<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

pub async fn find_competition_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

/// Look up a challenge, returning 404 if it does not belong to the competition.
pub async fn find_challenge<C: ConnectionTrait>(
    db: &C,
    competition_id: i32,
    challenge_id: i32,
) -> Result<challenge::Model, AppError> {
    challenge::Entity::find_by_id(challenge_id)
        .filter(challenge::Column::CompetitionId.eq(competition_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
}

pub async fn find_batch<C: ConnectionTrait>(
    db: &C,
    competition_id: i32,
    batch_id: i32,
) -> Result<batch::Model, AppError> {
    batch::Entity::find_by_id(batch_id)
        .filter(batch::Column::CompetitionId.eq(competition_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch not found".into()))
}

pub async fn find_participant<C: ConnectionTrait>(
    db: &C,
    competition_id: i32,
    user_id: &str,
) -> Result<Option<participant::Model>, DbErr> {
    participant::Entity::find_by_id((competition_id, user_id.to_string()))
        .one(db)
        .await
}

/// Lock a participant row. Scoring, locking and submitting all serialize on it.
pub async fn find_participant_for_update(
    txn: &DatabaseTransaction,
    competition_id: i32,
    user_id: &str,
) -> Result<participant::Model, AppError> {
    participant::Entity::find_by_id((competition_id, user_id.to_string()))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))
}

pub fn competition_window(model: &competition::Model) -> TimeWindow {
    TimeWindow::new(model.start_deadline, model.end_deadline)
}

/// Window of the participant's batch, if one is assigned.
pub async fn batch_window<C: ConnectionTrait>(
    db: &C,
    participant: &participant::Model,
) -> Result<Option<TimeWindow>, DbErr> {
    let Some(batch_id) = participant.batch_id else {
        return Ok(None);
    };
    Ok(batch::Entity::find_by_id(batch_id)
        .one(db)
        .await?
        .map(|b| TimeWindow::new(b.start_time, b.end_time)))
}

/// Number of challenges the participant has a stored submission for.
pub async fn count_completed<C: ConnectionTrait>(
    db: &C,
    competition_id: i32,
    user_id: &str,
) -> Result<i32, AppError> {
    let count = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::ParticipantId.eq(user_id))
        .count(db)
        .await?;
    i32::try_from(count).map_err(|_| AppError::Internal("Submission count overflow".into()))
}

/// Delete everything hanging off a single challenge.
pub async fn delete_challenge_data(
    txn: &DatabaseTransaction,
    challenge_id: i32,
) -> Result<(), DbErr> {
    judge_score::Entity::delete_many()
        .filter(judge_score::Column::ChallengeId.eq(challenge_id))
        .exec(txn)
        .await?;
    llm_evaluation::Entity::delete_many()
        .filter(llm_evaluation::Column::ChallengeId.eq(challenge_id))
        .exec(txn)
        .await?;
    submission::Entity::delete_many()
        .filter(submission::Column::ChallengeId.eq(challenge_id))
        .exec(txn)
        .await?;
    Ok(())
}

/// Delete a competition and every row that references it.
///
/// Children go first so foreign keys hold at every step.
pub async fn delete_competition_cascade(
    txn: &DatabaseTransaction,
    competition_id: i32,
) -> Result<(), DbErr> {
    judge_score::Entity::delete_many()
        .filter(judge_score::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    llm_evaluation::Entity::delete_many()
        .filter(llm_evaluation::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    submission::Entity::delete_many()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    leaderboard_entry::Entity::delete_many()
        .filter(leaderboard_entry::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    participant::Entity::delete_many()
        .filter(participant::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    batch::Entity::delete_many()
        .filter(batch::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    challenge::Entity::delete_many()
        .filter(challenge::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;
    competition::Entity::delete_by_id(competition_id)
        .exec(txn)
        .await?;
    Ok(())
}
