use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use common::evaluator::CompetitionJob;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{challenge, judge_score, leaderboard_entry, llm_evaluation, submission};
use crate::error::{AppError, ErrorBody};
use crate::evaluator::EvaluatorClientExt;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::evaluation::{EvaluatorJobResponse, LlmScoreCard};
use crate::models::leaderboard::*;
use crate::state::AppState;
use crate::utils::competition::{check_competition_visible, find_competition};
use crate::utils::users::{Profile, ensure_user, profile, profiles};

/// Rows per multi-row INSERT. Seven columns per row keeps each statement
/// under the Postgres limit of 65 535 bind parameters.
const BULK_INSERT_ROWS: usize = 1000;

fn entry_response(
    m: leaderboard_entry::Model,
    profile: Option<&Profile>,
) -> LeaderboardEntryResponse {
    LeaderboardEntryResponse {
        rank: m.rank,
        display_name: profile
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| m.user_id.clone()),
        institution: profile.and_then(|p| p.institution.clone()),
        user_id: m.user_id,
        total_score: m.total_score,
        llm_score: m.llm_score,
        judge_score: m.judge_score,
        generated_at: m.generated_at,
    }
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/leaderboard",
    tag = "Leaderboard",
    operation_id = "getLeaderboard",
    summary = "Get the published leaderboard",
    description = "Returns the precomputed leaderboard ordered by rank, with participant display names and institutions. Empty until the evaluator publishes results.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn get_leaderboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let db = &state.db;
    let competition = find_competition(db, competition_id).await?;
    check_competition_visible(&auth_user, &competition)?;

    let rows = leaderboard_entry::Entity::find()
        .filter(leaderboard_entry::Column::CompetitionId.eq(competition_id))
        .order_by_asc(leaderboard_entry::Column::Rank)
        .order_by_asc(leaderboard_entry::Column::UserId)
        .all(db)
        .await?;

    let ids: Vec<String> = rows.iter().map(|r| r.user_id.clone()).collect();
    let profiles = profiles(db, &ids).await?;

    let entries = rows
        .into_iter()
        .map(|r| {
            let p = profiles.get(&r.user_id);
            entry_response(r, p)
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        competition_id,
        entries,
    }))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/leaderboard/{user_id}/submissions",
    tag = "Leaderboard",
    operation_id = "getParticipantResults",
    summary = "Get a participant's detailed results",
    description = "Returns the participant's leaderboard entry (if any) and every submission with its judge score and LLM score cards, ordered by challenge.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("user_id" = String, Path, description = "Participant user ID"),
    ),
    responses(
        (status = 200, description = "Participant results", body = ParticipantResultsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, user_id = %user_id))]
pub async fn get_participant_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, user_id)): Path<(i32, String)>,
) -> Result<Json<ParticipantResultsResponse>, AppError> {
    let db = &state.db;
    let competition = find_competition(db, competition_id).await?;
    check_competition_visible(&auth_user, &competition)?;

    let (entry, submissions, titles, scores, cards) = tokio::try_join!(
        leaderboard_entry::Entity::find_by_id((competition_id, user_id.clone())).one(db),
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
        llm_evaluation::Entity::find()
            .filter(llm_evaluation::Column::CompetitionId.eq(competition_id))
            .filter(llm_evaluation::Column::ParticipantId.eq(user_id.as_str()))
            .order_by_asc(llm_evaluation::Column::Model)
            .all(db),
    )?;
    let profile = profile(db, &user_id).await?;

    let titles: HashMap<i32, String> = titles.into_iter().collect();
    let mut scores: HashMap<i32, judge_score::Model> =
        scores.into_iter().map(|s| (s.challenge_id, s)).collect();
    let mut cards_by_challenge: HashMap<i32, Vec<LlmScoreCard>> = HashMap::new();
    for card in cards {
        cards_by_challenge
            .entry(card.challenge_id)
            .or_default()
            .push(card.into());
    }

    let submissions = submissions
        .into_iter()
        .map(|s| {
            let score = scores.remove(&s.challenge_id);
            SubmissionDetail {
                challenge_title: titles.get(&s.challenge_id).cloned().unwrap_or_default(),
                judge_score: score.as_ref().map(|j| j.score),
                judge_comment: score.map(|j| j.comment),
                score_cards: cards_by_challenge
                    .remove(&s.challenge_id)
                    .unwrap_or_default(),
                challenge_id: s.challenge_id,
                prompt_text: s.prompt_text,
                status: s.status,
                submitted_at: s.submitted_at,
            }
        })
        .collect();

    Ok(Json(ParticipantResultsResponse {
        entry: entry.map(|e| entry_response(e, Some(&profile))),
        display_name: profile.display_name,
        institution: profile.institution,
        user_id,
        submissions,
    }))
}

#[utoipa::path(
    post,
    path = "/competitions/{id}/leaderboard/generate",
    tag = "Leaderboard",
    operation_id = "generateLeaderboard",
    summary = "Trigger leaderboard generation",
    description = "Asks the evaluator service to rank the competition. The evaluator publishes the result back through `PUT /competitions/{id}/leaderboard`. Requires `leaderboard:generate` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Evaluator accepted the job", body = EvaluatorJobResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Evaluator unreachable or failed (EVALUATOR_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn generate_leaderboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<EvaluatorJobResponse>, AppError> {
    auth_user.require_permission("leaderboard:generate")?;
    find_competition(&state.db, competition_id).await?;

    let job = CompetitionJob {
        competition_id,
        requested_by: auth_user.user_id,
    };
    let reply = state.evaluator.generate_leaderboard(&job).await?;
    info!("Leaderboard generation requested");

    Ok(Json(EvaluatorJobResponse {
        competition_id,
        evaluator: reply,
    }))
}

#[utoipa::path(
    put,
    path = "/competitions/{id}/leaderboard",
    tag = "Leaderboard",
    operation_id = "publishLeaderboard",
    summary = "Publish a leaderboard",
    description = "Replaces every leaderboard entry of the competition in one transaction. Ranks start at 1, ties may share a rank, user IDs must be unique. Requires `leaderboard:generate` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = PublishLeaderboardRequest,
    responses(
        (status = 200, description = "Leaderboard replaced", body = LeaderboardResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, entries = payload.entries.len()))]
pub async fn publish_leaderboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
    AppJson(payload): AppJson<PublishLeaderboardRequest>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    auth_user.require_permission("leaderboard:generate")?;
    validate_publish_leaderboard(&payload)?;

    let txn = state.db.begin().await?;
    find_competition(&txn, competition_id).await?;

    for entry in &payload.entries {
        ensure_user(&txn, &entry.user_id, None).await?;
    }

    leaderboard_entry::Entity::delete_many()
        .filter(leaderboard_entry::Column::CompetitionId.eq(competition_id))
        .exec(&txn)
        .await?;

    let now = chrono::Utc::now();
    let models: Vec<leaderboard_entry::ActiveModel> = payload
        .entries
        .into_iter()
        .map(|e| leaderboard_entry::ActiveModel {
            competition_id: Set(competition_id),
            user_id: Set(e.user_id),
            rank: Set(e.rank),
            total_score: Set(e.total_score),
            llm_score: Set(e.llm_score),
            judge_score: Set(e.judge_score),
            generated_at: Set(now),
        })
        .collect();

    for chunk in models.chunks(BULK_INSERT_ROWS) {
        leaderboard_entry::Entity::insert_many(chunk.to_vec())
            .exec_without_returning(&txn)
            .await?;
    }

    let rows = leaderboard_entry::Entity::find()
        .filter(leaderboard_entry::Column::CompetitionId.eq(competition_id))
        .order_by_asc(leaderboard_entry::Column::Rank)
        .order_by_asc(leaderboard_entry::Column::UserId)
        .all(&txn)
        .await?;
    let ids: Vec<String> = rows.iter().map(|r| r.user_id.clone()).collect();
    let profiles = profiles(&txn, &ids).await?;

    txn.commit().await?;

    info!(entries = rows.len(), "Leaderboard published");
    let entries = rows
        .into_iter()
        .map(|r| {
            let p = profiles.get(&r.user_id);
            entry_response(r, p)
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        competition_id,
        entries,
    }))
}
