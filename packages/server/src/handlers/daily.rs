use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::stats::DailyCounters;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::daily_stats::STATS_ROW_ID;
use crate::entity::{daily_challenge, daily_stats, daily_submission, daily_vote};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::daily::*;
use crate::models::shared::{Pagination, page_params};
use crate::models::submission::validate_prompt;
use crate::seed::ensure_stats_row;
use crate::state::AppState;
use crate::utils::users::{ensure_user, profile, profiles};

async fn find_daily<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<daily_challenge::Model, AppError> {
    daily_challenge::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily challenge not found".into()))
}

async fn find_daily_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<daily_challenge::Model, AppError> {
    daily_challenge::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily challenge not found".into()))
}

/// Inactive daily challenges are hidden from users who cannot manage them.
fn check_daily_visible(
    auth_user: &AuthUser,
    model: &daily_challenge::Model,
) -> Result<(), AppError> {
    if model.is_active || auth_user.has_permission("daily:manage") {
        return Ok(());
    }
    Err(AppError::NotFound("Daily challenge not found".into()))
}

/// Read the stats row with a row lock, creating it first if it is missing.
async fn lock_stats(txn: &DatabaseTransaction) -> Result<daily_stats::Model, DbErr> {
    if let Some(row) = daily_stats::Entity::find_by_id(STATS_ROW_ID)
        .lock(LockType::Update)
        .one(txn)
        .await?
    {
        return Ok(row);
    }
    ensure_stats_row(txn).await?;
    daily_stats::Entity::find_by_id(STATS_ROW_ID)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("daily_stats".into()))
}

async fn write_stats(
    txn: &DatabaseTransaction,
    row: daily_stats::Model,
    counters: DailyCounters,
) -> Result<daily_stats::Model, DbErr> {
    let mut active: daily_stats::ActiveModel = row.into();
    active.total_challenges = Set(counters.total_challenges);
    active.total_submissions = Set(counters.total_submissions);
    active.updated_at = Set(chrono::Utc::now());
    active.update(txn).await
}

fn counters_of(row: &daily_stats::Model) -> DailyCounters {
    DailyCounters::new(row.total_challenges, row.total_submissions)
}

#[utoipa::path(
    post,
    path = "/daily-challenges",
    tag = "Daily Challenges",
    operation_id = "createDailyChallenge",
    summary = "Create a daily challenge",
    description = "Creates a daily challenge and increments `total_challenges` in the daily stats. Requires `daily:manage` permission.",
    request_body = CreateDailyChallengeRequest,
    responses(
        (status = 201, description = "Daily challenge created", body = DailyChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_daily(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDailyChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("daily:manage")?;
    validate_create_daily(&payload)?;

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;

    let model = daily_challenge::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        problem_statement: Set(payload.problem_statement),
        guidelines: Set(payload.guidelines),
        start_time: Set(payload.start_time),
        end_time: Set(payload.end_time),
        is_active: Set(payload.is_active.unwrap_or(true)),
        total_submissions: Set(0),
        created_by: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let stats = lock_stats(&txn).await?;
    let counters = counters_of(&stats).challenge_created();
    write_stats(&txn, stats, counters).await?;

    txn.commit().await?;

    info!(daily_challenge_id = model.id, "Daily challenge created");
    Ok((StatusCode::CREATED, Json(DailyChallengeResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/daily-challenges",
    tag = "Daily Challenges",
    operation_id = "listDailyChallenges",
    summary = "List daily challenges",
    description = "Paginated list, newest start time first. Users without `daily:manage` only see active challenges.",
    params(DailyChallengeListQuery),
    responses(
        (status = 200, description = "Daily challenges", body = DailyChallengeListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_daily(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DailyChallengeListQuery>,
) -> Result<Json<DailyChallengeListResponse>, AppError> {
    let db = &state.db;
    let (page, per_page) = page_params(query.page, query.per_page);

    let active = if auth_user.has_permission("daily:manage") {
        query.active
    } else {
        Some(true)
    };

    let mut select = daily_challenge::Entity::find();
    if let Some(active) = active {
        select = select.filter(daily_challenge::Column::IsActive.eq(active));
    }

    let paginator = select
        .order_by_desc(daily_challenge::Column::StartTime)
        .order_by_desc(daily_challenge::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    Ok(Json(DailyChallengeListResponse {
        data: rows.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/daily-challenges/{id}",
    tag = "Daily Challenges",
    operation_id = "getDailyChallenge",
    summary = "Get a daily challenge",
    params(("id" = i32, Path, description = "Daily challenge ID")),
    responses(
        (status = 200, description = "Daily challenge", body = DailyChallengeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Daily challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_daily(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DailyChallengeResponse>, AppError> {
    let model = find_daily(&state.db, id).await?;
    check_daily_visible(&auth_user, &model)?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/daily-challenges/{id}",
    tag = "Daily Challenges",
    operation_id = "updateDailyChallenge",
    summary = "Update a daily challenge",
    description = "PATCH semantics: omitted fields keep their value. The merged window must still end after it starts. Requires `daily:manage` permission.",
    params(("id" = i32, Path, description = "Daily challenge ID")),
    request_body = UpdateDailyChallengeRequest,
    responses(
        (status = 200, description = "Daily challenge updated", body = DailyChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Daily challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_daily(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateDailyChallengeRequest>,
) -> Result<Json<DailyChallengeResponse>, AppError> {
    auth_user.require_permission("daily:manage")?;
    validate_update_daily(&payload)?;

    if payload == UpdateDailyChallengeRequest::default() {
        let existing = find_daily(&state.db, id).await?;
        return Ok(Json(existing.into()));
    }

    let txn = state.db.begin().await?;
    let existing = find_daily_for_update(&txn, id).await?;
    validate_merged_daily(
        payload.start_time.unwrap_or(existing.start_time),
        payload.end_time.unwrap_or(existing.end_time),
    )?;

    let mut active: daily_challenge::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(statement) = payload.problem_statement {
        active.problem_statement = Set(statement);
    }
    if let Some(guidelines) = payload.guidelines {
        active.guidelines = Set(guidelines);
    }
    if let Some(start) = payload.start_time {
        active.start_time = Set(start);
    }
    if let Some(end) = payload.end_time {
        active.end_time = Set(end);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/daily-challenges/{id}",
    tag = "Daily Challenges",
    operation_id = "deleteDailyChallenge",
    summary = "Delete a daily challenge",
    description = "Deletes the challenge with its submissions and votes. The daily stats lose one challenge and exactly this challenge's submissions, never going below zero. Requires `daily:manage` permission.",
    params(("id" = i32, Path, description = "Daily challenge ID")),
    responses(
        (status = 204, description = "Daily challenge deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Daily challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_daily(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("daily:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_daily_for_update(&txn, id).await?;

    daily_vote::Entity::delete_many()
        .filter(daily_vote::Column::DailyChallengeId.eq(id))
        .exec(&txn)
        .await?;
    daily_submission::Entity::delete_many()
        .filter(daily_submission::Column::DailyChallengeId.eq(id))
        .exec(&txn)
        .await?;
    daily_challenge::Entity::delete_by_id(id).exec(&txn).await?;

    let stats = lock_stats(&txn).await?;
    let counters = counters_of(&stats).challenge_deleted(i64::from(existing.total_submissions));
    write_stats(&txn, stats, counters).await?;

    txn.commit().await?;

    info!(
        removed_submissions = existing.total_submissions,
        "Daily challenge deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/daily-challenges/{id}/submission",
    tag = "Daily Challenges",
    operation_id = "submitDailyPrompt",
    summary = "Submit or replace a daily prompt",
    description = "Stores the caller's prompt for an active daily challenge inside its time window. The first submission counts towards the challenge and global totals; resubmitting replaces the text and keeps the votes. Requires `submission:submit` permission.",
    params(("id" = i32, Path, description = "Daily challenge ID")),
    request_body = DailySubmissionRequest,
    responses(
        (status = 200, description = "Submission stored", body = DailySubmissionResponse),
        (status = 400, description = "Validation error or challenge not open (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Daily challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = %auth_user.user_id))]
pub async fn submit_daily(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<DailySubmissionRequest>,
) -> Result<Json<DailySubmissionResponse>, AppError> {
    auth_user.require_permission("submission:submit")?;
    validate_prompt(&payload.prompt_text, state.config.submission.max_prompt_chars)?;

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    let challenge = find_daily_for_update(&txn, id).await?;
    check_daily_visible(&auth_user, &challenge)?;
    if !challenge.is_active || now < challenge.start_time || now >= challenge.end_time {
        return Err(AppError::Validation(
            "Daily challenge is not open for submissions".into(),
        ));
    }

    ensure_user(&txn, &auth_user.user_id, auth_user.email.as_deref()).await?;

    let existing = daily_submission::Entity::find_by_id((id, auth_user.user_id.clone()))
        .one(&txn)
        .await?;

    let model = match existing {
        Some(existing) => {
            let mut active: daily_submission::ActiveModel = existing.into();
            active.prompt_text = Set(payload.prompt_text);
            active.submitted_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            let model = daily_submission::ActiveModel {
                daily_challenge_id: Set(id),
                user_id: Set(auth_user.user_id.clone()),
                prompt_text: Set(payload.prompt_text),
                vote_count: Set(0),
                submitted_at: Set(now),
            }
            .insert(&txn)
            .await?;

            let total = challenge.total_submissions + 1;
            let mut active: daily_challenge::ActiveModel = challenge.into();
            active.total_submissions = Set(total);
            active.update(&txn).await?;

            let stats = lock_stats(&txn).await?;
            let counters = counters_of(&stats).submission_added();
            write_stats(&txn, stats, counters).await?;

            info!(total_submissions = total, "First daily submission");
            model
        }
    };

    let author = profile(&txn, &model.user_id).await?;
    txn.commit().await?;

    Ok(Json(DailySubmissionResponse {
        daily_challenge_id: model.daily_challenge_id,
        user_id: model.user_id,
        display_name: author.display_name,
        prompt_text: model.prompt_text,
        vote_count: model.vote_count,
        submitted_at: model.submitted_at,
    }))
}

#[utoipa::path(
    get,
    path = "/daily-challenges/{id}/submissions",
    tag = "Daily Challenges",
    operation_id = "listDailySubmissions",
    summary = "List daily submissions",
    description = "All submissions of a daily challenge, most voted first.",
    params(("id" = i32, Path, description = "Daily challenge ID")),
    responses(
        (status = 200, description = "Submissions", body = Vec<DailySubmissionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Daily challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_daily_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<DailySubmissionResponse>>, AppError> {
    let db = &state.db;
    let challenge = find_daily(db, id).await?;
    check_daily_visible(&auth_user, &challenge)?;

    let rows = daily_submission::Entity::find()
        .filter(daily_submission::Column::DailyChallengeId.eq(id))
        .order_by_desc(daily_submission::Column::VoteCount)
        .order_by_asc(daily_submission::Column::SubmittedAt)
        .all(db)
        .await?;

    let ids: Vec<String> = rows.iter().map(|r| r.user_id.clone()).collect();
    let profiles = profiles(db, &ids).await?;

    let items = rows
        .into_iter()
        .map(|r| DailySubmissionResponse {
            display_name: profiles
                .get(&r.user_id)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| r.user_id.clone()),
            daily_challenge_id: r.daily_challenge_id,
            user_id: r.user_id,
            prompt_text: r.prompt_text,
            vote_count: r.vote_count,
            submitted_at: r.submitted_at,
        })
        .collect();

    Ok(Json(items))
}

async fn find_daily_submission_for_update(
    txn: &DatabaseTransaction,
    id: i32,
    author_id: &str,
) -> Result<daily_submission::Model, AppError> {
    daily_submission::Entity::find_by_id((id, author_id.to_string()))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}

#[utoipa::path(
    post,
    path = "/daily-challenges/{id}/submissions/{author_id}/vote",
    tag = "Daily Challenges",
    operation_id = "voteDailySubmission",
    summary = "Upvote a daily submission",
    description = "One vote per voter per submission. Voting for your own submission is rejected.",
    params(
        ("id" = i32, Path, description = "Daily challenge ID"),
        ("author_id" = String, Path, description = "User ID of the submission author"),
    ),
    responses(
        (status = 200, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Self vote (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already voted (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, author_id = %author_id))]
pub async fn vote(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, author_id)): Path<(i32, String)>,
) -> Result<Json<VoteResponse>, AppError> {
    if author_id == auth_user.user_id {
        return Err(AppError::Validation(
            "Cannot vote for your own submission".into(),
        ));
    }

    let txn = state.db.begin().await?;
    let challenge = find_daily(&txn, id).await?;
    check_daily_visible(&auth_user, &challenge)?;
    let submission = find_daily_submission_for_update(&txn, id, &author_id).await?;

    let vote_key = (id, author_id.clone(), auth_user.user_id.clone());
    let already = daily_vote::Entity::find_by_id(vote_key).one(&txn).await?;
    if already.is_some() {
        return Err(AppError::Conflict("Already voted".into()));
    }

    daily_vote::ActiveModel {
        daily_challenge_id: Set(id),
        author_id: Set(author_id.clone()),
        voter_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(&txn)
    .await?;

    let vote_count = submission.vote_count + 1;
    daily_submission::Entity::update_many()
        .filter(daily_submission::Column::DailyChallengeId.eq(id))
        .filter(daily_submission::Column::UserId.eq(author_id.as_str()))
        .col_expr(daily_submission::Column::VoteCount, Expr::value(vote_count))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(Json(VoteResponse {
        daily_challenge_id: id,
        author_id,
        vote_count,
    }))
}

#[utoipa::path(
    delete,
    path = "/daily-challenges/{id}/submissions/{author_id}/vote",
    tag = "Daily Challenges",
    operation_id = "unvoteDailySubmission",
    summary = "Withdraw a vote",
    params(
        ("id" = i32, Path, description = "Daily challenge ID"),
        ("author_id" = String, Path, description = "User ID of the submission author"),
    ),
    responses(
        (status = 200, description = "Vote withdrawn", body = VoteResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission or vote not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, author_id = %author_id))]
pub async fn unvote(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, author_id)): Path<(i32, String)>,
) -> Result<Json<VoteResponse>, AppError> {
    let txn = state.db.begin().await?;
    let submission = find_daily_submission_for_update(&txn, id, &author_id).await?;

    let res = daily_vote::Entity::delete_by_id((id, author_id.clone(), auth_user.user_id))
        .exec(&txn)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::NotFound("Vote not found".into()));
    }

    let vote_count = std::cmp::Ord::max(submission.vote_count - 1, 0);
    daily_submission::Entity::update_many()
        .filter(daily_submission::Column::DailyChallengeId.eq(id))
        .filter(daily_submission::Column::UserId.eq(author_id.as_str()))
        .col_expr(daily_submission::Column::VoteCount, Expr::value(vote_count))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(Json(VoteResponse {
        daily_challenge_id: id,
        author_id,
        vote_count,
    }))
}

#[utoipa::path(
    get,
    path = "/stats/daily",
    tag = "Daily Challenges",
    operation_id = "getDailyStats",
    summary = "Get daily challenge totals",
    responses(
        (status = 200, description = "Daily stats", body = DailyStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_daily_stats(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DailyStatsResponse>, AppError> {
    let row = match daily_stats::Entity::find_by_id(STATS_ROW_ID)
        .one(&state.db)
        .await?
    {
        Some(row) => row,
        None => {
            ensure_stats_row(&state.db).await?;
            daily_stats::Entity::find_by_id(STATS_ROW_ID)
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::Internal("daily_stats row missing".into()))?
        }
    };
    Ok(Json(row.into()))
}

#[utoipa::path(
    post,
    path = "/stats/daily/reconcile",
    tag = "Daily Challenges",
    operation_id = "reconcileDailyStats",
    summary = "Recompute daily challenge totals",
    description = "Recounts challenges and submissions from the tables, repairing both the global totals and each challenge's `total_submissions`. Requires `daily:manage` permission.",
    responses(
        (status = 200, description = "Recomputed stats", body = DailyStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn reconcile_daily_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DailyStatsResponse>, AppError> {
    auth_user.require_permission("daily:manage")?;

    let txn = state.db.begin().await?;
    // Challenge rows before the stats row, the same order submit and delete take.
    daily_challenge::Entity::find()
        .order_by_asc(daily_challenge::Column::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let stats = lock_stats(&txn).await?;

    let per_challenge: Vec<(i32, i64)> = daily_submission::Entity::find()
        .select_only()
        .column(daily_submission::Column::DailyChallengeId)
        .column_as(daily_submission::Column::UserId.count(), "n")
        .group_by(daily_submission::Column::DailyChallengeId)
        .into_tuple()
        .all(&txn)
        .await?;

    daily_challenge::Entity::update_many()
        .col_expr(daily_challenge::Column::TotalSubmissions, Expr::value(0))
        .exec(&txn)
        .await?;
    for (challenge_id, n) in &per_challenge {
        daily_challenge::Entity::update_many()
            .filter(daily_challenge::Column::Id.eq(*challenge_id))
            .col_expr(
                daily_challenge::Column::TotalSubmissions,
                Expr::value(i32::try_from(*n).unwrap_or(i32::MAX)),
            )
            .exec(&txn)
            .await?;
    }

    let total_challenges = daily_challenge::Entity::find().count(&txn).await?;
    let total_submissions: i64 = per_challenge.iter().map(|(_, n)| n).sum();
    let counters = DailyCounters::new(
        i64::try_from(total_challenges).unwrap_or(i64::MAX),
        total_submissions,
    );
    let row = write_stats(&txn, stats, counters).await?;

    txn.commit().await?;

    info!(
        total_challenges = row.total_challenges,
        total_submissions = row.total_submissions,
        "Daily stats reconciled"
    );
    Ok(Json(row.into()))
}
