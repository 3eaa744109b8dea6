use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{challenge, competition, participant, submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::competition::*;
use crate::models::shared::{Pagination, like_pattern, page_params};
use crate::state::AppState;
use crate::utils::competition::{
    check_competition_visible, count_completed, delete_challenge_data, delete_competition_cascade,
    find_challenge, find_competition, find_competition_for_update, require_started,
};

#[utoipa::path(
    post,
    path = "/competitions",
    tag = "Competitions",
    operation_id = "createCompetition",
    summary = "Create a new competition",
    description = "Creates a new competition. Requires `competition:create` permission. Offline competitions must name a venue.",
    request_body = CreateCompetitionRequest,
    responses(
        (status = 201, description = "Competition created", body = CompetitionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCompetitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:create")?;
    validate_create_competition(&payload)?;

    let now = chrono::Utc::now();
    let new_competition = competition::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        start_deadline: Set(payload.start_deadline),
        end_deadline: Set(payload.end_deadline),
        is_active: Set(payload.is_active.unwrap_or(true)),
        is_locked: Set(false),
        is_featured: Set(payload.is_featured.unwrap_or(false)),
        mode: Set(payload.mode),
        venue: Set(payload.venue.map(|v| v.trim().to_string())),
        level: Set(payload.level),
        prize_money: Set(payload.prize_money.unwrap_or(0)),
        system_prompt: Set(payload.system_prompt.unwrap_or_default()),
        created_by: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_competition.insert(&state.db).await?;
    info!(competition_id = model.id, "Competition created");

    Ok((StatusCode::CREATED, Json(CompetitionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/competitions",
    tag = "Competitions",
    operation_id = "listCompetitions",
    summary = "List competitions with pagination and search",
    description = "Returns a paginated list of competitions. Users without `competition:manage` only see active competitions. Supports sorting by `created_at`, `start_deadline`, `end_deadline`, or `title`.",
    params(CompetitionListQuery),
    responses(
        (status = 200, description = "List of competitions", body = CompetitionListResponse),
        (status = 400, description = "Invalid sort field (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_competitions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CompetitionListQuery>,
) -> Result<Json<CompetitionListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = competition::Entity::find();

    if !auth_user.has_permission("competition:manage") {
        select = select.filter(competition::Column::IsActive.eq(true));
    }
    if let Some(active) = query.active {
        select = select.filter(competition::Column::IsActive.eq(active));
    }
    if let Some(featured) = query.featured {
        select = select.filter(competition::Column::IsFeatured.eq(featured));
    }
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(competition::Column::Title)))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => competition::Column::CreatedAt,
        "start_deadline" => competition::Column::StartDeadline,
        "end_deadline" => competition::Column::EndDeadline,
        "title" => competition::Column::Title,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, start_deadline, end_deadline, title".into(),
            ));
        }
    };

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by(sort_column, sort_order)
        .order_by_asc(competition::Column::Id)
        .select_only()
        .column(competition::Column::Id)
        .column(competition::Column::Title)
        .column(competition::Column::StartDeadline)
        .column(competition::Column::EndDeadline)
        .column(competition::Column::IsActive)
        .column(competition::Column::IsLocked)
        .column(competition::Column::IsFeatured)
        .column(competition::Column::Mode)
        .column(competition::Column::Level)
        .column(competition::Column::PrizeMoney)
        .column(competition::Column::CreatedAt)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .into_model::<CompetitionListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(CompetitionListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}",
    tag = "Competitions",
    operation_id = "getCompetition",
    summary = "Get a competition by ID",
    description = "Returns the full details of a competition. Inactive competitions are reported as not found to users without `competition:manage`.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Competition details", body = CompetitionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CompetitionResponse>, AppError> {
    let model = find_competition(&state.db, id).await?;
    check_competition_visible(&auth_user, &model)?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/competitions/{id}",
    tag = "Competitions",
    operation_id = "updateCompetition",
    summary = "Update an existing competition",
    description = "Partially updates a competition using PATCH semantics. Requires `competition:manage` permission. An empty payload returns the current resource unchanged. Deadlines and the venue rule are re-checked against stored values.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = UpdateCompetitionRequest,
    responses(
        (status = 200, description = "Competition updated", body = CompetitionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCompetitionRequest>,
) -> Result<Json<CompetitionResponse>, AppError> {
    auth_user.require_permission("competition:manage")?;
    validate_update_competition(&payload)?;

    if payload == UpdateCompetitionRequest::default() {
        let existing = find_competition(&state.db, id).await?;
        return Ok(Json(existing.into()));
    }

    let txn = state.db.begin().await?;
    let existing = find_competition_for_update(&txn, id).await?;

    let effective_venue = match payload.venue {
        Some(ref venue) => venue.clone(),
        None => existing.venue.clone(),
    };
    validate_merged_competition(
        payload.start_deadline.unwrap_or(existing.start_deadline),
        payload.end_deadline.unwrap_or(existing.end_deadline),
        payload.mode.unwrap_or(existing.mode),
        effective_venue.as_deref(),
    )?;

    let mut active: competition::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(start) = payload.start_deadline {
        active.start_deadline = Set(start);
    }
    if let Some(end) = payload.end_deadline {
        active.end_deadline = Set(end);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_locked) = payload.is_locked {
        active.is_locked = Set(is_locked);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    if let Some(mode) = payload.mode {
        active.mode = Set(mode);
    }
    if let Some(venue) = payload.venue {
        active.venue = Set(venue.map(|v| v.trim().to_string()));
    }
    if let Some(level) = payload.level {
        active.level = Set(level);
    }
    if let Some(prize_money) = payload.prize_money {
        active.prize_money = Set(prize_money);
    }
    if let Some(system_prompt) = payload.system_prompt {
        active.system_prompt = Set(system_prompt);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/competitions/{id}",
    tag = "Competitions",
    operation_id = "deleteCompetition",
    summary = "Delete a competition by ID",
    description = "Permanently deletes a competition together with its challenges, batches, participants, submissions, judge scores, LLM evaluations and leaderboard, in one transaction. Requires `competition:delete` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 204, description = "Competition deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:delete")?;

    let txn = state.db.begin().await?;
    find_competition_for_update(&txn, id).await?;
    delete_competition_cascade(&txn, id).await?;
    txn.commit().await?;

    info!("Competition deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/competitions/{id}/challenges",
    tag = "Challenges",
    operation_id = "createChallenge",
    summary = "Add a challenge to a competition",
    description = "Creates a challenge inside the competition. Requires `challenge:manage` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge created", body = ChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id))]
pub async fn create_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
    AppJson(payload): AppJson<CreateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("challenge:manage")?;
    validate_create_challenge(&payload)?;

    let txn = state.db.begin().await?;
    find_competition_for_update(&txn, competition_id).await?;

    let now = chrono::Utc::now();
    let model = challenge::ActiveModel {
        competition_id: Set(competition_id),
        title: Set(payload.title.trim().to_string()),
        problem_statement: Set(payload.problem_statement),
        guidelines: Set(payload.guidelines),
        end_deadline: Set(payload.end_deadline),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(ChallengeResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/challenges",
    tag = "Challenges",
    operation_id = "listChallenges",
    summary = "List challenges in a competition",
    description = "Returns the competition's challenges ordered by deadline. Users without `challenge:manage` can only list challenges once the competition has started.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "List of challenges", body = Vec<ChallengeResponse>),
        (status = 400, description = "Competition not started (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn list_challenges(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<Vec<ChallengeResponse>>, AppError> {
    let competition = find_competition(&state.db, competition_id).await?;
    check_competition_visible(&auth_user, &competition)?;
    require_started(&auth_user, &competition)?;

    let items = challenge::Entity::find()
        .filter(challenge::Column::CompetitionId.eq(competition_id))
        .order_by_asc(challenge::Column::EndDeadline)
        .order_by_asc(challenge::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(ChallengeResponse::from)
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/challenges/{challenge_id}",
    tag = "Challenges",
    operation_id = "getChallenge",
    summary = "Get a challenge",
    description = "Returns a single challenge. Same start-time gate as listChallenges.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("challenge_id" = i32, Path, description = "Challenge ID"),
    ),
    responses(
        (status = 200, description = "Challenge details", body = ChallengeResponse),
        (status = 400, description = "Competition not started (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition or challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, challenge_id))]
pub async fn get_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, challenge_id)): Path<(i32, i32)>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let competition = find_competition(&state.db, competition_id).await?;
    check_competition_visible(&auth_user, &competition)?;
    require_started(&auth_user, &competition)?;
    let model = find_challenge(&state.db, competition_id, challenge_id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/competitions/{id}/challenges/{challenge_id}",
    tag = "Challenges",
    operation_id = "updateChallenge",
    summary = "Update a challenge",
    description = "Partially updates a challenge. Requires `challenge:manage` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("challenge_id" = i32, Path, description = "Challenge ID"),
    ),
    request_body = UpdateChallengeRequest,
    responses(
        (status = 200, description = "Challenge updated", body = ChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition or challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, challenge_id))]
pub async fn update_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, challenge_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateChallengeRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    auth_user.require_permission("challenge:manage")?;
    validate_update_challenge(&payload)?;

    if payload == UpdateChallengeRequest::default() {
        let existing = find_challenge(&state.db, competition_id, challenge_id).await?;
        return Ok(Json(existing.into()));
    }

    let txn = state.db.begin().await?;
    find_competition_for_update(&txn, competition_id).await?;
    let existing = find_challenge(&txn, competition_id, challenge_id).await?;

    let mut active: challenge::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(statement) = payload.problem_statement {
        active.problem_statement = Set(statement);
    }
    if let Some(guidelines) = payload.guidelines {
        active.guidelines = Set(guidelines);
    }
    if let Some(end_deadline) = payload.end_deadline {
        active.end_deadline = Set(end_deadline);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/competitions/{id}/challenges/{challenge_id}",
    tag = "Challenges",
    operation_id = "deleteChallenge",
    summary = "Delete a challenge",
    description = "Deletes a challenge with its submissions, judge scores and LLM evaluations, and recounts completed challenges for the affected participants. Requires `challenge:manage` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("challenge_id" = i32, Path, description = "Challenge ID"),
    ),
    responses(
        (status = 204, description = "Challenge deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition or challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, challenge_id))]
pub async fn delete_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, challenge_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("challenge:manage")?;

    let txn = state.db.begin().await?;
    find_competition_for_update(&txn, competition_id).await?;
    find_challenge(&txn, competition_id, challenge_id).await?;

    let affected: HashSet<String> = submission::Entity::find()
        .filter(submission::Column::ChallengeId.eq(challenge_id))
        .select_only()
        .column(submission::Column::ParticipantId)
        .into_tuple::<String>()
        .all(&txn)
        .await?
        .into_iter()
        .collect();

    delete_challenge_data(&txn, challenge_id).await?;
    challenge::Entity::delete_by_id(challenge_id)
        .exec(&txn)
        .await?;

    for user_id in &affected {
        let completed = count_completed(&txn, competition_id, user_id).await?;
        participant::Entity::update_many()
            .filter(participant::Column::CompetitionId.eq(competition_id))
            .filter(participant::Column::UserId.eq(user_id.as_str()))
            .col_expr(participant::Column::CompletedChallenges, Expr::value(completed))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(affected = affected.len(), "Challenge deleted");
    Ok(StatusCode::NO_CONTENT)
}
