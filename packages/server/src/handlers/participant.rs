use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Phase;
use common::dashboard::{self, DashboardInput};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{batch, challenge, judge_score, llm_evaluation, participant, submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::competition::*;
use crate::models::shared::validate_bulk_ids;
use crate::state::AppState;
use crate::utils::competition::{
    batch_window, check_visible_to_member, competition_window, find_batch, find_competition,
    find_competition_for_update, find_participant, find_participant_for_update, require_started,
};
use crate::utils::users::{Profile, ensure_user, profile, profiles};

#[utoipa::path(
    post,
    path = "/competitions/{id}/register",
    tag = "Participants",
    operation_id = "registerForCompetition",
    summary = "Register for a competition",
    description = "Registers the caller as a participant. The competition must be active and not yet ended. Returns 409 if already registered.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 201, description = "Registered", body = ParticipantResponse),
        (status = 400, description = "Competition closed for registration (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already registered (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, user_id = %auth_user.user_id))]
pub async fn register(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, competition_id).await?;

    if !competition.is_active {
        return Err(AppError::NotFound("Competition not found".into()));
    }
    if competition_window(&competition).phase_at(chrono::Utc::now()) == Phase::Ended {
        return Err(AppError::Validation("Competition has ended".into()));
    }

    ensure_user(&txn, &auth_user.user_id, auth_user.email.as_deref()).await?;
    let model = insert_participant(&txn, competition_id, &auth_user.user_id).await?;
    let profile = profile(&txn, &auth_user.user_id).await?;
    txn.commit().await?;

    info!("Participant registered");
    Ok((
        StatusCode::CREATED,
        Json(participant_response(model, &profile)),
    ))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/participants",
    tag = "Participants",
    operation_id = "listParticipants",
    summary = "List participants of a competition",
    description = "Returns all participants ordered by registration time. Requires `submission:view_all` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "List of participants", body = Vec<ParticipantResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn list_participants(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    auth_user.require_permission("submission:view_all")?;
    find_competition(&state.db, competition_id).await?;

    let rows = participant::Entity::find()
        .filter(participant::Column::CompetitionId.eq(competition_id))
        .order_by_asc(participant::Column::RegisteredAt)
        .order_by_asc(participant::Column::UserId)
        .all(&state.db)
        .await?;

    Ok(Json(with_profiles(&state.db, rows).await?))
}

#[utoipa::path(
    post,
    path = "/competitions/{id}/participants",
    tag = "Participants",
    operation_id = "addParticipant",
    summary = "Add a participant to a competition",
    description = "Adds a user as a participant (admin action). Creates a bare profile when the user has none. Requires `competition:manage` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = AddParticipantRequest,
    responses(
        (status = 201, description = "Participant added", body = ParticipantResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "User already a participant (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, user_id = %payload.user_id))]
pub async fn add_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
    AppJson(payload): AppJson<AddParticipantRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:manage")?;
    let user_id = payload.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id must not be empty".into()));
    }

    let txn = state.db.begin().await?;
    find_competition_for_update(&txn, competition_id).await?;
    ensure_user(&txn, &user_id, None).await?;
    let model = insert_participant(&txn, competition_id, &user_id).await?;
    let profile = profile(&txn, &user_id).await?;
    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(participant_response(model, &profile)),
    ))
}

#[utoipa::path(
    delete,
    path = "/competitions/{id}/participants/{user_id}",
    tag = "Participants",
    operation_id = "removeParticipant",
    summary = "Remove a participant",
    description = "Removes a participant together with their submissions, judge scores and LLM evaluations in this competition. Locked participants cannot be removed. Requires `competition:manage` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("user_id" = String, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "Participant removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Participant not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Participant is locked (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, user_id = %user_id))]
pub async fn remove_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, user_id)): Path<(i32, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_participant_for_update(&txn, competition_id, &user_id).await?;
    if existing.locked {
        return Err(AppError::Conflict(
            "Locked participants cannot be removed".into(),
        ));
    }

    judge_score::Entity::delete_many()
        .filter(judge_score::Column::CompetitionId.eq(competition_id))
        .filter(judge_score::Column::ParticipantId.eq(user_id.as_str()))
        .exec(&txn)
        .await?;
    llm_evaluation::Entity::delete_many()
        .filter(llm_evaluation::Column::CompetitionId.eq(competition_id))
        .filter(llm_evaluation::Column::ParticipantId.eq(user_id.as_str()))
        .exec(&txn)
        .await?;
    submission::Entity::delete_many()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::ParticipantId.eq(user_id.as_str()))
        .exec(&txn)
        .await?;
    let active: participant::ActiveModel = existing.into();
    active.delete(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/competitions/{id}/batches",
    tag = "Batches",
    operation_id = "createBatch",
    summary = "Create a batch",
    description = "Creates a time slot for a Level 2 competition. Requires `batch:manage` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created", body = BatchResponse),
        (status = 400, description = "Validation error, batch outside the competition deadlines, or Level 1 competition (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, name = %payload.name))]
pub async fn create_batch(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
    AppJson(payload): AppJson<CreateBatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("batch:manage")?;
    validate_create_batch(&payload)?;

    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, competition_id).await?;
    if !competition.level.uses_batches() {
        return Err(AppError::Validation(
            "Batches are only used by Level 2 competitions".into(),
        ));
    }
    validate_batch_within(&payload, &competition_window(&competition))?;

    let model = batch::ActiveModel {
        competition_id: Set(competition_id),
        name: Set(payload.name.trim().to_string()),
        start_time: Set(payload.start_time),
        end_time: Set(payload.end_time),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(BatchResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/batches",
    tag = "Batches",
    operation_id = "listBatches",
    summary = "List batches",
    description = "Returns the competition's batches ordered by start time. Requires `batch:manage` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "List of batches", body = Vec<BatchResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn list_batches(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<Vec<BatchResponse>>, AppError> {
    auth_user.require_permission("batch:manage")?;
    find_competition(&state.db, competition_id).await?;

    let items = batch::Entity::find()
        .filter(batch::Column::CompetitionId.eq(competition_id))
        .order_by_asc(batch::Column::StartTime)
        .order_by_asc(batch::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(BatchResponse::from)
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/batches/{batch_id}",
    tag = "Batches",
    operation_id = "getBatch",
    summary = "Get batch detail",
    description = "Returns the batch with its challenges. Users with `batch:manage` also get the member list; a participant may read only their own batch, and only once both the competition and the batch have started.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("batch_id" = i32, Path, description = "Batch ID"),
    ),
    responses(
        (status = 200, description = "Batch detail", body = BatchDetailResponse),
        (status = 400, description = "Competition or batch not started (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Batch not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, batch_id))]
pub async fn get_batch(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, batch_id)): Path<(i32, i32)>,
) -> Result<Json<BatchDetailResponse>, AppError> {
    let model = find_batch(&state.db, competition_id, batch_id).await?;
    let is_manager = auth_user.has_permission("batch:manage");

    if !is_manager {
        let competition = find_competition(&state.db, competition_id).await?;
        let member = find_participant(&state.db, competition_id, &auth_user.user_id).await?;
        check_visible_to_member(&auth_user, &competition, member.as_ref())?;
        if member.and_then(|p| p.batch_id) != Some(batch_id) {
            return Err(AppError::NotFound("Batch not found".into()));
        }
        require_started(&auth_user, &competition)?;
        if chrono::Utc::now() < model.start_time {
            return Err(AppError::Validation("Batch has not started yet".into()));
        }
    }

    let challenges = challenge::Entity::find()
        .filter(challenge::Column::CompetitionId.eq(competition_id))
        .order_by_asc(challenge::Column::EndDeadline)
        .order_by_asc(challenge::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(ChallengeResponse::from)
        .collect();

    let participants = if is_manager {
        let rows = participant::Entity::find()
            .filter(participant::Column::CompetitionId.eq(competition_id))
            .filter(participant::Column::BatchId.eq(batch_id))
            .order_by_asc(participant::Column::UserId)
            .all(&state.db)
            .await?;
        with_profiles(&state.db, rows).await?
    } else {
        Vec::new()
    };

    Ok(Json(BatchDetailResponse {
        batch: model.into(),
        participants,
        challenges,
    }))
}

#[utoipa::path(
    put,
    path = "/competitions/{id}/batches/{batch_id}/participants",
    tag = "Batches",
    operation_id = "assignBatchParticipants",
    summary = "Assign participants to a batch",
    description = "Moves the listed participants into the batch. Every user must already be registered. At most 500 IDs, no duplicates. Requires `batch:manage` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("batch_id" = i32, Path, description = "Batch ID"),
    ),
    request_body = AssignBatchRequest,
    responses(
        (status = 200, description = "Batch members after assignment", body = BatchDetailResponse),
        (status = 400, description = "Validation error or unknown participant (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Batch not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, batch_id, count = payload.user_ids.len()))]
pub async fn assign_batch_participants(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, batch_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<AssignBatchRequest>,
) -> Result<Json<BatchDetailResponse>, AppError> {
    auth_user.require_permission("batch:manage")?;
    validate_bulk_ids(&payload.user_ids, "user_ids", 500)?;

    let txn = state.db.begin().await?;
    find_competition_for_update(&txn, competition_id).await?;
    let model = find_batch(&txn, competition_id, batch_id).await?;

    let registered: HashSet<String> = participant::Entity::find()
        .filter(participant::Column::CompetitionId.eq(competition_id))
        .filter(participant::Column::UserId.is_in(payload.user_ids.iter().cloned()))
        .select_only()
        .column(participant::Column::UserId)
        .into_tuple::<String>()
        .all(&txn)
        .await?
        .into_iter()
        .collect();

    if let Some(missing) = payload.user_ids.iter().find(|id| !registered.contains(*id)) {
        return Err(AppError::Validation(format!(
            "User {missing} is not a participant of this competition"
        )));
    }

    participant::Entity::update_many()
        .filter(participant::Column::CompetitionId.eq(competition_id))
        .filter(participant::Column::UserId.is_in(payload.user_ids.iter().cloned()))
        .col_expr(participant::Column::BatchId, Expr::value(batch_id))
        .exec(&txn)
        .await?;

    let members = participant::Entity::find()
        .filter(participant::Column::CompetitionId.eq(competition_id))
        .filter(participant::Column::BatchId.eq(batch_id))
        .order_by_asc(participant::Column::UserId)
        .all(&txn)
        .await?;
    let participants = with_profiles(&txn, members).await?;

    let challenges = challenge::Entity::find()
        .filter(challenge::Column::CompetitionId.eq(competition_id))
        .order_by_asc(challenge::Column::EndDeadline)
        .all(&txn)
        .await?
        .into_iter()
        .map(ChallengeResponse::from)
        .collect();
    txn.commit().await?;

    info!(assigned = payload.user_ids.len(), "Batch participants assigned");

    Ok(Json(BatchDetailResponse {
        batch: model.into(),
        participants,
        challenges,
    }))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/dashboard",
    tag = "Participants",
    operation_id = "getDashboard",
    summary = "Resolve the caller's competition dashboard",
    description = "Computes the caller's dashboard state (`not_participant`, `no_batch`, `not_started`, `active`, `ended`) from the competition deadlines, their batch window and the current time. The challenge grid with submission badges is included only while active. `refresh_at` tells the client when the state next changes. Inactive competitions are hidden, except from registered participants once the competition has ended.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, user_id = %auth_user.user_id))]
pub async fn get_dashboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<DashboardResponse>, AppError> {
    let db = &state.db;
    let user_id = auth_user.user_id.as_str();

    let (competition, member, challenges, submissions) = tokio::try_join!(
        find_competition(db, competition_id),
        async { Ok::<_, AppError>(find_participant(db, competition_id, user_id).await?) },
        async {
            Ok::<_, AppError>(
                challenge::Entity::find()
                    .filter(challenge::Column::CompetitionId.eq(competition_id))
                    .order_by_asc(challenge::Column::EndDeadline)
                    .order_by_asc(challenge::Column::Id)
                    .all(db)
                    .await?,
            )
        },
        async {
            Ok::<_, AppError>(
                submission::Entity::find()
                    .filter(submission::Column::CompetitionId.eq(competition_id))
                    .filter(submission::Column::ParticipantId.eq(user_id))
                    .all(db)
                    .await?,
            )
        },
    )?;

    check_visible_to_member(&auth_user, &competition, member.as_ref())?;

    let batch = match member {
        Some(ref p) => batch_window(db, p).await?,
        None => None,
    };

    let now = chrono::Utc::now();
    let window = competition_window(&competition);
    let state_now = dashboard::resolve(&DashboardInput {
        is_participant: member.is_some(),
        level: competition.level,
        competition: window,
        batch,
        now,
    });

    let challenges = if state_now.is_active() {
        let status_by_challenge: HashMap<i32, _> = submissions
            .into_iter()
            .map(|s| (s.challenge_id, s.status))
            .collect();
        challenges
            .into_iter()
            .map(|c| {
                let status = status_by_challenge.get(&c.id).copied();
                DashboardChallenge {
                    id: c.id,
                    title: c.title,
                    end_deadline: c.end_deadline,
                    submitted: status.is_some(),
                    status,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(Json(DashboardResponse {
        phase: window.phase_at(now),
        refresh_at: state_now.refresh_at(),
        dashboard: state_now,
        competition: competition.into(),
        challenges,
    }))
}

async fn insert_participant(
    txn: &DatabaseTransaction,
    competition_id: i32,
    user_id: &str,
) -> Result<participant::Model, AppError> {
    let model = participant::ActiveModel {
        competition_id: Set(competition_id),
        user_id: Set(user_id.to_string()),
        batch_id: Set(None),
        locked: Set(false),
        locked_by: Set(None),
        locked_at: Set(None),
        completed_challenges: Set(0),
        registered_at: Set(chrono::Utc::now()),
    };

    match model.insert(txn).await {
        Ok(model) => Ok(model),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Conflict("Already a participant".into()))
        }
        Err(e) => Err(e.into()),
    }
}

fn participant_response(p: participant::Model, profile: &Profile) -> ParticipantResponse {
    ParticipantResponse {
        competition_id: p.competition_id,
        user_id: p.user_id,
        display_name: profile.display_name.clone(),
        institution: profile.institution.clone(),
        batch_id: p.batch_id,
        locked: p.locked,
        locked_by: p.locked_by,
        locked_at: p.locked_at,
        completed_challenges: p.completed_challenges,
        registered_at: p.registered_at,
    }
}

async fn with_profiles<C: ConnectionTrait>(
    db: &C,
    rows: Vec<participant::Model>,
) -> Result<Vec<ParticipantResponse>, AppError> {
    let ids: Vec<String> = rows.iter().map(|p| p.user_id.clone()).collect();
    let profiles = profiles(db, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|p| {
            let profile = profiles.get(&p.user_id).cloned().unwrap_or_else(|| Profile {
                display_name: p.user_id.clone(),
                institution: None,
            });
            participant_response(p, &profile)
        })
        .collect())
}
