use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use common::competition::check_accepting;
use common::{Phase, SubmissionStatus};
use futures::Stream;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

use crate::entity::{challenge, competition, judge_score, llm_evaluation, participant, submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::live::SubmissionEvent;
use crate::models::submission::*;
use crate::state::AppState;
use crate::utils::competition::{
    batch_window, check_visible_to_member, competition_window, count_completed, find_challenge,
    find_competition, find_participant, require_started,
};

/// Why a participant cannot submit to a challenge right now.
#[derive(Debug, PartialEq, Eq)]
enum Refusal {
    NotParticipant,
    Locked,
    Closed(String),
}

impl Refusal {
    fn message(&self) -> String {
        match self {
            Refusal::NotParticipant => "You are not registered for this competition".into(),
            Refusal::Locked => "Your submissions have been locked by a judge".into(),
            Refusal::Closed(msg) => msg.clone(),
        }
    }
}

impl From<Refusal> for AppError {
    fn from(refusal: Refusal) -> Self {
        match refusal {
            Refusal::NotParticipant => AppError::PermissionDenied,
            Refusal::Locked => AppError::Conflict(refusal.message()),
            Refusal::Closed(msg) => AppError::Validation(msg),
        }
    }
}

/// Run every gate a submission must pass, in the order the client reports them.
async fn submission_gate<C: ConnectionTrait>(
    db: &C,
    competition: &competition::Model,
    member: Option<&participant::Model>,
    challenge: &challenge::Model,
    now: DateTime<Utc>,
) -> Result<Result<(), Refusal>, DbErr> {
    let Some(member) = member else {
        return Ok(Err(Refusal::NotParticipant));
    };
    if member.locked {
        return Ok(Err(Refusal::Locked));
    }
    if let Err(reason) = check_accepting(
        &competition_window(competition),
        competition.is_active,
        competition.is_locked,
        now,
    ) {
        return Ok(Err(Refusal::Closed(reason.to_string())));
    }
    if competition.level.uses_batches() {
        match batch_window(db, member).await?.map(|w| w.phase_at(now)) {
            None => return Ok(Err(Refusal::Closed("No batch assigned".into()))),
            Some(Phase::Upcoming) => {
                return Ok(Err(Refusal::Closed("Batch has not started yet".into())));
            }
            Some(Phase::Ended) => return Ok(Err(Refusal::Closed("Batch has ended".into()))),
            Some(Phase::Open) => {}
        }
    }
    if now >= challenge.end_deadline {
        return Ok(Err(Refusal::Closed("Challenge deadline has passed".into())));
    }
    Ok(Ok(()))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/challenges/{challenge_id}/my-submission",
    tag = "Submissions",
    operation_id = "getMySubmission",
    summary = "Get a challenge with the caller's prior submission",
    description = "Returns the challenge, the caller's stored submission (or null), the competition phase, and whether a submission would currently be accepted. `closed_reason` explains a refusal.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("challenge_id" = i32, Path, description = "Challenge ID"),
    ),
    responses(
        (status = 200, description = "Challenge and submission", body = MySubmissionResponse),
        (status = 400, description = "Competition has not started yet (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition or challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id, challenge_id, user_id = %auth_user.user_id))]
pub async fn get_my_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, challenge_id)): Path<(i32, i32)>,
) -> Result<Json<MySubmissionResponse>, AppError> {
    let db = &state.db;
    let user_id = auth_user.user_id.as_str();

    let (competition, challenge, member, existing) = tokio::try_join!(
        find_competition(db, competition_id),
        find_challenge(db, competition_id, challenge_id),
        async { Ok::<_, AppError>(find_participant(db, competition_id, user_id).await?) },
        async {
            Ok::<_, AppError>(
                submission::Entity::find_by_id((
                    competition_id,
                    user_id.to_string(),
                    challenge_id,
                ))
                .one(db)
                .await?,
            )
        },
    )?;

    check_visible_to_member(&auth_user, &competition, member.as_ref())?;
    if member.is_none() && !auth_user.has_permission("submission:view_all") {
        return Err(AppError::PermissionDenied);
    }
    require_started(&auth_user, &competition)?;

    let now = Utc::now();
    let gate = submission_gate(db, &competition, member.as_ref(), &challenge, now).await?;

    Ok(Json(MySubmissionResponse {
        phase: competition_window(&competition).phase_at(now),
        can_submit: gate.is_ok(),
        closed_reason: gate.err().map(|r| r.message()),
        challenge: challenge.into(),
        submission: existing.map(SubmissionResponse::from),
    }))
}

#[utoipa::path(
    put,
    path = "/competitions/{id}/challenges/{challenge_id}/submission",
    tag = "Submissions",
    operation_id = "submitPrompt",
    summary = "Submit or resubmit a prompt",
    description = "Stores the caller's prompt for the challenge, overwriting any earlier one. A resubmission resets the status to `Submitted` and discards the scores of the replaced prompt. Requires `submission:submit` permission and an open competition, batch and challenge deadline.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("challenge_id" = i32, Path, description = "Challenge ID"),
    ),
    request_body = SubmitPromptRequest,
    responses(
        (status = 200, description = "Submission stored", body = SubmissionResponse),
        (status = 400, description = "Invalid prompt or competition closed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition or challenge not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Participant is locked (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, challenge_id, user_id = %auth_user.user_id))]
pub async fn submit_prompt(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((competition_id, challenge_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<SubmitPromptRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    auth_user.require_permission("submission:submit")?;
    validate_prompt(&payload.prompt_text, state.config.submission.max_prompt_chars)?;

    let user_id = auth_user.user_id.clone();
    let txn = state.db.begin().await?;

    let competition = find_competition(&txn, competition_id).await?;
    let challenge = find_challenge(&txn, competition_id, challenge_id).await?;
    // Row lock serializes against a concurrent judge lock.
    let member = participant::Entity::find_by_id((competition_id, user_id.clone()))
        .lock(sea_orm::sea_query::LockType::Update)
        .one(&txn)
        .await?;

    let now = Utc::now();
    submission_gate(&txn, &competition, member.as_ref(), &challenge, now).await??;

    let key = (competition_id, user_id.clone(), challenge_id);
    let replaced = submission::Entity::find_by_id(key.clone())
        .one(&txn)
        .await?
        .is_some();
    if replaced {
        judge_score::Entity::delete_by_id(key.clone())
            .exec(&txn)
            .await?;
        llm_evaluation::Entity::delete_many()
            .filter(llm_evaluation::Column::CompetitionId.eq(competition_id))
            .filter(llm_evaluation::Column::ParticipantId.eq(user_id.as_str()))
            .filter(llm_evaluation::Column::ChallengeId.eq(challenge_id))
            .exec(&txn)
            .await?;
    }

    let model = submission::ActiveModel {
        competition_id: Set(competition_id),
        participant_id: Set(user_id.clone()),
        challenge_id: Set(challenge_id),
        prompt_text: Set(payload.prompt_text),
        status: Set(SubmissionStatus::Submitted),
        submitted_at: Set(now),
    };
    submission::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                submission::Column::CompetitionId,
                submission::Column::ParticipantId,
                submission::Column::ChallengeId,
            ])
            .update_columns([
                submission::Column::PromptText,
                submission::Column::Status,
                submission::Column::SubmittedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    let completed = count_completed(&txn, competition_id, &user_id).await?;
    participant::Entity::update_many()
        .filter(participant::Column::CompetitionId.eq(competition_id))
        .filter(participant::Column::UserId.eq(user_id.as_str()))
        .col_expr(participant::Column::CompletedChallenges, Expr::value(completed))
        .exec(&txn)
        .await?;

    let total_submissions = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .count(&txn)
        .await?;

    let stored = submission::Entity::find_by_id(key)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Submission vanished after upsert".into()))?;
    txn.commit().await?;

    info!(replaced, completed, "Prompt submitted");
    state.feed.publish(SubmissionEvent {
        competition_id,
        participant_id: user_id,
        challenge_id,
        total_submissions,
    });

    Ok(Json(stored.into()))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/submissions/live",
    tag = "Submissions",
    operation_id = "streamSubmissions",
    summary = "Live submission feed",
    description = "Server-Sent Events stream. Each accepted submission in the competition emits a `submission` event carrying the running submission count. Requires `submission:view_all` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = SubmissionEvent),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(competition_id))]
pub async fn stream_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    auth_user.require_permission("submission:view_all")?;
    find_competition(&state.db, competition_id).await?;

    let rx = state.feed.subscribe();
    let stream = futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.competition_id == competition_id => {
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().event("submission").data(data)), rx));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live feed listener lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
