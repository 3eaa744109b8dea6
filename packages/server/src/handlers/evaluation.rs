use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, Query, State};
use common::SubmissionStatus;
use common::evaluator::{CompetitionJob, average_score};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{challenge, llm_evaluation, submission, user};
use crate::error::{AppError, ErrorBody};
use crate::evaluator::EvaluatorClientExt;
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::evaluation::*;
use crate::models::shared::{Pagination, like_pattern, page_params};
use crate::state::AppState;
use crate::utils::competition::find_competition;
use crate::utils::users::profiles;

#[utoipa::path(
    post,
    path = "/competitions/{id}/evaluations/start",
    tag = "Evaluations",
    operation_id = "startEvaluation",
    summary = "Start bulk LLM evaluation",
    description = "Asks the evaluator service to score every submission of the competition. The evaluator reply is passed through. Requires `evaluation:run` permission.",
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
pub async fn start_evaluation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
) -> Result<Json<EvaluatorJobResponse>, AppError> {
    auth_user.require_permission("evaluation:run")?;
    find_competition(&state.db, competition_id).await?;

    let job = CompetitionJob {
        competition_id,
        requested_by: auth_user.user_id,
    };
    let reply = state.evaluator.start_evaluation(&job).await?;
    info!("Bulk evaluation started");

    Ok(Json(EvaluatorJobResponse {
        competition_id,
        evaluator: reply,
    }))
}

#[utoipa::path(
    post,
    path = "/competitions/{id}/evaluations/results",
    tag = "Evaluations",
    operation_id = "ingestEvaluations",
    summary = "Ingest LLM score cards",
    description = "Called by the evaluator service to store score cards. Each card must reference an existing submission; a card for the same submission and model replaces the earlier one. Submissions still `Submitted` become `Evaluated`. Requires `evaluation:run` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = IngestEvaluationsRequest,
    responses(
        (status = 200, description = "Score cards stored", body = IngestEvaluationsResponse),
        (status = 400, description = "Validation error or unknown submission (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(competition_id, count = payload.results.len()))]
pub async fn ingest_evaluations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
    AppJson(payload): AppJson<IngestEvaluationsRequest>,
) -> Result<Json<IngestEvaluationsResponse>, AppError> {
    auth_user.require_permission("evaluation:run")?;
    validate_ingest_evaluations(&payload)?;

    let txn = state.db.begin().await?;
    find_competition(&txn, competition_id).await?;

    let participant_ids: HashSet<String> = payload
        .results
        .iter()
        .map(|c| c.participant_id.clone())
        .collect();
    let existing: HashSet<(String, i32)> = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::ParticipantId.is_in(participant_ids))
        .select_only()
        .column(submission::Column::ParticipantId)
        .column(submission::Column::ChallengeId)
        .into_tuple::<(String, i32)>()
        .all(&txn)
        .await?
        .into_iter()
        .collect();

    if let Some(card) = payload
        .results
        .iter()
        .find(|c| !existing.contains(&(c.participant_id.clone(), c.challenge_id)))
    {
        return Err(AppError::Validation(format!(
            "No submission from {} for challenge {}",
            card.participant_id, card.challenge_id
        )));
    }

    let now = chrono::Utc::now();
    let ingested = payload.results.len() as u64;
    let mut touched: HashSet<(String, i32)> = HashSet::new();
    for card in payload.results {
        let model_name = card.model.trim().to_string();
        llm_evaluation::Entity::delete_many()
            .filter(llm_evaluation::Column::CompetitionId.eq(competition_id))
            .filter(llm_evaluation::Column::ParticipantId.eq(card.participant_id.as_str()))
            .filter(llm_evaluation::Column::ChallengeId.eq(card.challenge_id))
            .filter(llm_evaluation::Column::Model.eq(model_name.as_str()))
            .exec(&txn)
            .await?;

        llm_evaluation::ActiveModel {
            competition_id: Set(competition_id),
            participant_id: Set(card.participant_id.clone()),
            challenge_id: Set(card.challenge_id),
            model: Set(model_name),
            score: Set(card.score),
            rationale: Set(card.rationale),
            evaluated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        touched.insert((card.participant_id, card.challenge_id));
    }

    for (participant_id, challenge_id) in &touched {
        submission::Entity::update_many()
            .filter(submission::Column::CompetitionId.eq(competition_id))
            .filter(submission::Column::ParticipantId.eq(participant_id.as_str()))
            .filter(submission::Column::ChallengeId.eq(*challenge_id))
            .filter(submission::Column::Status.eq(SubmissionStatus::Submitted))
            .col_expr(
                submission::Column::Status,
                Expr::value(SubmissionStatus::Evaluated),
            )
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(submissions = touched.len(), "LLM score cards ingested");
    Ok(Json(IngestEvaluationsResponse { ingested }))
}

#[utoipa::path(
    get,
    path = "/competitions/{id}/evaluations",
    tag = "Evaluations",
    operation_id = "listEvaluations",
    summary = "Browse submissions with LLM score cards",
    description = "Paginated list of the competition's submissions, newest first, each with its LLM score cards and their average. `search` matches prompt text or participant display name, case-insensitively. Requires `submission:view_all` permission.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        EvaluationListQuery,
    ),
    responses(
        (status = 200, description = "Submissions with score cards", body = EvaluationListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(competition_id))]
pub async fn list_evaluations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(competition_id): Path<i32>,
    Query(query): Query<EvaluationListQuery>,
) -> Result<Json<EvaluationListResponse>, AppError> {
    auth_user.require_permission("submission:view_all")?;
    let db = &state.db;
    find_competition(db, competition_id).await?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = submission::Entity::find()
        .left_join(user::Entity)
        .filter(submission::Column::CompetitionId.eq(competition_id));

    if let Some(challenge_id) = query.challenge_id {
        select = select.filter(submission::Column::ChallengeId.eq(challenge_id));
    }
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        submission::Entity,
                        submission::Column::PromptText,
                    ))))
                    .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        user::Entity,
                        user::Column::DisplayName,
                    ))))
                    .like(LikeExpr::new(pattern).escape('\\')),
                ),
        );
    }

    let total = select.clone().paginate(db, per_page).num_items().await?;

    let rows = select
        .order_by_desc(submission::Column::SubmittedAt)
        .order_by_asc(submission::Column::ParticipantId)
        .order_by_asc(submission::Column::ChallengeId)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(db)
        .await?;

    let participant_ids: Vec<String> = rows
        .iter()
        .map(|s| s.participant_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let (cards, titles) = tokio::try_join!(
        llm_evaluation::Entity::find()
            .filter(llm_evaluation::Column::CompetitionId.eq(competition_id))
            .filter(llm_evaluation::Column::ParticipantId.is_in(participant_ids.clone()))
            .order_by_asc(llm_evaluation::Column::Model)
            .all(db),
        challenge::Entity::find()
            .filter(challenge::Column::CompetitionId.eq(competition_id))
            .select_only()
            .column(challenge::Column::Id)
            .column(challenge::Column::Title)
            .into_tuple::<(i32, String)>()
            .all(db),
    )?;
    let profiles = profiles(db, &participant_ids).await?;
    let titles: HashMap<i32, String> = titles.into_iter().collect();

    let mut cards_by_submission: HashMap<(String, i32), Vec<LlmScoreCard>> = HashMap::new();
    for card in cards {
        cards_by_submission
            .entry((card.participant_id.clone(), card.challenge_id))
            .or_default()
            .push(card.into());
    }

    let data = rows
        .into_iter()
        .map(|s| {
            let score_cards = cards_by_submission
                .remove(&(s.participant_id.clone(), s.challenge_id))
                .unwrap_or_default();
            let scores: Vec<f64> = score_cards.iter().map(|c| c.score).collect();
            EvaluationListItem {
                display_name: profiles
                    .get(&s.participant_id)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| s.participant_id.clone()),
                challenge_title: titles.get(&s.challenge_id).cloned().unwrap_or_default(),
                average_score: average_score(&scores),
                score_cards,
                participant_id: s.participant_id,
                challenge_id: s.challenge_id,
                prompt_text: s.prompt_text,
                status: s.status,
                submitted_at: s.submitted_at,
            }
        })
        .collect();

    Ok(Json(EvaluationListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}
