use axum::Json;
use axum::extract::{Path, Query, State};
use common::Role;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, OnConflict};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{role, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::*;
use crate::models::shared::{Pagination, like_pattern, page_params};
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/users/me",
    tag = "Users",
    operation_id = "updateMyProfile",
    summary = "Create or update the caller's profile",
    description = "Upserts the caller's profile row. The role of an existing row is kept; a new row starts as `participant`.",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_my_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_update_profile(&payload)?;

    let now = chrono::Utc::now();
    let email = payload.email.or(auth_user.email);
    let model = user::ActiveModel {
        id: Set(auth_user.user_id.clone()),
        email: Set(email),
        display_name: Set(payload.display_name.trim().to_string()),
        institution: Set(payload
            .institution
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())),
        role: Set(Role::DEFAULT.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_columns([
                    user::Column::Email,
                    user::Column::DisplayName,
                    user::Column::Institution,
                    user::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await?;

    let saved = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Profile vanished after upsert".into()))?;

    Ok(Json(saved.into()))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    description = "Paginated user listing with search over display name and email. Requires `user:manage` permission.",
    params(UserListQuery),
    responses(
        (status = 200, description = "List of users", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission("user:manage")?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = user::Entity::find();
    if let Some(pattern) = like_pattern(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(user::Column::DisplayName)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(user::Column::Email)))
                        .like(LikeExpr::new(pattern).escape('\\')),
                ),
        );
    }
    if let Some(ref role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(user::Column::CreatedAt)
        .order_by_asc(user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    patch,
    path = "/users/{id}/role",
    tag = "Users",
    operation_id = "updateUserRole",
    summary = "Change a user's role",
    description = "Assigns a role to a user, creating the profile row if needed. The role must exist. Requires `user:manage` permission. Callers cannot change their own role.",
    params(("id" = String, Path, description = "User ID (token subject)")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Unknown role or self-change (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(target = %id, role = %payload.role))]
pub async fn update_user_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    if id == auth_user.user_id {
        return Err(AppError::Validation("Cannot change your own role".into()));
    }

    let role_name = payload.role.trim().to_string();
    let known = role::Entity::find_by_id(role_name.clone())
        .one(&state.db)
        .await?
        .is_some();
    if !known {
        return Err(AppError::Validation(format!("Unknown role '{role_name}'")));
    }

    let txn = state.db.begin().await?;
    crate::utils::users::ensure_user(&txn, &id, None).await?;
    let existing = user::Entity::find_by_id(id.clone())
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut active: user::ActiveModel = existing.into();
    active.role = Set(role_name);
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&txn).await?;
    txn.commit().await?;

    info!(role = %model.role, "User role changed");
    Ok(Json(model.into()))
}
