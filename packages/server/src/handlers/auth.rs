use axum::{Json, extract::State};
use common::role::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::auth::WhoAmIResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/auth/whoami",
    tag = "Auth",
    operation_id = "whoAmI",
    summary = "Resolve the caller's identity and role",
    description = "Returns the caller's profile, role, permissions and the landing path the client should route to. Callers without a profile row are reported as participants.",
    responses(
        (status = 200, description = "Current user", body = WhoAmIResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn whoami(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<WhoAmIResponse>, AppError> {
    let profile = user::Entity::find_by_id(auth_user.user_id.clone())
        .one(&state.db)
        .await?;

    let (display_name, institution, email) = match profile {
        Some(u) => (Some(u.display_name), u.institution, u.email.or(auth_user.email)),
        None => (None, None, auth_user.email),
    };

    Ok(Json(WhoAmIResponse {
        landing_path: Role::landing_path_for(&auth_user.role).to_string(),
        id: auth_user.user_id,
        email,
        display_name,
        institution,
        role: auth_user.role,
        permissions: auth_user.permissions,
    }))
}
