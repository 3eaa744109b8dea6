use axum::{extract::FromRequestParts, http::request::Parts};
use common::Role;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{role_permission, user};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// The token only proves identity. Role and permissions are looked up on every
/// request, so role changes apply without re-issuing tokens.
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Returns `Ok(())` if the user has the given permission, `Err(PermissionDenied)` otherwise.
    pub fn require_permission(&self, permission: &str) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims =
            jwt::verify(token, &state.config.auth.jwt_secret).map_err(|_| AppError::TokenInvalid)?;

        let role: Option<String> = user::Entity::find_by_id(claims.sub.clone())
            .select_only()
            .column(user::Column::Role)
            .into_tuple()
            .one(&state.db)
            .await?;
        let role = role.unwrap_or_else(|| Role::DEFAULT.as_str().to_string());

        let permissions: Vec<String> = role_permission::Entity::find()
            .filter(role_permission::Column::Role.eq(&role))
            .select_only()
            .column(role_permission::Column::Permission)
            .into_tuple()
            .all(&state.db)
            .await?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
            role,
            permissions,
        })
    }
}
