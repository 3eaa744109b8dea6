use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::error::AppError;

/// Result of the auth gate.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WhoAmIResponse {
    #[schema(example = "uid-alice")]
    pub id: String,
    pub email: Option<String>,
    /// Null when the user has no profile row yet.
    pub display_name: Option<String>,
    pub institution: Option<String>,
    #[schema(example = "participant")]
    pub role: String,
    #[schema(example = json!(["submission:submit"]))]
    pub permissions: Vec<String>,
    /// Client route for this role.
    #[schema(example = "/participant")]
    pub landing_path: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    #[schema(example = "Alice Liddell")]
    pub display_name: String,
    #[schema(example = "Oxford")]
    pub institution: Option<String>,
    pub email: Option<String>,
}

pub fn validate_update_profile(req: &UpdateProfileRequest) -> Result<(), AppError> {
    let name = req.display_name.trim();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(AppError::Validation(
            "Display name must be 1-64 characters".into(),
        ));
    }
    if req
        .institution
        .as_ref()
        .is_some_and(|i| i.chars().count() > 128)
    {
        return Err(AppError::Validation(
            "Institution must be at most 128 characters".into(),
        ));
    }
    if let Some(ref email) = req.email
        && (!email.contains('@') || email.len() > 254)
    {
        return Err(AppError::Validation("Email is not valid".into()));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub institution: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for UserResponse {
    fn from(m: crate::entity::user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            display_name: m.display_name,
            institution: m.institution,
            role: m.role,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive search over display name and email.
    pub search: Option<String>,
    pub role: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "judge")]
    pub role: String,
}
