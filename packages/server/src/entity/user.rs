use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile of an account known to the identity provider.
///
/// Rows are created lazily: a token subject without a row is treated as a
/// participant with no profile.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    /// Token subject issued by the identity provider.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub email: Option<String>,
    pub display_name: String,
    pub institution: Option<String>,

    pub role: String,
    #[sea_orm(belongs_to, from = "role", to = "name")]
    pub role_ref: HasOne<super::role::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
