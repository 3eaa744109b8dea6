use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub competition_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub batch_id: Option<i32>,
    #[sea_orm(belongs_to, from = "batch_id", to = "id")]
    pub batch: HasOne<super::batch::Entity>,

    /// Set once by a judge; never cleared.
    pub locked: bool,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTimeUtc>,

    /// Number of challenges with a stored submission.
    pub completed_challenges: i32,

    pub registered_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
