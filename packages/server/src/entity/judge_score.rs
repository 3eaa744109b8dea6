use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The single judge score attached to a submission. Shares its key.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "judge_score")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub competition_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub challenge_id: i32,

    pub judge_id: String,
    #[sea_orm(belongs_to, from = "judge_id", to = "id")]
    pub judge: HasOne<super::user::Entity>,

    /// 1 to 10.
    pub score: i32,
    #[sea_orm(column_type = "Text")]
    pub comment: String,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
