use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Precomputed leaderboard row, published by the evaluator.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leaderboard_entry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub competition_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub rank: i32,
    pub total_score: f64,
    pub llm_score: Option<f64>,
    pub judge_score: Option<f64>,

    pub generated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
