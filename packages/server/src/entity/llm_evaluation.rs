use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Score card produced by one language model for one submission.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "llm_evaluation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub competition_id: i32,
    pub participant_id: String,
    pub challenge_id: i32,
    #[sea_orm(belongs_to, from = "challenge_id", to = "id")]
    pub challenge: HasOne<super::challenge::Entity>,

    /// Evaluating model name, e.g. "gpt-4o".
    pub model: String,
    /// 0 to 100.
    pub score: f64,
    #[sea_orm(column_type = "Text")]
    pub rationale: String,

    pub evaluated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
