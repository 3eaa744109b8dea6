use common::{CompetitionLevel, CompetitionMode};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown
    pub start_deadline: DateTimeUtc,
    pub end_deadline: DateTimeUtc,

    pub is_active: bool,
    pub is_locked: bool,
    pub is_featured: bool,

    pub mode: CompetitionMode,
    /// Required when `mode` is offline.
    pub venue: Option<String>,
    pub level: CompetitionLevel,
    pub prize_money: i64,
    /// Instructions given to the LLM evaluators.
    #[sea_orm(column_type = "Text")]
    pub system_prompt: String,

    #[sea_orm(has_many)]
    pub challenges: HasMany<super::challenge::Entity>,

    #[sea_orm(has_many)]
    pub batches: HasMany<super::batch::Entity>,

    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
