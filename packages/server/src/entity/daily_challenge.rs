use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_challenge")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub problem_statement: String,
    #[sea_orm(column_type = "Text")]
    pub guidelines: String,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub is_active: bool,

    /// Distinct submitters, maintained in the same transaction as each submission.
    pub total_submissions: i32,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::daily_submission::Entity>,

    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
