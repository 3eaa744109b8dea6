use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One voter's upvote on another user's daily submission.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub daily_challenge_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub author_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub voter_id: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
