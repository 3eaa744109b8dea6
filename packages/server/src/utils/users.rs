use std::collections::HashMap;

use common::Role;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::entity::user;

/// Display fields of a user, as shown next to submissions and leaderboard rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub institution: Option<String>,
}

/// Make sure a `user` row exists for a token subject.
///
/// New rows get the participant role and the subject as display name. An
/// existing row is left untouched.
pub async fn ensure_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    email: Option<&str>,
) -> Result<(), DbErr> {
    let now = chrono::Utc::now();
    let model = user::ActiveModel {
        id: Set(user_id.to_string()),
        email: Set(email.map(str::to_string)),
        display_name: Set(user_id.to_string()),
        institution: Set(None),
        role: Set(Role::DEFAULT.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let result = user::Entity::insert(model)
        .on_conflict(OnConflict::column(user::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Fetch display fields for a set of users in one query.
///
/// Users without a row fall back to their ID.
pub async fn profiles<C: ConnectionTrait>(
    db: &C,
    user_ids: &[String],
) -> Result<HashMap<String, Profile>, DbErr> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(String, String, Option<String>)> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids.iter().cloned()))
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::DisplayName)
        .column(user::Column::Institution)
        .into_tuple()
        .all(db)
        .await?;

    let mut map: HashMap<String, Profile> = rows
        .into_iter()
        .map(|(id, display_name, institution)| {
            (
                id,
                Profile {
                    display_name,
                    institution,
                },
            )
        })
        .collect();
    for id in user_ids {
        map.entry(id.clone()).or_insert_with(|| Profile {
            display_name: id.clone(),
            institution: None,
        });
    }
    Ok(map)
}

pub async fn profile<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<Profile, DbErr> {
    let mut map = profiles(db, &[user_id.to_string()]).await?;
    Ok(map.remove(user_id).unwrap_or_else(|| Profile {
        display_name: user_id.to_string(),
        institution: None,
    }))
}
