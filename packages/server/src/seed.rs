use common::Role;
use sea_orm::sea_query::{Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::daily_stats::STATS_ROW_ID;
use crate::entity::{
    daily_stats, daily_submission, leaderboard_entry, llm_evaluation, role, role_permission,
    submission, user,
};

/// Permissions held by admins. Superadmins hold these plus `user:manage`.
const ADMIN_PERMISSIONS: &[&str] = &[
    "competition:create",
    "competition:manage",
    "competition:delete",
    "challenge:manage",
    "batch:manage",
    "submission:submit",
    "submission:view_all",
    "judge:score",
    "judge:lock",
    "evaluation:run",
    "leaderboard:generate",
    "daily:manage",
];

const JUDGE_PERMISSIONS: &[&str] = &["judge:score", "judge:lock", "submission:view_all"];

const PARTICIPANT_PERMISSIONS: &[&str] = &["submission:submit"];

fn default_mappings() -> Vec<(Role, &'static str)> {
    let mut mappings = Vec::new();
    for &permission in ADMIN_PERMISSIONS {
        mappings.push((Role::Superadmin, permission));
        mappings.push((Role::Admin, permission));
    }
    mappings.push((Role::Superadmin, "user:manage"));
    mappings.extend(JUDGE_PERMISSIONS.iter().map(|&p| (Role::Judge, p)));
    mappings.extend(PARTICIPANT_PERMISSIONS.iter().map(|&p| (Role::Participant, p)));
    mappings
}

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for role in Role::ALL {
        let model = role::ActiveModel {
            name: Set(role.as_str().to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for (role, permission) in default_mappings() {
        let model = role_permission::ActiveModel {
            role: Set(role.as_str().to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Insert the single `daily_stats` row with zero counters if it is missing.
pub async fn ensure_stats_row<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let model = daily_stats::ActiveModel {
        id: Set(STATS_ROW_ID),
        total_challenges: Set(0),
        total_submissions: Set(0),
        updated_at: Set(chrono::Utc::now()),
    };

    let result = daily_stats::Entity::insert(model)
        .on_conflict(
            OnConflict::column(daily_stats::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Give the configured user the `superadmin` role, creating the row if needed.
pub async fn bootstrap_superadmin(db: &DatabaseConnection, user_id: &str) -> Result<(), DbErr> {
    let now = chrono::Utc::now();
    let model = user::ActiveModel {
        id: Set(user_id.to_string()),
        email: Set(None),
        display_name: Set(user_id.to_string()),
        institution: Set(None),
        role: Set(Role::Superadmin.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_columns([user::Column::Role, user::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!(user_id, "Bootstrap superadmin ensured");
    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &mut IndexCreateStatement) {
    let sql = stmt
        .if_not_exists()
        .name(name)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Evaluation browser and per-challenge counts:
    // WHERE competition_id = ? AND challenge_id = ?
    create_index(
        db,
        "idx_submission_competition_challenge",
        Index::create()
            .table(submission::Entity)
            .col(submission::Column::CompetitionId)
            .col(submission::Column::ChallengeId),
    )
    .await;

    // Score cards of one submission
    create_index(
        db,
        "idx_llm_evaluation_submission",
        Index::create()
            .table(llm_evaluation::Entity)
            .col(llm_evaluation::Column::CompetitionId)
            .col(llm_evaluation::Column::ParticipantId)
            .col(llm_evaluation::Column::ChallengeId),
    )
    .await;

    create_index(
        db,
        "idx_leaderboard_competition_rank",
        Index::create()
            .table(leaderboard_entry::Entity)
            .col(leaderboard_entry::Column::CompetitionId)
            .col(leaderboard_entry::Column::Rank),
    )
    .await;

    // Daily submissions ordered by votes
    create_index(
        db,
        "idx_daily_submission_votes",
        Index::create()
            .table(daily_submission::Entity)
            .col(daily_submission::Column::DailyChallengeId)
            .col(daily_submission::Column::VoteCount),
    )
    .await;

    Ok(())
}
