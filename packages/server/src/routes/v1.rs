use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{
    auth, competition, daily, evaluation, judge, leaderboard, participant, submission, users,
};
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(competition_routes())
        .merge(participant_routes())
        .merge(submission_routes())
        .merge(judge_routes())
        .merge(result_routes())
        .merge(daily_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::whoami))
        .routes(routes!(users::update_my_profile))
        .routes(routes!(users::list_users))
        .routes(routes!(users::update_user_role))
}

fn competition_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            competition::create_competition,
            competition::list_competitions
        ))
        .routes(routes!(
            competition::get_competition,
            competition::update_competition,
            competition::delete_competition
        ))
        .routes(routes!(
            competition::create_challenge,
            competition::list_challenges
        ))
        .routes(routes!(
            competition::get_challenge,
            competition::update_challenge,
            competition::delete_challenge
        ))
}

fn participant_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(participant::register))
        .routes(routes!(
            participant::list_participants,
            participant::add_participant
        ))
        .routes(routes!(participant::remove_participant))
        .routes(routes!(participant::create_batch, participant::list_batches))
        .routes(routes!(participant::get_batch))
        .routes(routes!(participant::assign_batch_participants))
        .routes(routes!(participant::get_dashboard))
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(submission::get_my_submission))
        .routes(routes!(submission::submit_prompt))
        .routes(routes!(submission::stream_submissions))
}

fn judge_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(judge::save_score))
        .routes(routes!(judge::lock_participant))
        .routes(routes!(judge::list_judge_participants))
        .routes(routes!(judge::get_judge_sheet))
}

fn result_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(evaluation::start_evaluation))
        .routes(routes!(evaluation::ingest_evaluations))
        .routes(routes!(evaluation::list_evaluations))
        .routes(routes!(
            leaderboard::get_leaderboard,
            leaderboard::publish_leaderboard
        ))
        .routes(routes!(leaderboard::get_participant_results))
        .routes(routes!(leaderboard::generate_leaderboard))
}

fn daily_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(daily::create_daily, daily::list_daily))
        .routes(routes!(
            daily::get_daily,
            daily::update_daily,
            daily::delete_daily
        ))
        .routes(routes!(daily::submit_daily))
        .routes(routes!(daily::list_daily_submissions))
        .routes(routes!(daily::vote, daily::unvote))
        .routes(routes!(daily::get_daily_stats))
        .routes(routes!(daily::reconcile_daily_stats))
}
