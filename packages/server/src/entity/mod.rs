pub mod batch;
pub mod challenge;
pub mod competition;
pub mod daily_challenge;
pub mod daily_stats;
pub mod daily_submission;
pub mod daily_vote;
pub mod judge_score;
pub mod leaderboard_entry;
pub mod llm_evaluation;
pub mod participant;
pub mod role;
pub mod role_permission;
pub mod submission;
pub mod user;
