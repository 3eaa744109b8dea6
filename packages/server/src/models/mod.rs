pub mod auth;
pub mod competition;
pub mod daily;
pub mod evaluation;
pub mod judge;
pub mod leaderboard;
pub mod shared;
pub mod submission;
