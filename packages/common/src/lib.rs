pub mod competition;
pub mod config;
pub mod dashboard;
pub mod evaluator;
pub mod role;
pub mod score;
pub mod stats;
pub mod submission_status;

pub use competition::{CompetitionLevel, CompetitionMode, Phase, TimeWindow};
pub use role::Role;
pub use submission_status::SubmissionStatus;
