use serde::{Deserialize, Serialize};

/// Evaluator endpoint that starts bulk LLM evaluation of a competition.
pub const START_EVALUATION_PATH: &str = "/bulk-evaluate/start-evaluation";
/// Evaluator endpoint that recomputes a competition leaderboard.
pub const GENERATE_LEADERBOARD_PATH: &str = "/leaderboard/generate";

/// Body sent to both evaluator endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionJob {
    pub competition_id: i32,
    /// User who triggered the job.
    pub requested_by: String,
}

/// Lowest LLM score accepted on ingestion.
pub const MIN_LLM_SCORE: f64 = 0.0;
/// Highest LLM score accepted on ingestion.
pub const MAX_LLM_SCORE: f64 = 100.0;

pub fn is_valid_llm_score(score: f64) -> bool {
    score.is_finite() && (MIN_LLM_SCORE..=MAX_LLM_SCORE).contains(&score)
}

/// Mean of a set of LLM scores, or `None` when there are none.
pub fn average_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
