use chrono::{DateTime, Utc};
use common::{Phase, SubmissionStatus};
use serde::{Deserialize, Serialize};

use super::competition::ChallengeResponse;
use crate::error::AppError;

/// Request body for submitting (or resubmitting) a prompt.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitPromptRequest {
    #[schema(example = "You are a careful contract analyst. Summarize...")]
    pub prompt_text: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub competition_id: i32,
    pub participant_id: String,
    pub challenge_id: i32,
    pub prompt_text: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

impl From<crate::entity::submission::Model> for SubmissionResponse {
    fn from(m: crate::entity::submission::Model) -> Self {
        Self {
            competition_id: m.competition_id,
            participant_id: m.participant_id,
            challenge_id: m.challenge_id,
            prompt_text: m.prompt_text,
            status: m.status,
            submitted_at: m.submitted_at,
        }
    }
}

/// A challenge as seen by a participant, with their prior submission.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MySubmissionResponse {
    pub challenge: ChallengeResponse,
    pub submission: Option<SubmissionResponse>,
    /// Phase of the competition window.
    pub phase: Phase,
    pub can_submit: bool,
    /// Why submitting is refused, when `can_submit` is false.
    pub closed_reason: Option<String>,
}

pub fn validate_prompt(prompt: &str, max_chars: usize) -> Result<(), AppError> {
    if prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt must not be empty".into()));
    }
    if prompt.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "Prompt must be at most {max_chars} characters"
        )));
    }
    Ok(())
}
