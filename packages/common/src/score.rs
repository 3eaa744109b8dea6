//! Judge scoring and participant locking rules.

/// Lowest score a judge may give.
pub const MIN_SCORE: i32 = 1;
/// Highest score a judge may give.
pub const MAX_SCORE: i32 = 10;
/// Maximum length of a judge comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 2000;
/// The exact phrase a judge must type to lock a participant.
pub const LOCK_CONFIRMATION: &str = "SURE";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("Score must be between 1 and 10")]
    OutOfRange(i32),
    #[error("Comment must be at most 2000 characters")]
    CommentTooLong,
    /// A score already exists and the caller did not confirm replacing it.
    #[error("Submission already has a score of {existing}; confirm to overwrite it")]
    OverwriteUnconfirmed { existing: i32 },
}

/// Validate a judge's score and comment.
pub fn validate_score(score: i32, comment: &str) -> Result<(), ScoreError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(ScoreError::OutOfRange(score));
    }
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(ScoreError::CommentTooLong);
    }
    Ok(())
}

/// Overwriting an existing score needs an explicit second confirmation.
pub fn check_overwrite(existing: Option<i32>, confirmed: bool) -> Result<(), ScoreError> {
    match existing {
        Some(existing) if !confirmed => Err(ScoreError::OverwriteUnconfirmed { existing }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("Type SURE to confirm locking this participant")]
    NotConfirmed,
    #[error("Participant is already locked")]
    AlreadyLocked,
    #[error("{remaining} submission(s) still need a score before locking")]
    Unscored { remaining: u64 },
}

/// Decide whether a participant may be locked.
///
/// `confirmation` is compared verbatim: no trimming, no case folding.
pub fn check_lock(
    confirmation: &str,
    already_locked: bool,
    total_submissions: u64,
    scored_submissions: u64,
) -> Result<(), LockError> {
    if confirmation != LOCK_CONFIRMATION {
        return Err(LockError::NotConfirmed);
    }
    if already_locked {
        return Err(LockError::AlreadyLocked);
    }
    let remaining = total_submissions.saturating_sub(scored_submissions);
    if remaining > 0 {
        return Err(LockError::Unscored { remaining });
    }
    Ok(())
}
