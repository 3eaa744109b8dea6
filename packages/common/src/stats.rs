use serde::{Deserialize, Serialize};

/// Aggregate counters for daily challenges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounters {
    pub total_challenges: i64,
    pub total_submissions: i64,
}

impl DailyCounters {
    pub fn new(total_challenges: i64, total_submissions: i64) -> Self {
        Self {
            total_challenges,
            total_submissions,
        }
    }

    pub fn challenge_created(self) -> Self {
        Self {
            total_challenges: self.total_challenges + 1,
            ..self
        }
    }

    /// Remove one challenge together with its own submissions. Both counters
    /// stop at zero.
    pub fn challenge_deleted(self, challenge_submissions: i64) -> Self {
        Self {
            total_challenges: (self.total_challenges - 1).max(0),
            total_submissions: (self.total_submissions - challenge_submissions.max(0)).max(0),
        }
    }

    pub fn submission_added(self) -> Self {
        Self {
            total_submissions: self.total_submissions + 1,
            ..self
        }
    }
}
