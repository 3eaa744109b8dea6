//! Participant dashboard state.
//!
//! The state is recomputed from the competition deadlines, the participant's
//! batch window and the current time; nothing is stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::competition::{CompetitionLevel, Phase, TimeWindow};

/// Everything needed to place a participant on their dashboard.
#[derive(Clone, Debug)]
pub struct DashboardInput {
    pub is_participant: bool,
    pub level: CompetitionLevel,
    pub competition: TimeWindow,
    /// Batch window, when the participant has been assigned one.
    pub batch: Option<TimeWindow>,
    pub now: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardState {
    /// Caller is not registered; the client sends them away.
    NotParticipant,
    /// Level 2 participant without a batch assignment.
    NoBatch,
    /// Countdown until the participant's window opens.
    NotStarted {
        starts_at: DateTime<Utc>,
        seconds_until: i64,
    },
    /// Challenges are open.
    Active {
        ends_at: DateTime<Utc>,
        seconds_left: i64,
    },
    Ended { ended_at: DateTime<Utc> },
}

impl DashboardState {
    /// Moment at which this state expires and must be recomputed.
    pub fn refresh_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::NotStarted { starts_at, .. } => Some(*starts_at),
            Self::Active { ends_at, .. } => Some(*ends_at),
            Self::NotParticipant | Self::NoBatch | Self::Ended { .. } => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Compute the dashboard state.
pub fn resolve(input: &DashboardInput) -> DashboardState {
    if !input.is_participant {
        return DashboardState::NotParticipant;
    }

    if input.competition.phase_at(input.now) == Phase::Ended {
        return DashboardState::Ended {
            ended_at: input.competition.end,
        };
    }

    let window = if input.level.uses_batches() {
        let Some(batch) = input.batch else {
            return DashboardState::NoBatch;
        };
        if batch.end <= input.now {
            return DashboardState::Ended {
                ended_at: batch.end,
            };
        }
        let window = input.competition.intersect(&batch);
        // A batch outside the competition window never opens.
        if window.is_empty() {
            return DashboardState::Ended {
                ended_at: input.competition.end.min(batch.end),
            };
        }
        window
    } else {
        input.competition
    };

    match window.phase_at(input.now) {
        Phase::Upcoming => DashboardState::NotStarted {
            starts_at: window.start,
            seconds_until: (window.start - input.now).num_seconds(),
        },
        Phase::Open => DashboardState::Active {
            ends_at: window.end,
            seconds_left: (window.end - input.now).num_seconds(),
        },
        Phase::Ended => DashboardState::Ended {
            ended_at: window.end,
        },
    }
}
