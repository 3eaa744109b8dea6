#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a competition takes place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionMode {
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "online"))]
    Online,
    /// Held at a venue; competitions in this mode must name one.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "offline"))]
    Offline,
}

/// Competition format. Level 2 competitions schedule participants in batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionLevel {
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "level1"))]
    Level1,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "level2"))]
    Level2,
}

impl CompetitionLevel {
    pub fn uses_batches(&self) -> bool {
        matches!(self, Self::Level2)
    }
}

/// A half-open `[start, end)` time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        if now < self.start {
            Phase::Upcoming
        } else if now < self.end {
            Phase::Open
        } else {
            Phase::Ended
        }
    }

    /// True when no instant falls inside the window.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when `other` lies entirely inside this window.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Overlap of two windows. An empty overlap yields a window whose end
    /// equals its start, which is never open.
    pub fn intersect(&self, other: &TimeWindow) -> TimeWindow {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end).max(start);
        TimeWindow { start, end }
    }
}

/// Where `now` falls relative to a time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Upcoming,
    Open,
    Ended,
}

/// Why a competition is not accepting submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClosedReason {
    #[error("Competition has ended")]
    Ended,
    #[error("Competition has not started yet")]
    NotStarted,
    #[error("Competition is not active")]
    Inactive,
    #[error("Competition is locked")]
    Locked,
}

/// Decide whether a competition accepts submissions at `now`.
///
/// A past end deadline wins over every flag, so an ended competition is
/// reported as ended even while it is still marked active.
pub fn check_accepting(
    window: &TimeWindow,
    is_active: bool,
    is_locked: bool,
    now: DateTime<Utc>,
) -> Result<(), ClosedReason> {
    match window.phase_at(now) {
        Phase::Ended => Err(ClosedReason::Ended),
        Phase::Upcoming => Err(ClosedReason::NotStarted),
        Phase::Open if is_locked => Err(ClosedReason::Locked),
        Phase::Open if !is_active => Err(ClosedReason::Inactive),
        Phase::Open => Ok(()),
    }
}
