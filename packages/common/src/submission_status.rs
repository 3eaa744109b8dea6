#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a competition submission as it moves through evaluation and judging.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Prompt received, not yet evaluated or scored.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Submitted"))]
    Submitted,
    /// At least one LLM score card has been ingested.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Evaluated"))]
    Evaluated,
    /// A judge has scored the submission.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Judged"))]
    Judged,
    /// The participant was locked; the score is final.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Finalized"))]
    Finalized,
}

impl SubmissionStatus {
    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Submitted,
        Self::Evaluated,
        Self::Judged,
        Self::Finalized,
    ];

    /// Returns true once a judge has scored the submission.
    pub fn is_judged(&self) -> bool {
        matches!(self, Self::Judged | Self::Finalized)
    }

    /// Status after an LLM score card arrives. Judge-owned statuses are kept.
    pub fn after_evaluation(self) -> Self {
        if self.is_judged() { self } else { Self::Evaluated }
    }

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Evaluated => "Evaluated",
            Self::Judged => "Judged",
            Self::Finalized => "Finalized",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Submitted" => Ok(Self::Submitted),
            "Evaluated" => Ok(Self::Evaluated),
            "Judged" => Ok(Self::Judged),
            "Finalized" => Ok(Self::Finalized),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
