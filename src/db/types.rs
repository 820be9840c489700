use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstate", rename_all = "snake_case")]
pub(crate) enum AttemptState {
    NotStarted,
    InProgress,
    Overdue,
    Finished,
}

impl AttemptState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Overdue => "overdue",
            Self::Finished => "finished",
        }
    }
}

/// Summary state of the last recorded step of a question attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "stepstate", rename_all = "snake_case")]
pub(crate) enum StepState {
    Todo,
    Invalid,
    Complete,
    NeedsGrading,
    GradedRight,
    GradedPartial,
    GradedWrong,
    GaveUp,
}

impl StepState {
    /// Whether the step holds a response that can be graded.
    pub(crate) fn is_gradable(self) -> bool {
        matches!(
            self,
            Self::Complete
                | Self::NeedsGrading
                | Self::GradedRight
                | Self::GradedPartial
                | Self::GradedWrong
        )
    }
}
