use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptState, StepState};

/// Question-type tag carried by slots that expect an uploaded file.
pub(crate) const HYBRID_QTYPE: &str = "hybrid";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) time_limit_seconds: Option<i32>,
    pub(crate) status_refresh_seconds: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) state: AttemptState,
    pub(crate) time_start: Option<PrimitiveDateTime>,
    pub(crate) time_finish: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StepAttachment {
    pub(crate) id: String,
    pub(crate) step_id: String,
    pub(crate) filename: String,
    pub(crate) mime_type: String,
    pub(crate) file_size: i64,
    pub(crate) created_at: PrimitiveDateTime,
}

/// The most recent step recorded for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LastStep {
    pub(crate) id: String,
    pub(crate) state: StepState,
    pub(crate) user_id: String,
}

/// One slot of an attempt with its question data and latest response.
#[derive(Debug, Clone)]
pub(crate) struct SlotSnapshot {
    /// 1-based position within the attempt.
    pub(crate) slot: i32,
    /// 0-based page the slot is shown on.
    pub(crate) page: i32,
    pub(crate) question_id: String,
    pub(crate) question_name: String,
    pub(crate) qtype: String,
    pub(crate) upload_exam_id: Option<String>,
    pub(crate) last_step: Option<LastStep>,
    pub(crate) attachments: Vec<StepAttachment>,
}

impl SlotSnapshot {
    pub(crate) fn is_hybrid(&self) -> bool {
        self.qtype == HYBRID_QTYPE
    }

    /// Companion upload exam, ignoring blank references.
    pub(crate) fn upload_exam(&self) -> Option<&str> {
        self.upload_exam_id.as_deref().map(str::trim).filter(|id| !id.is_empty() && *id != "0")
    }

    pub(crate) fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.last_step.as_ref().is_some_and(|step| step.state.is_gradable())
    }

    pub(crate) fn is_answered(&self) -> bool {
        self.last_step.as_ref().is_some_and(|step| step.state != StepState::Todo)
    }
}

/// An attempt together with its slots ordered by slot number.
#[derive(Debug, Clone)]
pub(crate) struct AttemptSnapshot {
    pub(crate) attempt: Attempt,
    pub(crate) slots: Vec<SlotSnapshot>,
}

impl AttemptSnapshot {
    pub(crate) fn new(attempt: Attempt, mut slots: Vec<SlotSnapshot>) -> Self {
        slots.sort_by_key(|slot| slot.slot);
        Self { attempt, slots }
    }

    /// Number of pages, taken as one past the highest page index.
    pub(crate) fn page_count(&self) -> i32 {
        self.slots.iter().map(|slot| slot.page + 1).max().unwrap_or(0)
    }

    pub(crate) fn slots_on_page(&self, page: i32) -> impl Iterator<Item = &SlotSnapshot> {
        self.slots.iter().filter(move |slot| slot.page == page)
    }

    pub(crate) fn hybrid_slots(&self) -> impl Iterator<Item = &SlotSnapshot> {
        self.slots.iter().filter(|slot| slot.is_hybrid())
    }

    pub(crate) fn slot(&self, number: i32) -> Option<&SlotSnapshot> {
        self.slots.iter().find(|slot| slot.slot == number)
    }
}
