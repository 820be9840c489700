//! Status reported to the exam page while hybrid answers are being uploaded.
//!
//! Two entry points exist. The unproctored one is keyed by the attempt shown on
//! screen. The proctored one is keyed by the upload exam and the caller, since
//! the upload attempt may not exist yet when polling starts.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::db::models::{AttemptSnapshot, Exam};
use crate::db::types::AttemptState;
use crate::services::hybrid_locator::has_hybrid_question;
use crate::services::proctoring::has_uploaded_file;

pub(crate) const NO_ATTEMPT_YET: &str = "no_attempt_yet";
pub(crate) const NOT_STARTED: &str = "not_started";
pub(crate) const EXAM_FINISHED: &str = "exam_finished";

const COMPLETE_MARKER: &str = "Complete";
const INCOMPLETE_MARKER: &str = "Incomplete";
const COMPLETE_CLASS: &str = "qrsub-hybrid-complete";
const INCOMPLETE_CLASS: &str = "qrsub-hybrid-incomplete";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("attempt {0} not found")]
    AttemptNotFound(String),
    #[error("exam {0} not found")]
    ExamNotFound(String),
    #[error("attempt {attempt_id} does not belong to the caller")]
    NotOwner { attempt_id: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Read access to host attempt data.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn load_attempt(&self, attempt_id: &str) -> Result<Option<AttemptSnapshot>, StoreError>;

    /// The user's attempt on `exam_id` with the highest attempt number.
    async fn latest_attempt(
        &self,
        exam_id: &str,
        user_id: &str,
    ) -> Result<Option<AttemptSnapshot>, StoreError>;

    async fn load_exam(&self, exam_id: &str) -> Result<Option<Exam>, StoreError>;
}

/// Loads an attempt and checks that `user_id` owns it.
pub(crate) async fn load_owned_attempt<S>(
    store: &S,
    attempt_id: &str,
    user_id: &str,
) -> Result<AttemptSnapshot, StoreError>
where
    S: AttemptStore + ?Sized,
{
    let snapshot = store
        .load_attempt(attempt_id)
        .await?
        .ok_or_else(|| StoreError::AttemptNotFound(attempt_id.to_string()))?;

    if snapshot.attempt.user_id != user_id {
        return Err(StoreError::NotOwner { attempt_id: attempt_id.to_string() });
    }

    Ok(snapshot)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ProgressEntry {
    pub(crate) slot: i32,
    pub(crate) label: String,
    pub(crate) complete: bool,
}

impl ProgressEntry {
    pub(crate) fn marker(&self) -> &'static str {
        if self.complete {
            COMPLETE_MARKER
        } else {
            INCOMPLETE_MARKER
        }
    }

    pub(crate) fn css_class(&self) -> &'static str {
        if self.complete {
            COMPLETE_CLASS
        } else {
            INCOMPLETE_CLASS
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ProgressSummary {
    pub(crate) entries: Vec<ProgressEntry>,
}

impl ProgressSummary {
    /// One entry per hybrid slot, in slot order.
    pub(crate) fn for_attempt(attempt: &AttemptSnapshot) -> Self {
        let entries = attempt
            .hybrid_slots()
            .map(|slot| {
                let name = slot.question_name.trim();
                let label = match name {
                    "" => format!("Question {}", slot.slot),
                    name => name.to_string(),
                };
                ProgressEntry { slot: slot.slot, label, complete: slot.is_complete() }
            })
            .collect();
        Self { entries }
    }

    /// Markup blob shown verbatim by the polling page.
    pub(crate) fn to_markup(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "<div class=\"{}\">{} {}</div>",
                    entry.css_class(),
                    escape_html(&entry.label),
                    entry.marker()
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptStatus {
    NoAttemptYet,
    NotStarted,
    ExamFinished,
    /// The attempt has no hybrid question, so there is nothing to upload.
    NoHybridContent,
    InProgress(ProgressSummary),
}

impl AttemptStatus {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::NoAttemptYet => NO_ATTEMPT_YET,
            Self::NotStarted => NOT_STARTED,
            Self::ExamFinished => EXAM_FINISHED,
            Self::NoHybridContent => "no_hybrid_content",
            Self::InProgress(_) => "in_progress",
        }
    }

    /// Pollers stop once this is true.
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, Self::ExamFinished)
    }

    /// The `status` string of the wire contract.
    pub(crate) fn wire_value(&self) -> String {
        match self {
            Self::NoHybridContent => String::new(),
            Self::InProgress(summary) => summary.to_markup(),
            other => other.kind().to_string(),
        }
    }
}

/// Status of an attempt whose files are uploaded on the same exam.
pub(crate) fn unproctored_status(attempt: &AttemptSnapshot) -> AttemptStatus {
    if !has_hybrid_question(attempt) {
        return AttemptStatus::NoHybridContent;
    }

    match attempt.attempt.state {
        // Finished covers both "first pass done, upload not begun" and "upload
        // done"; only an uploaded file tells them apart.
        AttemptState::Finished if has_uploaded_file(attempt) => AttemptStatus::ExamFinished,
        AttemptState::Finished => AttemptStatus::NoAttemptYet,
        AttemptState::InProgress => {
            AttemptStatus::InProgress(ProgressSummary::for_attempt(attempt))
        }
        AttemptState::NotStarted | AttemptState::Overdue => AttemptStatus::NoAttemptYet,
    }
}

/// Status of the user's latest attempt on an upload exam.
pub(crate) fn proctored_status(latest: Option<&AttemptSnapshot>) -> AttemptStatus {
    match latest {
        None => AttemptStatus::NotStarted,
        Some(attempt) if attempt.attempt.state == AttemptState::Finished => {
            AttemptStatus::ExamFinished
        }
        Some(attempt) => AttemptStatus::InProgress(ProgressSummary::for_attempt(attempt)),
    }
}

pub(crate) async fn resolve_unproctored<S>(
    store: &S,
    user_id: &str,
    attempt_id: &str,
) -> Result<AttemptStatus, StoreError>
where
    S: AttemptStore + ?Sized,
{
    let attempt = load_owned_attempt(store, attempt_id, user_id).await?;
    Ok(unproctored_status(&attempt))
}

pub(crate) async fn resolve_proctored<S>(
    store: &S,
    exam_id: &str,
    user_id: &str,
) -> Result<AttemptStatus, StoreError>
where
    S: AttemptStore + ?Sized,
{
    let latest = store.latest_attempt(exam_id, user_id).await?;
    Ok(proctored_status(latest.as_ref()))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
