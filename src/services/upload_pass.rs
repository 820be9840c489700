//! Preparing an attempt for its file-upload pass.
//!
//! Unproctored exams reuse the student's own attempt for the upload pass: the
//! finished attempt is reopened and hybrid responses waiting for grading are
//! dropped so the student can attach files again. Proctored exams upload on a
//! separate exam and are left untouched.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::AttemptSnapshot;
use crate::db::types::{AttemptState, StepState};
use crate::repositories;
use crate::services::attempt_status::StoreError;
use crate::services::hybrid_locator::{self, LocateError, Located};
use crate::services::proctoring::Proctoring;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadPassPlan {
    pub(crate) reopen: bool,
    pub(crate) reset_step_ids: Vec<String>,
    pub(crate) time_limit_seconds: Option<i32>,
}

impl UploadPassPlan {
    pub(crate) fn is_noop(&self) -> bool {
        !self.reopen && self.reset_step_ids.is_empty() && self.time_limit_seconds.is_none()
    }
}

/// Decides what has to change before `user_id` can upload files on `attempt`.
/// Proctored and overdue attempts are never touched.
///
/// `time_limit_seconds` is the extension to grant when the exam is timed; zero
/// disables it.
pub(crate) fn plan(
    attempt: &AttemptSnapshot,
    proctoring: &Proctoring,
    user_id: &str,
    exam_is_timed: bool,
    time_limit_seconds: u64,
) -> UploadPassPlan {
    let overdue = attempt.attempt.state == AttemptState::Overdue;
    if proctoring.is_proctored || overdue {
        return UploadPassPlan {
            reopen: false,
            reset_step_ids: Vec::new(),
            time_limit_seconds: None,
        };
    }

    let reopen = attempt.attempt.state == AttemptState::Finished
        && attempt.attempt.time_finish.is_some();

    let reset_step_ids = attempt
        .hybrid_slots()
        .filter_map(|slot| slot.last_step.as_ref())
        .filter(|step| step.state == StepState::NeedsGrading && step.user_id == user_id)
        .map(|step| step.id.clone())
        .collect();

    let time_limit_seconds = (exam_is_timed && time_limit_seconds > 0)
        .then(|| i32::try_from(time_limit_seconds).unwrap_or(i32::MAX));

    UploadPassPlan { reopen, reset_step_ids, time_limit_seconds }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UploadPassOutcome {
    pub(crate) attempt_id: String,
    pub(crate) state: AttemptState,
    pub(crate) overdue: bool,
    pub(crate) reopened: bool,
    pub(crate) reset_steps: usize,
    pub(crate) time_limit_seconds: Option<i32>,
    pub(crate) landing: Located,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum UploadPassError {
    #[error("no attempt on exam {0} to upload files for")]
    NoAttempt(String),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for UploadPassError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

/// Applies the plan for the user's latest attempt on `exam_id` in one
/// transaction and returns where the upload pass should land.
pub(crate) async fn prepare(
    pool: &PgPool,
    exam_id: &str,
    user_id: &str,
    time_limit_seconds: u64,
) -> Result<UploadPassOutcome, UploadPassError> {
    let exam = repositories::exams::find_by_id(pool, exam_id)
        .await?
        .ok_or_else(|| StoreError::ExamNotFound(exam_id.to_string()))?;

    let mut tx = pool.begin().await?;

    let Some(attempt) = repositories::attempts::lock_latest(&mut *tx, exam_id, user_id).await?
    else {
        return Err(UploadPassError::NoAttempt(exam_id.to_string()));
    };
    let snapshot = repositories::attempts::load_snapshot(&mut *tx, attempt).await?;
    let proctoring = crate::services::proctoring::classify(&snapshot);
    let plan = plan(
        &snapshot,
        &proctoring,
        user_id,
        exam.time_limit_seconds.is_some_and(|limit| limit > 0),
        time_limit_seconds,
    );
    let landing = hybrid_locator::first(&snapshot, 0)?;

    if !plan.is_noop() {
        let now = primitive_now_utc();

        if plan.reopen {
            repositories::attempts::reopen(&mut *tx, &snapshot.attempt.id, now).await?;
        }
        repositories::attempts::delete_steps(&mut *tx, &plan.reset_step_ids).await?;
        if let Some(limit) = plan.time_limit_seconds {
            repositories::exams::replace_override(
                &mut *tx,
                &Uuid::new_v4().to_string(),
                exam_id,
                user_id,
                limit,
                now,
            )
            .await?;
        }
    }

    tx.commit().await?;

    let overdue = snapshot.attempt.state == AttemptState::Overdue;
    let state = if plan.reopen { AttemptState::InProgress } else { snapshot.attempt.state };

    if overdue {
        tracing::info!(attempt_id = %snapshot.attempt.id, "Overdue attempt left closed");
    }
    if landing.is_fallback() {
        tracing::warn!(
            attempt_id = %snapshot.attempt.id,
            exam_id = %exam_id,
            "Upload pass landed on the last page; attempt has no hybrid question"
        );
    }
    tracing::info!(
        attempt_id = %snapshot.attempt.id,
        state = state.as_str(),
        reopened = plan.reopen,
        reset_steps = plan.reset_step_ids.len(),
        proctored = proctoring.is_proctored,
        "Upload pass prepared"
    );

    Ok(UploadPassOutcome {
        attempt_id: snapshot.attempt.id,
        state,
        overdue,
        reopened: plan.reopen,
        reset_steps: plan.reset_step_ids.len(),
        time_limit_seconds: plan.time_limit_seconds,
        landing,
    })
}
