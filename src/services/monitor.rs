//! What the exam page needs in order to poll for upload progress and show the
//! QR code for the second device.

use serde::Serialize;
use thiserror::Error;

use crate::core::config::HybridSettings;
use crate::db::models::StepAttachment;
use crate::services::attempt_status::{load_owned_attempt, AttemptStore, StoreError};
use crate::services::proctoring::{classify, upload_files_for_question, upload_target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MonitorMode {
    Proctored,
    Unproctored,
}

impl MonitorMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Proctored => "proctored",
            Self::Unproctored => "unproctored",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct MonitorDescriptor {
    pub(crate) attempt_id: String,
    pub(crate) mode: MonitorMode,
    pub(crate) refresh_interval_ms: u64,
    /// Path of the status endpoint, below the API prefix.
    pub(crate) status_path: String,
    pub(crate) upload_exam_id: Option<String>,
    pub(crate) upload_url: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum MonitorError {
    #[error("attempt has no slot {0}")]
    SlotNotFound(i32),
    #[error("slot {0} is not a hybrid question")]
    NotHybrid(i32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) async fn describe<S>(
    store: &S,
    settings: &HybridSettings,
    attempt_id: &str,
    user_id: &str,
) -> Result<MonitorDescriptor, StoreError>
where
    S: AttemptStore + ?Sized,
{
    let attempt = load_owned_attempt(store, attempt_id, user_id).await?;
    let proctoring = classify(&attempt);

    let (mode, refresh_interval_ms, status_path, upload_state) = match &proctoring.upload_exam {
        Some(upload_exam) => {
            let refresh_seconds = store
                .load_exam(upload_exam)
                .await?
                .and_then(|exam| exam.status_refresh_seconds)
                .and_then(|seconds| u64::try_from(seconds).ok())
                .filter(|seconds| *seconds > 0)
                .unwrap_or(settings.default_exam_refresh_seconds);
            let upload_attempt = store.latest_attempt(upload_exam, user_id).await?;

            (
                MonitorMode::Proctored,
                refresh_seconds.saturating_mul(1000),
                format!("/exams/{upload_exam}/proctored-status"),
                upload_attempt.map(|snapshot| snapshot.attempt.state),
            )
        }
        None => (
            MonitorMode::Unproctored,
            settings.unproctored_refresh_ms,
            format!("/attempts/{attempt_id}/status"),
            None,
        ),
    };

    let target = upload_target(&attempt, &proctoring, upload_state);
    let upload_url = target.as_deref().map(|exam_id| settings.upload_link(exam_id));

    Ok(MonitorDescriptor {
        attempt_id: attempt.attempt.id,
        mode,
        refresh_interval_ms,
        status_path,
        upload_exam_id: proctoring.upload_exam,
        upload_url,
    })
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SlotFiles {
    pub(crate) slot: i32,
    pub(crate) question_id: String,
    /// Attempt the files were uploaded on.
    pub(crate) source_attempt_id: Option<String>,
    pub(crate) files: Vec<StepAttachment>,
}

/// Files uploaded for a hybrid slot. Proctored attempts read them from the
/// user's latest attempt on the upload exam.
pub(crate) async fn slot_files<S>(
    store: &S,
    attempt_id: &str,
    user_id: &str,
    slot_number: i32,
) -> Result<SlotFiles, MonitorError>
where
    S: AttemptStore + ?Sized,
{
    let attempt = load_owned_attempt(store, attempt_id, user_id).await?;
    let slot = attempt.slot(slot_number).ok_or(MonitorError::SlotNotFound(slot_number))?;
    if !slot.is_hybrid() {
        return Err(MonitorError::NotHybrid(slot_number));
    }

    let Some(upload_exam) = classify(&attempt).upload_exam else {
        return Ok(SlotFiles {
            slot: slot.slot,
            question_id: slot.question_id.clone(),
            source_attempt_id: Some(attempt.attempt.id.clone()),
            files: slot.attachments.clone(),
        });
    };

    let upload_attempt = store.latest_attempt(&upload_exam, user_id).await?;
    let files = upload_attempt
        .as_ref()
        .and_then(|upload| upload_files_for_question(upload, &slot.question_id))
        .map(<[StepAttachment]>::to_vec)
        .unwrap_or_default();

    Ok(SlotFiles {
        slot: slot.slot,
        question_id: slot.question_id.clone(),
        source_attempt_id: upload_attempt.map(|upload| upload.attempt.id),
        files,
    })
}
