use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AttemptSnapshot, StepAttachment};
use crate::db::types::AttemptState;
use crate::services::attempt_status::AttemptStatus;
use crate::services::hybrid_locator::{Located, Navigation, SlotPosition};
use crate::services::monitor::{MonitorDescriptor, MonitorMode, SlotFiles};
use crate::services::proctoring::{self, Proctoring};
use crate::services::upload_pass::UploadPassOutcome;

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: String,
    pub(crate) kind: &'static str,
    pub(crate) terminal: bool,
}

impl StatusResponse {
    pub(crate) fn from_status(status: &AttemptStatus) -> Self {
        Self { status: status.wire_value(), kind: status.kind(), terminal: status.is_terminal() }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct NavigationQuery {
    #[serde(default)]
    #[validate(range(min = 0, message = "page must be non-negative"))]
    pub(crate) page: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct NavigationResponse {
    pub(crate) attempt_id: String,
    pub(crate) page: i32,
    pub(crate) first: Located,
    pub(crate) next: Option<SlotPosition>,
    pub(crate) previous: Option<SlotPosition>,
    pub(crate) is_last: bool,
    pub(crate) proctoring: Proctoring,
    pub(crate) has_uploaded_file: bool,
    pub(crate) has_answers: bool,
}

impl NavigationResponse {
    pub(crate) fn new(attempt: &AttemptSnapshot, navigation: Navigation) -> Self {
        Self {
            attempt_id: attempt.attempt.id.clone(),
            page: navigation.page,
            first: navigation.first,
            next: navigation.next,
            previous: navigation.previous,
            is_last: navigation.is_last,
            proctoring: proctoring::classify(attempt),
            has_uploaded_file: proctoring::has_uploaded_file(attempt),
            has_answers: proctoring::has_answers(attempt),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MonitorResponse {
    pub(crate) attempt_id: String,
    pub(crate) mode: MonitorMode,
    pub(crate) refresh_interval_ms: u64,
    pub(crate) status_url: String,
    pub(crate) upload_exam_id: Option<String>,
    pub(crate) upload_url: Option<String>,
}

impl MonitorResponse {
    pub(crate) fn new(descriptor: MonitorDescriptor, api_prefix: &str) -> Self {
        Self {
            attempt_id: descriptor.attempt_id,
            mode: descriptor.mode,
            refresh_interval_ms: descriptor.refresh_interval_ms,
            status_url: format!("{}{}", api_prefix.trim_end_matches('/'), descriptor.status_path),
            upload_exam_id: descriptor.upload_exam_id,
            upload_url: descriptor.upload_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FileResponse {
    pub(crate) id: String,
    pub(crate) filename: String,
    pub(crate) mime_type: String,
    pub(crate) file_size: i64,
    pub(crate) created_at: String,
}

impl FileResponse {
    fn from_db(attachment: StepAttachment) -> Self {
        Self {
            id: attachment.id,
            filename: attachment.filename,
            mime_type: attachment.mime_type,
            file_size: attachment.file_size,
            created_at: format_primitive(attachment.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SlotFilesResponse {
    pub(crate) slot: i32,
    pub(crate) question_id: String,
    pub(crate) source_attempt_id: Option<String>,
    pub(crate) files: Vec<FileResponse>,
}

impl From<SlotFiles> for SlotFilesResponse {
    fn from(files: SlotFiles) -> Self {
        Self {
            slot: files.slot,
            question_id: files.question_id,
            source_attempt_id: files.source_attempt_id,
            files: files.files.into_iter().map(FileResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) state: AttemptState,
    pub(crate) overdue: bool,
    pub(crate) reopened: bool,
    pub(crate) reset_steps: usize,
    pub(crate) time_limit_seconds: Option<i32>,
    pub(crate) page: i32,
    pub(crate) slot: i32,
    pub(crate) fallback: bool,
}

impl From<UploadPassOutcome> for UploadAttemptResponse {
    fn from(outcome: UploadPassOutcome) -> Self {
        let position = outcome.landing.position();
        Self {
            attempt_id: outcome.attempt_id,
            state: outcome.state,
            overdue: outcome.overdue,
            reopened: outcome.reopened,
            reset_steps: outcome.reset_steps,
            time_limit_seconds: outcome.time_limit_seconds,
            page: position.page,
            slot: position.slot,
            fallback: outcome.landing.is_fallback(),
        }
    }
}
