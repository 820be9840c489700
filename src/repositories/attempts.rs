use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::{Attempt, AttemptSnapshot, Exam, LastStep, SlotSnapshot, StepAttachment};
use crate::db::types::{AttemptState, StepState};
use crate::services::attempt_status::{AttemptStore, StoreError};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, user_id, attempt_number, state, time_start, time_finish, \
    created_at, updated_at";

const ATTACHMENT_COLUMNS: &str = "id, step_id, filename, mime_type, file_size, created_at";

#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    slot: i32,
    page: i32,
    question_id: String,
    question_name: String,
    qtype: String,
    upload_exam_id: Option<String>,
    step_id: Option<String>,
    step_state: Option<StepState>,
    step_user_id: Option<String>,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_latest(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE exam_id = $1 AND user_id = $2 \
         ORDER BY attempt_number DESC LIMIT 1"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Same as [`find_latest`] but holds a row lock until the transaction ends.
pub(crate) async fn lock_latest(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE exam_id = $1 AND user_id = $2 \
         ORDER BY attempt_number DESC LIMIT 1 \
         FOR UPDATE"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Slots with their question data, the latest step of each slot and the
/// files attached to that step.
pub(crate) async fn load_snapshot(
    conn: &mut PgConnection,
    attempt: Attempt,
) -> Result<AttemptSnapshot, sqlx::Error> {
    let rows = sqlx::query_as::<_, SlotRow>(
        "SELECT s.slot, s.page, q.id AS question_id, q.name AS question_name, q.qtype, \
                q.upload_exam_id, st.id AS step_id, st.state AS step_state, \
                st.user_id AS step_user_id \
         FROM attempt_slots s \
         JOIN questions q ON q.id = s.question_id \
         LEFT JOIN LATERAL ( \
             SELECT id, state, user_id FROM attempt_steps \
             WHERE attempt_id = s.attempt_id AND slot = s.slot \
             ORDER BY sequence_number DESC LIMIT 1 \
         ) st ON TRUE \
         WHERE s.attempt_id = $1 \
         ORDER BY s.slot",
    )
    .bind(&attempt.id)
    .fetch_all(&mut *conn)
    .await?;

    let step_ids: Vec<String> = rows.iter().filter_map(|row| row.step_id.clone()).collect();
    let mut attachments = list_attachments(&mut *conn, &step_ids).await?;

    let slots = rows
        .into_iter()
        .map(|row| {
            let last_step = match (row.step_id, row.step_state, row.step_user_id) {
                (Some(id), Some(state), Some(user_id)) => Some(LastStep { id, state, user_id }),
                _ => None,
            };
            let files = last_step
                .as_ref()
                .and_then(|step| attachments.remove(&step.id))
                .unwrap_or_default();

            SlotSnapshot {
                slot: row.slot,
                page: row.page,
                question_id: row.question_id,
                question_name: row.question_name,
                qtype: row.qtype,
                upload_exam_id: row.upload_exam_id,
                last_step,
                attachments: files,
            }
        })
        .collect();

    Ok(AttemptSnapshot::new(attempt, slots))
}

async fn list_attachments(
    executor: impl sqlx::PgExecutor<'_>,
    step_ids: &[String],
) -> Result<HashMap<String, Vec<StepAttachment>>, sqlx::Error> {
    if step_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let attachments = sqlx::query_as::<_, StepAttachment>(&format!(
        "SELECT {ATTACHMENT_COLUMNS} FROM step_attachments \
         WHERE step_id = ANY($1) ORDER BY created_at, id"
    ))
    .bind(step_ids)
    .fetch_all(executor)
    .await?;

    let mut by_step: HashMap<String, Vec<StepAttachment>> = HashMap::new();
    for attachment in attachments {
        by_step.entry(attachment.step_id.clone()).or_default().push(attachment);
    }
    Ok(by_step)
}

/// Puts a finished attempt back in progress and clears its finish time.
pub(crate) async fn reopen(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    updated_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE attempts SET state = $2, time_finish = NULL, updated_at = $3 WHERE id = $1",
    )
    .bind(id)
    .bind(AttemptState::InProgress)
    .bind(updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Deletes steps by id; their attachments go with them.
pub(crate) async fn delete_steps(
    executor: impl sqlx::PgExecutor<'_>,
    step_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if step_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM attempt_steps WHERE id = ANY($1)")
        .bind(step_ids)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// [`AttemptStore`] over the shared Postgres pool.
pub(crate) struct PgAttemptStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgAttemptStore<'a> {
    pub(crate) fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn snapshot(
        &self,
        attempt: Option<Attempt>,
    ) -> Result<Option<AttemptSnapshot>, StoreError> {
        let Some(attempt) = attempt else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        Ok(Some(load_snapshot(&mut *conn, attempt).await?))
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore<'_> {
    async fn load_attempt(&self, attempt_id: &str) -> Result<Option<AttemptSnapshot>, StoreError> {
        let attempt = find_by_id(self.pool, attempt_id).await?;
        self.snapshot(attempt).await
    }

    async fn latest_attempt(
        &self,
        exam_id: &str,
        user_id: &str,
    ) -> Result<Option<AttemptSnapshot>, StoreError> {
        let attempt = find_latest(self.pool, exam_id, user_id).await?;
        self.snapshot(attempt).await
    }

    async fn load_exam(&self, exam_id: &str) -> Result<Option<Exam>, StoreError> {
        Ok(crate::repositories::exams::find_by_id(self.pool, exam_id).await?)
    }
}
