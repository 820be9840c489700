use time::PrimitiveDateTime;

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str =
    "id, title, time_limit_seconds, status_refresh_seconds, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Per-user time limit on an exam. A user holds at most one; a new one replaces
/// the old.
pub(crate) async fn replace_override(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    exam_id: &str,
    user_id: &str,
    time_limit_seconds: i32,
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_overrides (id, exam_id, user_id, time_limit_seconds, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (exam_id, user_id) DO UPDATE \
         SET id = EXCLUDED.id, time_limit_seconds = EXCLUDED.time_limit_seconds, \
             created_at = EXCLUDED.created_at",
    )
    .bind(id)
    .bind(exam_id)
    .bind(user_id)
    .bind(time_limit_seconds)
    .bind(created_at)
    .execute(executor)
    .await?;
    Ok(())
}
