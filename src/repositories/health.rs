/// Whether the database answers and the attempt tables have been migrated.
pub(crate) async fn schema_ready(executor: impl sqlx::PgExecutor<'_>) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT to_regclass('attempt_steps') IS NOT NULL \
         AND to_regclass('exam_overrides') IS NOT NULL",
    )
    .fetch_one(executor)
    .await
}
