use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

/// Writes the one result row a completed job owns. Reads live on the API
/// side; the worker only ever inserts.
pub(crate) async fn insert(
    pool: &PgPool,
    job_id: Uuid,
    document: serde_json::Value,
    now: PrimitiveDateTime,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO survey_results (id, job_id, document, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(Json(document))
    .bind(now)
    .fetch_one(pool)
    .await
}
