use futures::stream::BoxStream;
use sqlx::PgPool;

use crate::domain::search_record::{PendingExtraction, SearchRecord};

pub async fn upsert_raw_result(
    pool: &PgPool,
    entity_key: &str,
    raw_result: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        insert into search_record
            (entity_key, raw_result, fetched_at)
        values
            ($1, $2, now())
        on conflict (entity_key) do update set
            raw_result = excluded.raw_result,
            fetched_at = excluded.fetched_at
        ",
    )
    .bind(entity_key)
    .bind(raw_result)
    .execute(pool)
    .await?;

    Ok(())
}

pub fn stream_missing_extraction(
    pool: &PgPool,
) -> BoxStream<'_, Result<PendingExtraction, sqlx::Error>> {
    sqlx::query_as::<_, PendingExtraction>(
        r"
        select
            entity_key,
            raw_result
        from
            search_record
        where
            extracted_value is null
        order by entity_key
        ",
    )
    .fetch(pool)
}

/// Returns false when the row is absent or already carries a value.
pub async fn set_extracted_value(
    pool: &PgPool,
    entity_key: &str,
    value: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"
        update search_record set
            extracted_value = $2,
            extracted_at = now()
        where
            entity_key = $1
            and extracted_value is null
        ",
    )
    .bind(entity_key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn reset_extracted_value(pool: &PgPool, entity_key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"
        update search_record set
            extracted_value = null,
            extracted_at = null
        where
            entity_key = $1
        ",
    )
    .bind(entity_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_search_records(pool: &PgPool) -> Result<Vec<SearchRecord>, sqlx::Error> {
    sqlx::query_as::<_, SearchRecord>(
        r"
        select
            entity_key,
            raw_result,
            fetched_at,
            extracted_value,
            extracted_at
        from
            search_record
        order by fetched_at desc, entity_key
        ",
    )
    .fetch_all(pool)
    .await
}
