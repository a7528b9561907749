use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;
use chrono::Utc;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use sqlx::PgPool;

use crate::{
    dal::search_record_db,
    domain::search_record::{PendingExtraction, SearchRecord},
    errors::StoreError,
};

/// One table of search results keyed by entity.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Inserts the row or replaces its raw result; extracted data is kept.
    async fn upsert_raw(
        &self,
        entity_key: &str,
        raw_result: &serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Rows whose extracted value is unset, ordered by entity key.
    fn rows_missing_extraction(&self) -> BoxStream<'_, Result<PendingExtraction, StoreError>>;

    /// Writes only if the row exists and has no value yet. Returns whether it wrote.
    async fn set_extracted(&self, entity_key: &str, value: &str) -> Result<bool, StoreError>;

    async fn reset_extracted(&self, entity_key: &str) -> Result<bool, StoreError>;

    async fn list_records(&self) -> Result<Vec<SearchRecord>, StoreError>;
}

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        PgResultStore { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn upsert_raw(
        &self,
        entity_key: &str,
        raw_result: &serde_json::Value,
    ) -> Result<(), StoreError> {
        search_record_db::upsert_raw_result(&self.pool, entity_key, raw_result).await?;
        Ok(())
    }

    fn rows_missing_extraction(&self) -> BoxStream<'_, Result<PendingExtraction, StoreError>> {
        search_record_db::stream_missing_extraction(&self.pool)
            .map(|row| row.map_err(StoreError::from))
            .boxed()
    }

    async fn set_extracted(&self, entity_key: &str, value: &str) -> Result<bool, StoreError> {
        Ok(search_record_db::set_extracted_value(&self.pool, entity_key, value).await?)
    }

    async fn reset_extracted(&self, entity_key: &str) -> Result<bool, StoreError> {
        Ok(search_record_db::reset_extracted_value(&self.pool, entity_key).await?)
    }

    async fn list_records(&self) -> Result<Vec<SearchRecord>, StoreError> {
        Ok(search_record_db::get_search_records(&self.pool).await?)
    }
}

/// Keeps records in process memory. Selected by `database.in_memory` for dry runs.
#[derive(Default)]
pub struct MemoryResultStore {
    records: Mutex<BTreeMap<String, SearchRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, SearchRecord>> {
        // A panic while holding the lock cannot leave a record half-written.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn upsert_raw(
        &self,
        entity_key: &str,
        raw_result: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut records = self.records();
        let now = Utc::now();

        records
            .entry(entity_key.to_string())
            .and_modify(|record| {
                record.raw_result = raw_result.clone();
                record.fetched_at = now;
            })
            .or_insert_with(|| SearchRecord {
                entity_key: entity_key.to_string(),
                raw_result: raw_result.clone(),
                fetched_at: now,
                extracted_value: None,
                extracted_at: None,
            });

        Ok(())
    }

    fn rows_missing_extraction(&self) -> BoxStream<'_, Result<PendingExtraction, StoreError>> {
        let pending: Vec<Result<PendingExtraction, StoreError>> = self
            .records()
            .values()
            .filter(|record| !record.is_extracted())
            .map(|record| {
                Ok(PendingExtraction {
                    entity_key: record.entity_key.clone(),
                    raw_result: record.raw_result.clone(),
                })
            })
            .collect();

        stream::iter(pending).boxed()
    }

    async fn set_extracted(&self, entity_key: &str, value: &str) -> Result<bool, StoreError> {
        let mut records = self.records();

        match records.get_mut(entity_key) {
            Some(record) if !record.is_extracted() => {
                record.extracted_value = Some(value.to_string());
                record.extracted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_extracted(&self, entity_key: &str) -> Result<bool, StoreError> {
        let mut records = self.records();

        match records.get_mut(entity_key) {
            Some(record) => {
                record.extracted_value = None;
                record.extracted_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_records(&self) -> Result<Vec<SearchRecord>, StoreError> {
        let mut records: Vec<SearchRecord> = self.records().values().cloned().collect();
        records.sort_by(|a, b| {
            b.fetched_at
                .cmp(&a.fetched_at)
                .then_with(|| a.entity_key.cmp(&b.entity_key))
        });
        Ok(records)
    }
}
