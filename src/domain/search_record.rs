use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SearchRecord {
    pub entity_key: String,
    pub raw_result: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub extracted_value: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
}

impl SearchRecord {
    pub fn is_extracted(&self) -> bool {
        self.extracted_value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PendingExtraction {
    pub entity_key: String,
    pub raw_result: serde_json::Value,
}
