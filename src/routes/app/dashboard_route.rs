use actix_web::{get, web, HttpResponse};
use askama::Template;

use crate::{
    domain::search_record::SearchRecord,
    routes::render_page,
    services::{AppContext, BatchRun, RunState},
};

const RAW_PREVIEW_LEN: usize = 120;

struct RecordRow {
    entity_key: String,
    extracted_value: String,
    fetched_at: String,
    raw_preview: String,
}

impl From<SearchRecord> for RecordRow {
    fn from(value: SearchRecord) -> Self {
        let raw = value.raw_result.to_string();
        let raw_preview = match raw.char_indices().nth(RAW_PREVIEW_LEN) {
            Some((end, _)) => format!("{}...", &raw[..end]),
            None => raw,
        };

        Self {
            entity_key: value.entity_key,
            extracted_value: value.extracted_value.unwrap_or("".to_string()),
            fetched_at: value.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            raw_preview,
        }
    }
}

struct RunRow {
    id: String,
    template: String,
    entity_count: usize,
    started_at: String,
    state: &'static str,
}

impl From<BatchRun> for RunRow {
    fn from(value: BatchRun) -> Self {
        Self {
            id: value.id.to_string(),
            template: value.template,
            entity_count: value.entity_count,
            started_at: value.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            state: match value.state {
                RunState::Running => "running",
                RunState::Finished { .. } => "finished",
                RunState::Failed { .. } => "failed",
            },
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    records: Vec<RecordRow>,
    runs: Vec<RunRow>,
    default_template: String,
    remaining_today: usize,
    store_error: Option<String>,
}

#[get("/dashboard")]
pub async fn dashboard(context: web::Data<AppContext>) -> HttpResponse {
    let (records, store_error) = match context.store.list_records().await {
        Ok(records) => (records.into_iter().map(RecordRow::from).collect(), None),
        Err(e) => {
            log::error!("Failed to load records: {}", e);
            (vec![], Some("Could not load stored results.".to_string()))
        }
    };
    let runs = context
        .runs
        .recent()
        .await
        .into_iter()
        .map(RunRow::from)
        .collect();
    let usage = context.rate_limiter.usage().await;

    render_page(DashboardTemplate {
        records,
        runs,
        default_template: context.search_settings.query_template.clone(),
        remaining_today: usage.remaining_today,
        store_error,
    })
}
