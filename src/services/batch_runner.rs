use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::{sync::RwLock, task::JoinError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    configuration::SearchSettings,
    dal::result_store::ResultStore,
    domain::batch_report::BatchReport,
    errors::{ConfigError, StoreError},
    services::{unique_entities, Extractor, Orchestrator, RateLimiter, SearchClient},
};

/// Finished or failed runs kept for the dashboard. Running ones are never dropped.
pub const MAX_FINISHED_RUNS: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Running,
    Finished { report: BatchReport },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRun {
    pub id: Uuid,
    pub template: String,
    pub entity_count: usize,
    pub started_at: DateTime<Utc>,
    pub state: RunState,
}

#[derive(Clone, Default)]
pub struct BatchRuns {
    runs: Arc<RwLock<HashMap<Uuid, BatchRun>>>,
}

impl BatchRuns {
    pub async fn insert(&self, run: BatchRun) {
        let mut runs = self.runs.write().await;
        runs.insert(run.id, run);
        prune_finished(&mut runs);
    }

    pub async fn get(&self, id: &Uuid) -> Option<BatchRun> {
        self.runs.read().await.get(id).cloned()
    }

    pub async fn recent(&self) -> Vec<BatchRun> {
        let mut runs: Vec<BatchRun> = self.runs.read().await.values().cloned().collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs
    }

    async fn set_state(&self, id: &Uuid, state: RunState) {
        let mut runs = self.runs.write().await;
        if let Some(run) = runs.get_mut(id) {
            run.state = state;
        }
        prune_finished(&mut runs);
    }
}

fn prune_finished(runs: &mut HashMap<Uuid, BatchRun>) {
    let mut finished: Vec<(DateTime<Utc>, Uuid)> = runs
        .values()
        .filter(|run| !matches!(run.state, RunState::Running))
        .map(|run| (run.started_at, run.id))
        .collect();
    if finished.len() <= MAX_FINISHED_RUNS {
        return;
    }

    finished.sort();
    let excess = finished.len() - MAX_FINISHED_RUNS;
    for (_, id) in finished.into_iter().take(excess) {
        runs.remove(&id);
    }
}

fn final_state(id: &Uuid, result: Result<Result<BatchReport, StoreError>, JoinError>) -> RunState {
    match result {
        Ok(Ok(report)) => RunState::Finished { report },
        Ok(Err(e)) => {
            log::error!("Batch {} aborted: {}", id, e);
            RunState::Failed {
                error: e.to_string(),
            }
        }
        Err(e) => {
            log::error!("Batch {} task died: {}", id, e);
            RunState::Failed {
                error: format!("Batch task died: {}", e),
            }
        }
    }
}

/// Everything a batch needs, built once in `main` and shared with the routes.
pub struct AppContext {
    pub store: Arc<dyn ResultStore>,
    pub extractor: Arc<dyn Extractor>,
    pub rate_limiter: Arc<RateLimiter>,
    pub search_http: Client,
    pub search_settings: SearchSettings,
    pub search_api_key: String,
    pub runs: BatchRuns,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn search_client(&self, template: &str) -> Result<SearchClient, ConfigError> {
        SearchClient::new(
            self.search_http.clone(),
            &self.search_settings,
            &self.search_api_key,
            template,
            self.rate_limiter.clone(),
            self.shutdown.child_token(),
        )
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.store.clone(), self.shutdown.child_token())
    }

    /// Validates the template, then runs both passes in the background.
    pub async fn start_batch(
        self: &Arc<Self>,
        template: &str,
        entities: Vec<String>,
    ) -> Result<Uuid, ConfigError> {
        let searcher = self.search_client(template)?;
        let entities = unique_entities(entities);
        let id = Uuid::new_v4();

        self.runs
            .insert(BatchRun {
                id,
                template: searcher.template().as_str().to_string(),
                entity_count: entities.len(),
                started_at: Utc::now(),
                state: RunState::Running,
            })
            .await;

        let context = Arc::clone(self);
        let worker = tokio::spawn(async move {
            log::info!("Batch {} started", id);
            let result = context
                .orchestrator()
                .run(&searcher, context.extractor.as_ref(), &entities)
                .await;
            result
        });

        // A panic in the worker still moves the run out of `Running`.
        let runs = self.runs.clone();
        tokio::spawn(async move {
            let state = final_state(&id, worker.await);
            runs.set_state(&id, state).await;
            log::info!("Batch {} finished", id);
        });

        Ok(id)
    }

    pub async fn run_extraction(&self) -> Result<BatchReport, StoreError> {
        let extraction = self
            .orchestrator()
            .extraction_pass(self.extractor.as_ref())
            .await?;

        Ok(BatchReport {
            extraction,
            ..Default::default()
        })
    }
}
