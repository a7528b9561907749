use std::sync::Arc;

use futures::StreamExt;
use itertools::Itertools;
use tokio_util::sync::CancellationToken;

use crate::{
    dal::result_store::ResultStore,
    domain::batch_report::{BatchReport, EntityFailure, PassReport, Stage},
    errors::StoreError,
    services::{Extractor, Searcher},
};

/// Trims, drops blanks and removes duplicates, keeping first-seen order.
pub fn unique_entities<I, S>(entities: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entities
        .into_iter()
        .map(|entity| entity.as_ref().trim().to_string())
        .filter(|entity| !entity.is_empty())
        .unique()
        .collect()
}

pub struct Orchestrator {
    store: Arc<dyn ResultStore>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ResultStore>, cancel: CancellationToken) -> Self {
        Orchestrator { store, cancel }
    }

    pub async fn fetch_pass(
        &self,
        searcher: &dyn Searcher,
        entities: &[String],
    ) -> Result<PassReport, StoreError> {
        let entities = unique_entities(entities);
        let mut report = PassReport::default();
        log::info!("Fetch pass started for {} entities", entities.len());

        for entity in entities {
            if self.cancel.is_cancelled() {
                log::warn!("Fetch pass interrupted before {}", entity);
                report.interrupted = true;
                break;
            }

            report.attempted += 1;
            match searcher.search(&entity).await {
                Ok(raw_result) => {
                    self.store.upsert_raw(&entity, &raw_result).await?;
                    report.succeeded += 1;
                }
                Err(e) => {
                    log::error!("Search failed for {}: {}", entity, e);
                    report.failures.push(EntityFailure {
                        entity_key: entity,
                        stage: Stage::Fetch,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Fetch pass done: {} stored, {} failed",
            report.succeeded,
            report.failures.len()
        );
        Ok(report)
    }

    /// Failed or empty extractions stay unset and are retried by the next pass.
    pub async fn extraction_pass(&self, extractor: &dyn Extractor) -> Result<PassReport, StoreError> {
        let mut report = PassReport::default();
        let mut rows = self.store.rows_missing_extraction();

        while let Some(row) = rows.next().await {
            let row = row?;

            if self.cancel.is_cancelled() {
                log::warn!("Extraction pass interrupted before {}", row.entity_key);
                report.interrupted = true;
                break;
            }

            report.attempted += 1;
            match extractor.extract(&row.entity_key, &row.raw_result).await {
                Ok(Some(value)) => {
                    match self.store.set_extracted(&row.entity_key, &value).await? {
                        true => log::info!("Extracted {} for {}", value, row.entity_key),
                        false => log::warn!("{} was already extracted", row.entity_key),
                    }
                    report.succeeded += 1;
                }
                Ok(None) => {
                    log::info!("No data extracted for {}", row.entity_key);
                    report.unresolved += 1;
                }
                Err(e) => {
                    log::error!("Extraction failed for {}: {}", row.entity_key, e);
                    report.failures.push(EntityFailure {
                        entity_key: row.entity_key,
                        stage: Stage::Extraction,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Extraction pass done: {} extracted, {} unresolved, {} failed",
            report.succeeded,
            report.unresolved,
            report.failures.len()
        );
        Ok(report)
    }

    pub async fn run(
        &self,
        searcher: &dyn Searcher,
        extractor: &dyn Extractor,
        entities: &[String],
    ) -> Result<BatchReport, StoreError> {
        let fetch = self.fetch_pass(searcher, entities).await?;
        let extraction = match fetch.interrupted {
            true => PassReport::default(),
            false => self.extraction_pass(extractor).await?,
        };

        Ok(BatchReport { fetch, extraction })
    }
}
