use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    configuration::SearchSettings,
    domain::query_template::QueryTemplate,
    errors::{ConfigError, SearchError},
    services::RateLimiter,
};

#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, entity: &str) -> Result<serde_json::Value, SearchError>;
}

#[derive(Serialize)]
struct SerpQuery<'a> {
    api_key: &'a str,
    engine: &'a str,
    q: String,
    num: u8,
    gl: &'a str,
}

pub struct SearchClient {
    client: Client,
    url: Url,
    api_key: String,
    engine: String,
    result_count: u8,
    locale: String,
    template: QueryTemplate,
    rate_limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
}

pub fn build_search_http_client(settings: &SearchSettings) -> Result<Client, ConfigError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    Ok(client)
}

impl SearchClient {
    /// Fails before touching the rate limiter if the template or endpoint is unusable.
    pub fn new(
        client: Client,
        settings: &SearchSettings,
        api_key: &str,
        template: &str,
        rate_limiter: Arc<RateLimiter>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let template = QueryTemplate::parse(template)?;
        let url = Url::parse(&settings.base_url).map_err(|source| ConfigError::InvalidEndpoint {
            url: settings.base_url.clone(),
            source,
        })?;

        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("search api key"));
        }

        Ok(SearchClient {
            client,
            url,
            api_key: api_key.to_string(),
            engine: settings.engine.clone(),
            result_count: settings.result_count,
            locale: settings.locale.clone(),
            template,
            rate_limiter,
            cancel,
        })
    }

    pub fn template(&self) -> &QueryTemplate {
        &self.template
    }
}

#[async_trait]
impl Searcher for SearchClient {
    async fn search(&self, entity: &str) -> Result<serde_json::Value, SearchError> {
        if self.rate_limiter.acquire(&self.cancel).await.is_err() {
            return Err(SearchError::Interrupted {
                entity: entity.to_string(),
            });
        }

        let query = SerpQuery {
            api_key: &self.api_key,
            engine: &self.engine,
            q: self.template.render(entity),
            num: self.result_count,
            gl: &self.locale,
        };
        log::info!("Searching for {}: {}", entity, query.q);

        // The request url carries the api key, keep it out of error messages.
        let transport = |source: reqwest::Error| SearchError::Transport {
            entity: entity.to_string(),
            source: source.without_url(),
        };

        let res = self
            .client
            .get(self.url.clone())
            .query(&query)
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                entity: entity.to_string(),
                code: status.as_u16(),
            });
        }

        res.json::<serde_json::Value>().await.map_err(transport)
    }
}
