use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("query template `{template}` must contain the {placeholder} placeholder")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },
    #[error("query template `{template}` contains {placeholder} {count} times, expected once")]
    RepeatedPlaceholder {
        template: String,
        placeholder: &'static str,
        count: usize,
    },
    #[error("rate limit for the {window} window must be at least 1")]
    ZeroCapacity { window: &'static str },
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("invalid endpoint url `{url}`: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Settings(#[from] config::ConfigError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limiter wait was cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request for `{entity}` failed: {source}")]
    Transport {
        entity: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("search endpoint answered {code} for `{entity}`")]
    HttpStatus { entity: String, code: u16 },
    #[error("search for `{entity}` interrupted while waiting for the rate limiter")]
    Interrupted { entity: String },
}

impl SearchError {
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Transport { .. } => "transport",
            SearchError::HttpStatus { .. } => "http_status",
            SearchError::Interrupted { .. } => "interrupted",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("completion request failed: {0}")]
    Api(#[from] OpenAIError),
    #[error("completion response had no choices")]
    NoChoices,
    #[error("failed to serialize search result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExtractionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::Api(_) => "api",
            ExtractionError::NoChoices => "no_choices",
            ExtractionError::Serialize(_) => "serialize",
        }
    }
}
