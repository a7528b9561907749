use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::errors::ConfigError;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub api_keys: ApiKeys,
    pub search: SearchSettings,
    pub extraction: ExtractionSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub database_name: String,
    #[serde(default)]
    pub require_ssl: bool,
    /// Keep results in process memory instead of Postgres, for dry runs.
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Deserialize, Clone, Default)]
pub struct ApiKeys {
    #[serde(default)]
    pub serp_api: String,
    #[serde(default)]
    pub openai: String,
}

#[derive(Deserialize, Clone)]
pub struct SearchSettings {
    pub base_url: String,
    pub engine: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub result_count: u8,
    pub locale: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    pub query_template: String,
}

#[derive(Deserialize, Clone)]
pub struct ExtractionSettings {
    pub api_base: Option<String>,
    pub model: String,
    pub target_field: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_tokens: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct RateLimitSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_per_second: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_per_day: usize,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = match self.require_ssl {
            true => PgSslMode::Require,
            false => PgSslMode::Prefer,
        };

        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_keys.serp_api.trim().is_empty() {
            return Err(ConfigError::MissingCredential("search api key"));
        }
        if self.api_keys.openai.trim().is_empty() {
            return Err(ConfigError::MissingCredential("openai api key"));
        }
        if self.rate_limit.max_per_second == 0 {
            return Err(ConfigError::ZeroCapacity { window: "per-second" });
        }
        if self.rate_limit.max_per_day == 0 {
            return Err(ConfigError::ZeroCapacity { window: "per-day" });
        }

        Ok(())
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        .set_override_option("api_keys.serp_api", std::env::var("SERP_API_KEY").ok())?
        .set_override_option("api_keys.openai", std::env::var("OPENAI_API_KEY").ok())?
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
