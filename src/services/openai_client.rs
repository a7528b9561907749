use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;

use crate::{
    configuration::ExtractionSettings,
    errors::{ConfigError, ExtractionError},
};

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        entity_key: &str,
        raw_result: &serde_json::Value,
    ) -> Result<Option<String>, ExtractionError>;
}

pub struct ExtractionClient {
    client: Client<OpenAIConfig>,
    model: String,
    target_field: String,
    max_tokens: u32,
}

impl ExtractionClient {
    pub fn new(settings: &ExtractionSettings, api_key: &str) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("openai api key"));
        }

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(api_base) = &settings.api_base {
            config = config.with_api_base(api_base);
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(ExtractionClient {
            client: Client::with_config(config).with_http_client(http_client),
            model: settings.model.clone(),
            target_field: settings.target_field.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    pub fn build_prompt(&self, entity_key: &str, raw_result: &str) -> String {
        format!(
            "Extract the {} for the company '{}' from the following data: {}",
            self.target_field, entity_key, raw_result
        )
    }
}

#[async_trait]
impl Extractor for ExtractionClient {
    async fn extract(
        &self,
        entity_key: &str,
        raw_result: &serde_json::Value,
    ) -> Result<Option<String>, ExtractionError> {
        let prompt = self.build_prompt(entity_key, &serde_json::to_string(raw_result)?);

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .max_tokens(self.max_tokens)
            .temperature(0.0_f32)
            .build()?;

        let response = self.client.chat().create(request).await?;
        log::debug!("Extraction response for {}: {:?}", entity_key, response);

        let first_choice = response
            .choices
            .first()
            .ok_or(ExtractionError::NoChoices)?;

        let extracted = first_choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(str::to_string);

        Ok(extracted)
    }
}
