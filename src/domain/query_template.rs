use crate::errors::ConfigError;

pub const PLACEHOLDER: &str = "{company}";

/// A search query with exactly one `{company}` slot, validated up front.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTemplate(String);

impl QueryTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let template = template.trim();

        match template.matches(PLACEHOLDER).count() {
            0 => Err(ConfigError::MissingPlaceholder {
                template: template.to_string(),
                placeholder: PLACEHOLDER,
            }),
            1 => Ok(QueryTemplate(template.to_string())),
            count => Err(ConfigError::RepeatedPlaceholder {
                template: template.to_string(),
                placeholder: PLACEHOLDER,
                count,
            }),
        }
    }

    pub fn render(&self, entity: &str) -> String {
        self.0.replacen(PLACEHOLDER, entity, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
