use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Extraction,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Extraction => "extraction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFailure {
    pub entity_key: String,
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Extraction answered with empty text; the row stays pending.
    pub unresolved: usize,
    pub failures: Vec<EntityFailure>,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub fetch: PassReport,
    pub extraction: PassReport,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &EntityFailure> {
        self.fetch
            .failures
            .iter()
            .chain(self.extraction.failures.iter())
    }

    pub fn interrupted(&self) -> bool {
        self.fetch.interrupted || self.extraction.interrupted
    }
}
