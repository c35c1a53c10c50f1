use crate::params::FilterParameters;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which producer a saved filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterSource {
    Quiz,
    Manual,
    ImageMatch,
}

impl fmt::Display for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterSource::Quiz => "quiz",
            FilterSource::Manual => "manual",
            FilterSource::ImageMatch => "image-match",
        })
    }
}

/// The record shape exchanged with the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: String,
    pub name: String,
    pub params: FilterParameters,
    pub source: FilterSource,

    #[serde(default)]
    pub created_at: String,
}

impl SavedFilter {
    pub fn new(params: FilterParameters, source: FilterSource) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: params.name().to_string(),
            params,
            source,
            created_at: chrono::Local::now().to_rfc3339(),
        }
    }

    pub fn renamed(&self, name: &str) -> Self {
        let params = self.params.clone().with_name(name);
        Self {
            name: params.name().to_string(),
            params,
            ..self.clone()
        }
    }

    /// Replace the parameters, keeping identity and provenance.
    pub fn with_params(&self, params: FilterParameters) -> Self {
        Self {
            name: params.name().to_string(),
            params,
            ..self.clone()
        }
    }

    /// Same record, attributed to another producer.
    pub fn with_source(self, source: FilterSource) -> Self {
        Self { source, ..self }
    }
}
