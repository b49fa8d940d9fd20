//! Feature store over a section of an application configuration document.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{FeatureSet, FeatureStore};
use crate::error::{FlagError, Result};
use crate::model::{features_from_value, get_ignore_case, Feature};

/// Section read when none is configured.
pub const DEFAULT_SECTION: &str = "Features";

/// Separator for nested section paths such as `App:Features`.
const SECTION_SEPARATOR: char = ':';

/// Reads features from one section of a configuration document.
///
/// The section is resolved case-insensitively on every read. A missing
/// section has no features. The version marker is the read time, so every
/// read looks like a new version.
///
/// # Example
///
/// ```
/// use flagwise::storage::ConfigurationFeatureStore;
///
/// let store = ConfigurationFeatureStore::from_yaml_str(
///     "app:\n  flags:\n    - key: Search\n      enabled: true\n",
/// )
/// .unwrap()
/// .with_section("App:Flags");
/// assert_eq!(store.section(), "App:Flags");
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationFeatureStore {
    document: Arc<Value>,
    section: String,
}

impl ConfigurationFeatureStore {
    /// Wraps an already-loaded configuration document.
    pub fn new(document: Value) -> Self {
        Self {
            document: Arc::new(document),
            section: DEFAULT_SECTION.to_string(),
        }
    }

    /// Parses a YAML configuration document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(text)
            .map_err(|e| FlagError::parse_error(format!("Invalid YAML configuration: {}", e)))?;
        Ok(Self::new(document))
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| FlagError::parse_error(format!("Invalid JSON configuration: {}", e)))?;
        Ok(Self::new(document))
    }

    /// Reads from `section` instead of [`DEFAULT_SECTION`]. Nested sections
    /// are separated by `:`.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    fn resolve_section(&self) -> &Value {
        let mut current: &Value = &self.document;
        for segment in self.section.split(SECTION_SEPARATOR) {
            current = match current {
                Value::Object(obj) => get_ignore_case(obj, segment.trim()).unwrap_or(&Value::Null),
                _ => &Value::Null,
            };
        }
        current
    }

    fn read(&self) -> Result<Vec<Feature>> {
        features_from_value(self.resolve_section()).map_err(|e| {
            FlagError::parse_error(format!("Configuration section '{}': {}", self.section, e.message))
        })
    }
}

/// Current time in nanoseconds since the Unix epoch.
fn now_etag() -> String {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros())
        .to_string()
}

#[async_trait]
impl FeatureStore for ConfigurationFeatureStore {
    async fn get_all(&self) -> Result<FeatureSet> {
        let features = self.read()?;
        debug!(section = %self.section, features = features.len(), "Read configuration section");
        Ok(FeatureSet::new(features, now_etag()))
    }

    async fn get(&self, key: &str) -> Result<Option<Feature>> {
        Ok(self.read()?.into_iter().find(|feature| feature.matches_key(key)))
    }
}
