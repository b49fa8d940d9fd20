//! Declarative manager configuration.
//!
//! A [`ManagerSettings`] document describes which stores to read and whether
//! the built-in evaluators are registered. It can be written in YAML or JSON:
//!
//! ```yaml
//! stores:
//!   - type: json_file
//!     path: /etc/app/features.json
//!     timeout_ms: 2000
//!   - type: in_memory
//!     features:
//!       - key: Search
//!         enabled: true
//! evaluators:
//!   builtin: true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{FlagError, Result};
use crate::evaluator::FeatureEngine;
use crate::model::Feature;
use crate::storage::{
    CompositeFeatureStore, ConfigurationFeatureStore, FeatureStore, InMemoryFeatureStore,
    JsonFileFeatureStore, DEFAULT_READ_TIMEOUT, DEFAULT_SECTION,
};

/// Top-level manager configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagerSettings {
    /// Stores in priority order. Absent is a configuration error, an empty
    /// list is a store with no features.
    pub stores: Option<Vec<StoreSettings>>,
    pub evaluators: EvaluatorSettings,
}

/// Which evaluators a settings-built engine starts with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Register `Percentage`, `Schedule` and `Targeting`
    pub builtin: bool,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self { builtin: true }
    }
}

/// One store entry, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreSettings {
    /// Features listed inline
    InMemory {
        #[serde(default)]
        features: Vec<Feature>,
    },
    /// A `{ "Features": [...] }` file
    JsonFile {
        path: PathBuf,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// A section of an inline configuration document
    Configuration {
        document: Value,
        #[serde(default = "default_section")]
        section: String,
    },
}

fn default_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

impl StoreSettings {
    /// Builds the store this entry describes.
    pub fn build(&self) -> Result<Arc<dyn FeatureStore>> {
        let store: Arc<dyn FeatureStore> = match self {
            Self::InMemory { features } => Arc::new(InMemoryFeatureStore::new(features.iter().cloned())?),
            Self::JsonFile { path, timeout_ms } => Arc::new(
                JsonFileFeatureStore::new(path.clone())?
                    .with_timeout(Duration::from_millis(*timeout_ms)),
            ),
            Self::Configuration { document, section } => Arc::new(
                ConfigurationFeatureStore::new(document.clone()).with_section(section.clone()),
            ),
        };
        Ok(store)
    }
}

impl ManagerSettings {
    /// Parses settings from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| FlagError::parse_error(format!("Invalid YAML settings: {}", e)))
    }

    /// Parses settings from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| FlagError::parse_error(format!("Invalid JSON settings: {}", e)))
    }

    /// Reads settings from a file; `.json` files are parsed as JSON and
    /// anything else as YAML.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FlagError::io(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Builds the configured store. Several entries are combined into a
    /// [`CompositeFeatureStore`] in the order listed.
    ///
    /// # Errors
    ///
    /// An absent `stores` list is a
    /// [`MissingDependency`](crate::error::ErrorType::MissingDependency) error.
    pub fn build_store(&self) -> Result<Arc<dyn FeatureStore>> {
        let entries = self
            .stores
            .as_ref()
            .ok_or_else(|| FlagError::missing_dependency("stores"))?;

        let mut stores = entries
            .iter()
            .map(StoreSettings::build)
            .collect::<Result<Vec<_>>>()?;

        if stores.len() == 1 {
            if let Some(store) = stores.pop() {
                return Ok(store);
            }
        }
        Ok(Arc::new(CompositeFeatureStore::new(stores)))
    }

    /// Builds the configured engine reading `clock`.
    pub fn build_engine(&self, clock: Arc<dyn Clock>) -> FeatureEngine {
        if self.evaluators.builtin {
            FeatureEngine::with_builtin_evaluators_and_clock(clock)
        } else {
            FeatureEngine::from_parts(Default::default(), clock)
        }
    }
}
