//! Feature stores.
//!
//! A [`FeatureStore`] is a read-only lookup over some backing source of
//! feature definitions. Key lookups are case-insensitive in every backend.
//!
//! ## Backends
//!
//! - [`InMemoryFeatureStore`]: seeded once, for tests and defaults
//! - [`JsonFileFeatureStore`]: `{ "Features": [...] }` read from disk on every call
//! - [`ConfigurationFeatureStore`]: a named section of a YAML/JSON configuration document
//! - [`CompositeFeatureStore`]: several stores behind one view
//!
//! Stores do not cache and do not notify; callers re-fetch on demand and can
//! compare [`FeatureSet::etag`] values to detect changes.

mod composite;
mod configuration;
mod json_file;
mod lenient;
mod memory;

pub use composite::CompositeFeatureStore;
pub use configuration::{ConfigurationFeatureStore, DEFAULT_SECTION};
pub use json_file::{JsonFileFeatureStore, DEFAULT_READ_TIMEOUT, MISSING_FILE_ETAG};
pub use lenient::parse_features_document;
pub use memory::InMemoryFeatureStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Feature;

/// Every feature a store holds, with an opaque version marker.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// Features in store order
    pub features: Vec<Feature>,
    /// Version marker; equal markers mean the caller may reuse what it has
    pub etag: String,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>, etag: impl Into<String>) -> Self {
        Self {
            features,
            etag: etag.into(),
        }
    }

    /// An empty set with an empty marker.
    pub fn empty() -> Self {
        Self::new(Vec::new(), String::new())
    }

    /// Splits into the feature list and its marker.
    pub fn into_parts(self) -> (Vec<Feature>, String) {
        (self.features, self.etag)
    }

    /// First feature whose key matches ignoring case.
    pub fn find(&self, key: &str) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.matches_key(key))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Read-only lookup of feature definitions.
///
/// Failures reading the backing source are returned as-is; nothing in this
/// crate retries them.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Returns every feature with the store's current version marker.
    async fn get_all(&self) -> Result<FeatureSet>;

    /// Returns the feature with `key` (ignoring case), if any.
    async fn get(&self, key: &str) -> Result<Option<Feature>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_find_ignores_case() {
        let set = FeatureSet::new(
            vec![Feature::new("Alpha", true), Feature::new("alpha", false)],
            "v1",
        );
        let found = set.find("ALPHA").unwrap();
        assert!(found.enabled);
        assert!(set.find("beta").is_none());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_feature_set() {
        let set = FeatureSet::empty();
        assert!(set.is_empty());
        assert_eq!(set.etag, "");
    }
}
