//! In-memory feature store.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use super::{FeatureSet, FeatureStore};
use crate::error::{FlagError, Result};
use crate::model::{fold_case, Feature};

/// A fixed set of features held in memory.
///
/// Every [`get_all`](FeatureStore::get_all) call returns a fresh random
/// marker, so callers never mistake two reads for the same version.
///
/// # Example
///
/// ```
/// use flagwise::model::Feature;
/// use flagwise::storage::InMemoryFeatureStore;
///
/// let store = InMemoryFeatureStore::new([
///     Feature::new("DarkMode", true),
///     Feature::new("Search", false),
/// ])
/// .unwrap();
/// assert_eq!(store.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeatureStore {
    features: Vec<Feature>,
    index: HashMap<String, usize>,
}

impl InMemoryFeatureStore {
    /// Seeds a store.
    ///
    /// # Errors
    ///
    /// Two features whose keys differ only by case are a
    /// [`DuplicateKey`](crate::error::ErrorType::DuplicateKey) error.
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Result<Self> {
        let mut store = Self::default();
        for feature in features {
            let folded = fold_case(&feature.key);
            if store.index.contains_key(&folded) {
                return Err(FlagError::duplicate_key(feature.key));
            }
            store.index.insert(folded, store.features.len());
            store.features.push(feature);
        }
        Ok(store)
    }

    /// A store with no features.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn get_all(&self) -> Result<FeatureSet> {
        let etag = Uuid::new_v4().simple().to_string();
        Ok(FeatureSet::new(self.features.clone(), etag))
    }

    async fn get(&self, key: &str) -> Result<Option<Feature>> {
        Ok(self
            .index
            .get(&fold_case(key))
            .map(|&position| self.features[position].clone()))
    }
}
