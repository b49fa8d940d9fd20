//! Composite feature store.
//!
//! # Priority
//!
//! The two lookups disagree on which store wins a contested key:
//!
//! - [`get_all`](FeatureStore::get_all) merges every store's features and keeps
//!   the **last** occurrence of each key, so later stores win.
//! - [`get`](FeatureStore::get) asks the stores in order and returns the
//!   **first** hit, so earlier stores win.
//!
//! This is a known inconsistency. Both directions are kept as they are because
//! callers already depend on each of them.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::{FeatureSet, FeatureStore};
use crate::error::Result;
use crate::model::{fold_case, Feature};

/// Separator between inner version markers.
const ETAG_SEPARATOR: &str = "|";

/// Several stores presented as one.
///
/// # Example
///
/// ```
/// use flagwise::model::Feature;
/// use flagwise::storage::{CompositeFeatureStore, FeatureStore, InMemoryFeatureStore};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let defaults = InMemoryFeatureStore::new([Feature::new("Search", false)]).unwrap();
/// let overrides = InMemoryFeatureStore::new([Feature::new("search", true)]).unwrap();
/// let store = CompositeFeatureStore::new([
///     Arc::new(defaults) as Arc<dyn FeatureStore>,
///     Arc::new(overrides),
/// ]);
///
/// // merged view: the later store wins
/// assert!(store.get_all().await.unwrap().features[0].enabled);
/// // single lookup: the earlier store wins
/// assert!(!store.get("Search").await.unwrap().unwrap().enabled);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct CompositeFeatureStore {
    stores: Vec<Arc<dyn FeatureStore>>,
}

impl CompositeFeatureStore {
    /// Composes `stores`; their order defines priority.
    pub fn new(stores: impl IntoIterator<Item = Arc<dyn FeatureStore>>) -> Self {
        Self {
            stores: stores.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl fmt::Debug for CompositeFeatureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeFeatureStore")
            .field("stores", &self.stores.len())
            .finish()
    }
}

/// Merges sets in order, keeping the last feature seen for each key at the
/// position where that key first appeared.
fn merge_last_wins(sets: Vec<FeatureSet>) -> FeatureSet {
    let mut merged: Vec<Feature> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut etags = Vec::with_capacity(sets.len());

    for set in sets {
        etags.push(set.etag);
        for feature in set.features {
            match positions.entry(fold_case(&feature.key)) {
                Entry::Occupied(entry) => merged[*entry.get()] = feature,
                Entry::Vacant(entry) => {
                    entry.insert(merged.len());
                    merged.push(feature);
                }
            }
        }
    }

    FeatureSet::new(merged, etags.join(ETAG_SEPARATOR))
}

#[async_trait]
impl FeatureStore for CompositeFeatureStore {
    async fn get_all(&self) -> Result<FeatureSet> {
        let sets = try_join_all(self.stores.iter().map(|store| store.get_all())).await?;
        let merged = merge_last_wins(sets);
        trace!(stores = self.stores.len(), features = merged.len(), "Merged feature stores");
        Ok(merged)
    }

    async fn get(&self, key: &str) -> Result<Option<Feature>> {
        for store in &self.stores {
            if let Some(feature) = store.get(key).await? {
                return Ok(Some(feature));
            }
        }
        Ok(None)
    }
}
