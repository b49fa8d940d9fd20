//! Feature manager facade.
//!
//! [`FeatureManager`] answers "is this feature on for this context" by looking
//! the feature up in a [`FeatureStore`] and handing it to a
//! [`FeatureEvaluator`].

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{system_clock, Clock};
use crate::error::{FlagError, Result};
use crate::evaluator::FeatureEvaluator;
use crate::model::FeatureContext;
use crate::settings::ManagerSettings;
use crate::storage::FeatureStore;
use crate::types::EvaluationResult;

/// One store plus one evaluator.
///
/// An unknown feature key is disabled, never an error.
///
/// # Example
///
/// ```
/// use flagwise::model::{Feature, FeatureContext};
/// use flagwise::storage::InMemoryFeatureStore;
/// use flagwise::{FeatureEngine, FeatureManager};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryFeatureStore::new([Feature::new("Search", true)]).unwrap();
/// let manager = FeatureManager::new(
///     Arc::new(store),
///     Arc::new(FeatureEngine::with_builtin_evaluators()),
/// );
///
/// let ctx = FeatureContext::new().with_user_id("alice");
/// assert!(manager.is_enabled("search", &ctx).await.unwrap());
/// assert!(!manager.is_enabled("Missing", &ctx).await.unwrap());
/// # });
/// ```
#[derive(Clone)]
pub struct FeatureManager {
    store: Arc<dyn FeatureStore>,
    evaluator: Arc<dyn FeatureEvaluator>,
}

impl FeatureManager {
    pub fn new(store: Arc<dyn FeatureStore>, evaluator: Arc<dyn FeatureEvaluator>) -> Self {
        Self { store, evaluator }
    }

    pub fn builder() -> FeatureManagerBuilder {
        FeatureManagerBuilder::default()
    }

    /// Assembles a manager from settings using the system clock.
    pub fn from_settings(settings: &ManagerSettings) -> Result<Self> {
        Self::from_settings_with_clock(settings, system_clock())
    }

    /// Assembles a manager from settings with an explicit clock.
    pub fn from_settings_with_clock(settings: &ManagerSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = settings.build_store()?;
        let engine = settings.build_engine(clock);
        Self::builder().store(store).evaluator(Arc::new(engine)).build()
    }

    /// Returns whether `key` is enabled for `ctx`.
    ///
    /// A key the store does not know is `false`; the evaluator is not called.
    pub async fn is_enabled(&self, key: &str, ctx: &FeatureContext) -> Result<bool> {
        Ok(self.evaluate(key, ctx).await?.enabled)
    }

    /// Evaluates `key` for `ctx`.
    ///
    /// A key the store does not know yields a disabled result carrying the
    /// requested key; the evaluator is not called.
    pub async fn evaluate(&self, key: &str, ctx: &FeatureContext) -> Result<EvaluationResult> {
        match self.store.get(key).await? {
            Some(feature) => self.evaluator.evaluate(&feature, ctx).await,
            None => {
                debug!(feature = %key, "Feature not found, treating as disabled");
                Ok(EvaluationResult::disabled(key))
            }
        }
    }

    pub fn store(&self) -> &Arc<dyn FeatureStore> {
        &self.store
    }

    pub fn evaluator(&self) -> &Arc<dyn FeatureEvaluator> {
        &self.evaluator
    }
}

impl fmt::Debug for FeatureManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureManager").finish_non_exhaustive()
    }
}

/// Builder for [`FeatureManager`].
///
/// Both a store and an evaluator are required.
#[derive(Default)]
pub struct FeatureManagerBuilder {
    store: Option<Arc<dyn FeatureStore>>,
    evaluator: Option<Arc<dyn FeatureEvaluator>>,
}

impl FeatureManagerBuilder {
    pub fn store(mut self, store: Arc<dyn FeatureStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn FeatureEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// # Errors
    ///
    /// [`MissingDependency`](crate::error::ErrorType::MissingDependency) naming
    /// whichever of the store or evaluator was not supplied.
    pub fn build(self) -> Result<FeatureManager> {
        let store = self.store.ok_or_else(|| FlagError::missing_dependency("store"))?;
        let evaluator = self
            .evaluator
            .ok_or_else(|| FlagError::missing_dependency("evaluator"))?;
        Ok(FeatureManager::new(store, evaluator))
    }
}
