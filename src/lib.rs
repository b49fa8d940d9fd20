//! # flagwise
//!
//! A feature flag evaluation library with pluggable rule evaluators and
//! composable flag stores.
//!
//! ## Features
//!
//! - **Rule Evaluation**: Features carry an ordered list of rules combined with
//!   short-circuit AND. Built-in rule kinds are `Percentage`, `Schedule` and
//!   `Targeting`; custom kinds implement [`RuleEvaluator`].
//! - **Stable Rollouts**: Percentage bucketing hashes the feature key together
//!   with the user id, so a user keeps their bucket across processes.
//! - **Stores**: In-memory, JSON file and configuration-section stores, and a
//!   composite that layers several of them.
//! - **No Globals**: Every [`FeatureEngine`] owns its registry; independent
//!   engines coexist in one process.
//!
//! ## Example
//!
//! ```
//! use flagwise::model::{Feature, FeatureContext, FeatureRule};
//! use flagwise::storage::InMemoryFeatureStore;
//! use flagwise::{FeatureEngine, FeatureManager};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = InMemoryFeatureStore::new([
//!     Feature::new("NewCheckout", true)
//!         .with_rule(FeatureRule::new("Targeting").with_param("groups", vec!["beta"])),
//! ])
//! .unwrap();
//!
//! let manager = FeatureManager::builder()
//!     .store(Arc::new(store))
//!     .evaluator(Arc::new(FeatureEngine::with_builtin_evaluators()))
//!     .build()
//!     .unwrap();
//!
//! let tester = FeatureContext::new().with_user_id("carol").with_group("Beta");
//! assert!(manager.is_enabled("NewCheckout", &tester).await.unwrap());
//! # });
//! ```

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod evaluators;
pub mod manager;
pub mod model;
pub mod settings;
pub mod storage;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorType, FlagError, Result};
pub use evaluator::{FeatureEngine, FeatureEvaluator};
pub use evaluators::{EvaluatorRegistry, RuleEvaluator};
pub use manager::{FeatureManager, FeatureManagerBuilder};
pub use model::{Feature, FeatureContext, FeatureRule, ParamValue};
pub use settings::{EvaluatorSettings, ManagerSettings, StoreSettings};
pub use storage::{FeatureSet, FeatureStore};
pub use types::EvaluationResult;
