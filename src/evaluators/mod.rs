//! Rule evaluators and the registry that dispatches rules to them.
//!
//! ## RuleEvaluator Trait
//!
//! Every rule kind implements [`RuleEvaluator`]: a name, matched
//! case-insensitively against [`FeatureRule::rule_name`], and a pure
//! `evaluate(rule, context, feature_key)` function.
//!
//! ## Available Evaluators
//!
//! - `PercentageRuleEvaluator`: stable percentage rollout
//! - `ScheduleRuleEvaluator`: inclusive UTC time window
//! - `TargetingRuleEvaluator`: user and group lists with rollout fallback
//!
//! ## Module Organization
//!
//! - `common.rs`: parameter coercion shared by the evaluators
//! - `percentage.rs`, `schedule.rs`, `targeting.rs`: one evaluator each

mod common;
mod percentage;
mod schedule;
mod targeting;

pub use common::{coerce_percentage, parse_iso8601};
pub use percentage::{bucket, PercentageRuleEvaluator, PERCENTAGE_RULE};
pub use schedule::{ScheduleRuleEvaluator, SCHEDULE_RULE};
pub use targeting::{TargetingRuleEvaluator, TARGETING_RULE};

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::model::{fold_case, FeatureContext, FeatureRule};

/// Evaluation logic for one rule kind.
///
/// Implementations must be pure with respect to shared state: the engine may
/// call them from many evaluations at once.
pub trait RuleEvaluator: Send + Sync {
    /// Name matched against [`FeatureRule::rule_name`].
    fn name(&self) -> &str;

    /// Returns whether the rule lets the feature stay enabled for `ctx`.
    ///
    /// Errors signal misconfigured rule parameters and are propagated to the
    /// caller of the evaluation.
    fn evaluate(&self, rule: &FeatureRule, ctx: &FeatureContext, feature_key: &str) -> Result<bool>;
}

/// Concurrent map from rule-kind name to evaluator.
///
/// Registration and lookup are safe from any number of threads while
/// evaluations are in flight. Names compare case-insensitively and the last
/// registration under a name wins.
///
/// # Example
///
/// ```
/// use flagwise::evaluators::{EvaluatorRegistry, PercentageRuleEvaluator};
/// use std::sync::Arc;
///
/// let registry = EvaluatorRegistry::new();
/// registry.register(Arc::new(PercentageRuleEvaluator));
/// assert!(registry.contains("PERCENTAGE"));
/// ```
#[derive(Default)]
pub struct EvaluatorRegistry {
    evaluators: DashMap<String, Arc<dyn RuleEvaluator>>,
}

impl EvaluatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the three built-in evaluators.
    pub fn with_builtin_evaluators(clock: Arc<dyn Clock>) -> Self {
        let registry = Self::new();
        for evaluator in builtin_evaluators(clock) {
            registry.register(evaluator);
        }
        registry
    }

    /// Registers an evaluator under its name, returning the one it replaced.
    pub fn register(&self, evaluator: Arc<dyn RuleEvaluator>) -> Option<Arc<dyn RuleEvaluator>> {
        let name = evaluator.name().to_string();
        let replaced = self.evaluators.insert(fold_case(&name), evaluator);
        debug!(rule = %name, replaced = replaced.is_some(), "Registered rule evaluator");
        replaced
    }

    /// Looks up the evaluator for a rule name.
    ///
    /// The returned handle is detached from the map, so no lock is held while
    /// the caller evaluates.
    pub fn get(&self, rule_name: &str) -> Option<Arc<dyn RuleEvaluator>> {
        self.evaluators
            .get(&fold_case(rule_name))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if an evaluator is registered under `rule_name`.
    pub fn contains(&self, rule_name: &str) -> bool {
        self.evaluators.contains_key(&fold_case(rule_name))
    }

    /// Registered names as the evaluators report them, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .evaluators
            .iter()
            .map(|entry| entry.value().name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("evaluators", &self.names())
            .finish()
    }
}

/// The built-in evaluators, sharing `clock` for time-dependent rules.
///
/// # Returns
///
/// - `Percentage`: stable rollout by user id
/// - `Schedule`: inclusive UTC window
/// - `Targeting`: users, groups, rollout fallback
pub fn builtin_evaluators(clock: Arc<dyn Clock>) -> Vec<Arc<dyn RuleEvaluator>> {
    vec![
        Arc::new(PercentageRuleEvaluator),
        Arc::new(ScheduleRuleEvaluator::with_clock(clock)),
        Arc::new(TargetingRuleEvaluator::default()),
    ]
}
