//! Feature evaluation engine.
//!
//! A [`FeatureEngine`] owns an [`EvaluatorRegistry`] and combines a feature's
//! ordered rule list into one verdict. Each engine has its own registry, so
//! several independent engines can live in one process.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::clock::{system_clock, Clock};
use crate::error::Result;
use crate::evaluators::{EvaluatorRegistry, RuleEvaluator};
use crate::model::{Feature, FeatureContext};
use crate::types::EvaluationResult;

/// Decides whether a feature is enabled for a context.
#[async_trait]
pub trait FeatureEvaluator: Send + Sync {
    async fn evaluate(&self, feature: &Feature, ctx: &FeatureContext) -> Result<EvaluationResult>;
}

/// Rule-combining evaluation engine.
///
/// Evaluation starts from the feature's base switch, ANDs in each rule in
/// declaration order and stops at the first failing rule. Rules whose name has
/// no registered evaluator are skipped. An expired feature is disabled no
/// matter what the rules said.
///
/// # Example
///
/// ```
/// use flagwise::model::{Feature, FeatureContext, FeatureRule};
/// use flagwise::FeatureEngine;
///
/// let engine = FeatureEngine::with_builtin_evaluators();
/// let feature = Feature::new("Search", true)
///     .with_rule(FeatureRule::new("Targeting").with_param("users", vec!["alice"]));
///
/// let ctx = FeatureContext::new().with_user_id("Alice");
/// assert!(engine.evaluate_feature(&feature, &ctx).unwrap().enabled);
/// ```
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    registry: Arc<EvaluatorRegistry>,
    clock: Arc<dyn Clock>,
}

impl FeatureEngine {
    /// Creates an engine with an empty registry and the system clock.
    pub fn new() -> Self {
        Self::from_parts(Arc::new(EvaluatorRegistry::new()), system_clock())
    }

    /// Creates an engine with the built-in evaluators and the system clock.
    pub fn with_builtin_evaluators() -> Self {
        Self::with_builtin_evaluators_and_clock(system_clock())
    }

    /// Creates an engine with the built-in evaluators, all reading `clock`.
    pub fn with_builtin_evaluators_and_clock(clock: Arc<dyn Clock>) -> Self {
        let registry = EvaluatorRegistry::with_builtin_evaluators(Arc::clone(&clock));
        Self::from_parts(Arc::new(registry), clock)
    }

    /// Creates an engine over an existing registry.
    ///
    /// `clock` drives the expiry check; evaluators in the registry keep their
    /// own time source.
    pub fn from_parts(registry: Arc<EvaluatorRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Registers (or replaces) an evaluator.
    pub fn register(&self, evaluator: Arc<dyn RuleEvaluator>) {
        self.registry.register(evaluator);
    }

    /// The registry this engine dispatches to.
    pub fn registry(&self) -> &Arc<EvaluatorRegistry> {
        &self.registry
    }

    /// Evaluates `feature` for `ctx`.
    ///
    /// The engine itself never fails; an error here comes from an evaluator
    /// rejecting its rule parameters.
    pub fn evaluate_feature(&self, feature: &Feature, ctx: &FeatureContext) -> Result<EvaluationResult> {
        let mut enabled = feature.enabled;

        if enabled {
            for rule in &feature.rules {
                match self.registry.get(&rule.rule_name) {
                    Some(evaluator) => {
                        enabled = evaluator.evaluate(rule, ctx, &feature.key)?;
                        trace!(
                            feature = %feature.key,
                            rule = %rule.rule_name,
                            passed = enabled,
                            "Evaluated rule"
                        );
                    }
                    None => {
                        debug!(
                            feature = %feature.key,
                            rule = %rule.rule_name,
                            "No evaluator registered for rule, skipping"
                        );
                    }
                }

                if !enabled {
                    break;
                }
            }
        }

        if feature.is_expired_at(self.clock.now()) {
            debug!(feature = %feature.key, "Feature expired");
            enabled = false;
        }

        debug!(feature = %feature.key, enabled, "Evaluated feature");
        Ok(EvaluationResult::new(feature.key.clone(), enabled))
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureEvaluator for FeatureEngine {
    async fn evaluate(&self, feature: &Feature, ctx: &FeatureContext) -> Result<EvaluationResult> {
        self.evaluate_feature(feature, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::FeatureRule;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Evaluator with a fixed verdict that counts its invocations.
    struct Counting {
        name: &'static str,
        verdict: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(name: &'static str, verdict: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                verdict,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RuleEvaluator for Counting {
        fn name(&self) -> &str {
            self.name
        }

        fn evaluate(&self, _: &FeatureRule, _: &FeatureContext, _: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verdict)
        }
    }

    fn ctx() -> FeatureContext {
        FeatureContext::new().with_user_id("user1")
    }

    #[test]
    fn test_no_rules_keeps_base_switch() {
        let engine = FeatureEngine::new();
        assert!(engine.evaluate_feature(&Feature::new("On", true), &ctx()).unwrap().enabled);
        assert!(!engine.evaluate_feature(&Feature::new("Off", false), &ctx()).unwrap().enabled);
    }

    #[test]
    fn test_disabled_feature_ignores_passing_rules() {
        let pass = Counting::new("AlwaysPass", true);
        let engine = FeatureEngine::new();
        engine.register(pass.clone());

        let feature = Feature::new("F", false).with_rule(FeatureRule::new("AlwaysPass"));
        assert!(!engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
        assert_eq!(pass.calls(), 0);
    }

    #[test]
    fn test_short_circuits_on_first_failure() {
        let fail = Counting::new("AlwaysFail", false);
        let pass = Counting::new("AlwaysPass", true);
        let engine = FeatureEngine::new();
        engine.register(fail.clone());
        engine.register(pass.clone());

        let feature = Feature::new("F", true)
            .with_rule(FeatureRule::new("AlwaysFail"))
            .with_rule(FeatureRule::new("AlwaysPass"));

        assert!(!engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
        assert_eq!(fail.calls(), 1);
        assert_eq!(pass.calls(), 0);
    }

    #[test]
    fn test_all_rules_must_pass() {
        let first = Counting::new("R1", true);
        let second = Counting::new("R2", true);
        let engine = FeatureEngine::new();
        engine.register(first.clone());
        engine.register(second.clone());

        let feature = Feature::new("Multi", true)
            .with_rule(FeatureRule::new("R1"))
            .with_rule(FeatureRule::new("r2"));

        assert!(engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[test]
    fn test_unknown_rule_is_pass_through() {
        let engine = FeatureEngine::new();
        let feature = Feature::new("F", true).with_rule(FeatureRule::new("NonExistingRule"));
        assert!(engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);

        let fail = Counting::new("AlwaysFail", false);
        engine.register(fail);
        let guarded = Feature::new("G", true)
            .with_rule(FeatureRule::new("NonExistingRule"))
            .with_rule(FeatureRule::new("AlwaysFail"));
        assert!(!engine.evaluate_feature(&guarded, &ctx()).unwrap().enabled);
    }

    #[test]
    fn test_expired_feature_is_disabled_even_without_rules() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let engine = FeatureEngine::from_parts(
            Arc::new(EvaluatorRegistry::new()),
            Arc::new(FixedClock::new(now)),
        );

        let expired = Feature::new("Old", true).with_expiry(now - Duration::minutes(1));
        assert!(!engine.evaluate_feature(&expired, &ctx()).unwrap().enabled);

        let expiring_now = Feature::new("Edge", true).with_expiry(now);
        assert!(engine.evaluate_feature(&expiring_now, &ctx()).unwrap().enabled);
    }

    #[test]
    fn test_expiry_applies_after_passing_rules() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap());
        let engine = FeatureEngine::from_parts(Arc::new(EvaluatorRegistry::new()), Arc::new(clock.clone()));
        let pass = Counting::new("AlwaysPass", true);
        engine.register(pass.clone());

        let feature = Feature::new("Promo", true)
            .with_rule(FeatureRule::new("AlwaysPass"))
            .with_expiry(clock.now() + Duration::hours(1));

        assert!(engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
        clock.advance(Duration::hours(2));
        assert!(!engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
        assert_eq!(pass.calls(), 2);
    }

    #[test]
    fn test_replacing_an_evaluator_changes_the_verdict() {
        let engine = FeatureEngine::new();
        engine.register(Counting::new("ReplaceMe", false));
        engine.register(Counting::new("ReplaceMe", true));

        let feature = Feature::new("F", true).with_rule(FeatureRule::new("ReplaceMe"));
        assert!(engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
    }

    #[test]
    fn test_result_echoes_feature_key() {
        let engine = FeatureEngine::new();
        let result = engine.evaluate_feature(&Feature::new("KeyCheckFeature", true), &ctx()).unwrap();
        assert_eq!(result.feature_key, "KeyCheckFeature");
    }

    #[test]
    fn test_evaluator_errors_propagate() {
        let engine = FeatureEngine::with_builtin_evaluators();
        let feature = Feature::new("Broken", true)
            .with_rule(FeatureRule::new("Percentage").with_param("value", "many"));
        assert!(engine.evaluate_feature(&feature, &ctx()).is_err());
    }

    #[test]
    fn test_builtin_schedule_shares_engine_clock() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let engine = FeatureEngine::with_builtin_evaluators_and_clock(Arc::new(clock.clone()));
        let feature = Feature::new("Launch", true).with_rule(
            FeatureRule::new("schedule").with_param("from", "2025-06-01T09:00:00Z"),
        );

        assert!(engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
        clock.advance(Duration::seconds(-1));
        assert!(!engine.evaluate_feature(&feature, &ctx()).unwrap().enabled);
    }

    #[tokio::test]
    async fn test_async_trait_delegates() {
        let engine: Arc<dyn FeatureEvaluator> = Arc::new(FeatureEngine::new());
        let result = engine.evaluate(&Feature::new("Async", true), &ctx()).await.unwrap();
        assert!(result.enabled);
    }
}
