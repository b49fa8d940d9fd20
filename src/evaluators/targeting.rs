//! User and group targeting evaluator.

use super::common::case_insensitive_set;
use super::percentage::{PercentageRuleEvaluator, PERCENTAGE_RULE, VALUE_PARAM};
use super::RuleEvaluator;
use crate::error::Result;
use crate::model::{fold_case, FeatureContext, FeatureRule, ParamValue};

/// Registered name of the targeting evaluator.
pub const TARGETING_RULE: &str = "Targeting";

/// Enables a feature for listed users or groups, with an optional rollout
/// fallback.
///
/// Checked in order, stopping at the first match:
/// 1. `users`: list of user ids; matches `ctx.user_id`.
/// 2. `groups`: list of group names; matches any of `ctx.groups`.
/// 3. `defaultRolloutPercentage`: when set, the verdict of a percentage
///    rollout with that value.
///
/// Names compare case-insensitively. Without any of the three parameters the
/// rule fails.
///
/// # Example
///
/// ```
/// use flagwise::evaluators::{RuleEvaluator, TargetingRuleEvaluator};
/// use flagwise::model::{FeatureContext, FeatureRule};
///
/// let rule = FeatureRule::new("Targeting").with_param("groups", vec!["beta"]);
/// let ctx = FeatureContext::new().with_user_id("carol").with_group("BETA");
/// assert!(TargetingRuleEvaluator::default().evaluate(&rule, &ctx, "Search").unwrap());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetingRuleEvaluator {
    rollout: PercentageRuleEvaluator,
}

impl TargetingRuleEvaluator {
    fn list_param<'a>(rule: &'a FeatureRule, name: &str) -> Option<&'a [ParamValue]> {
        rule.param(name).and_then(ParamValue::as_list)
    }
}

impl RuleEvaluator for TargetingRuleEvaluator {
    fn name(&self) -> &str {
        TARGETING_RULE
    }

    fn evaluate(&self, rule: &FeatureRule, ctx: &FeatureContext, feature_key: &str) -> Result<bool> {
        if let Some(users) = Self::list_param(rule, "users") {
            let users = case_insensitive_set(users);
            if let Some(user_id) = ctx.user_id.as_deref() {
                if users.contains(&fold_case(user_id)) {
                    return Ok(true);
                }
            }
        }

        if let Some(groups) = Self::list_param(rule, "groups") {
            let groups = case_insensitive_set(groups);
            if ctx.groups.iter().any(|group| groups.contains(&fold_case(group))) {
                return Ok(true);
            }
        }

        match rule.param("defaultRolloutPercentage") {
            Some(percentage) if !percentage.is_null() => {
                let rollout = FeatureRule::new(PERCENTAGE_RULE).with_param(VALUE_PARAM, percentage.clone());
                self.rollout.evaluate(&rollout, ctx, feature_key)
            }
            _ => Ok(false),
        }
    }
}
