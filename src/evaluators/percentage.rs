//! Percentage rollout evaluator.
//!
//! Users are bucketed by hashing the feature key together with the user id, so
//! the same user lands in the same bucket on every call and in every process,
//! while different features bucket the same user independently.

use sha2::{Digest, Sha256};

use super::common::coerce_percentage;
use super::RuleEvaluator;
use crate::error::Result;
use crate::model::{FeatureContext, FeatureRule};

/// Registered name of the percentage evaluator.
pub const PERCENTAGE_RULE: &str = "Percentage";

/// Parameter holding the rollout percentage.
pub const VALUE_PARAM: &str = "value";

/// Enables a feature for a stable percentage of users.
///
/// Parameters:
/// - `value`: rollout percentage. Absent or `null` means "off". Values `>= 100`
///   always pass and values `<= 0` always fail.
///
/// # Example
///
/// ```
/// use flagwise::evaluators::{PercentageRuleEvaluator, RuleEvaluator};
/// use flagwise::model::{FeatureContext, FeatureRule};
///
/// let rule = FeatureRule::new("Percentage").with_param("value", 100);
/// let ctx = FeatureContext::new().with_user_id("alice");
/// assert!(PercentageRuleEvaluator.evaluate(&rule, &ctx, "NewCheckout").unwrap());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentageRuleEvaluator;

impl RuleEvaluator for PercentageRuleEvaluator {
    fn name(&self) -> &str {
        PERCENTAGE_RULE
    }

    fn evaluate(&self, rule: &FeatureRule, ctx: &FeatureContext, feature_key: &str) -> Result<bool> {
        let raw = match rule.param(VALUE_PARAM) {
            Some(value) if !value.is_null() => value,
            _ => return Ok(false),
        };

        let percentage = coerce_percentage(raw)?;
        Ok(i64::from(bucket(feature_key, ctx.discriminator())) < percentage)
    }
}

/// Assigns `(feature_key, discriminator)` to a bucket in `[0, 100)`.
///
/// SHA-256 of `"{feature_key}:{discriminator}"`, first four bytes read as a
/// little-endian `u32`, reduced modulo 100.
pub fn bucket(feature_key: &str, discriminator: &str) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(feature_key.as_bytes());
    hasher.update(b":");
    hasher.update(discriminator.as_bytes());
    let digest = hasher.finalize();

    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) % 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamValue;

    fn rule(value: impl Into<ParamValue>) -> FeatureRule {
        FeatureRule::new(PERCENTAGE_RULE).with_param(VALUE_PARAM, value)
    }

    fn user(id: &str) -> FeatureContext {
        FeatureContext::new().with_user_id(id)
    }

    #[test]
    fn test_known_buckets() {
        assert_eq!(bucket("NewCheckout", "alice"), 91);
        assert_eq!(bucket("NewCheckout", "bob"), 21);
        assert_eq!(bucket("NewCheckout", "anonymous"), 12);
        assert_eq!(bucket("Search", "alice"), 38);
    }

    #[test]
    fn test_bucket_threshold() {
        // bob sits in bucket 21
        assert!(!PercentageRuleEvaluator
            .evaluate(&rule(21), &user("bob"), "NewCheckout")
            .unwrap());
        assert!(PercentageRuleEvaluator
            .evaluate(&rule(22), &user("bob"), "NewCheckout")
            .unwrap());
    }

    #[test]
    fn test_missing_or_null_value_is_off() {
        let ctx = user("alice");
        assert!(!PercentageRuleEvaluator
            .evaluate(&FeatureRule::new(PERCENTAGE_RULE), &ctx, "NewCheckout")
            .unwrap());
        assert!(!PercentageRuleEvaluator
            .evaluate(&rule(ParamValue::Null), &ctx, "NewCheckout")
            .unwrap());
    }

    #[test]
    fn test_anonymous_context_uses_literal_discriminator() {
        // "anonymous" buckets to 12 for this key
        let anonymous = FeatureContext::anonymous();
        assert!(!PercentageRuleEvaluator
            .evaluate(&rule(12), &anonymous, "NewCheckout")
            .unwrap());
        assert!(PercentageRuleEvaluator
            .evaluate(&rule(13), &anonymous, "NewCheckout")
            .unwrap());
        assert_eq!(
            PercentageRuleEvaluator
                .evaluate(&rule(13), &anonymous, "NewCheckout")
                .unwrap(),
            PercentageRuleEvaluator
                .evaluate(&rule(13), &user("anonymous"), "NewCheckout")
                .unwrap()
        );
    }

    #[test]
    fn test_bounds_never_fail_loudly() {
        for id in ["alice", "bob", "carol", "dave"] {
            let ctx = user(id);
            assert!(PercentageRuleEvaluator.evaluate(&rule(100), &ctx, "F").unwrap());
            assert!(PercentageRuleEvaluator.evaluate(&rule(250), &ctx, "F").unwrap());
            assert!(!PercentageRuleEvaluator.evaluate(&rule(0), &ctx, "F").unwrap());
            assert!(!PercentageRuleEvaluator.evaluate(&rule(-10), &ctx, "F").unwrap());
        }
    }

    #[test]
    fn test_accepts_float_and_string_values() {
        let ctx = user("bob");
        assert!(PercentageRuleEvaluator
            .evaluate(&rule(21.6), &ctx, "NewCheckout")
            .unwrap());
        assert!(PercentageRuleEvaluator
            .evaluate(&rule("50"), &ctx, "NewCheckout")
            .unwrap());
    }

    #[test]
    fn test_non_numeric_value_is_an_error() {
        let err = PercentageRuleEvaluator
            .evaluate(&rule("most"), &user("alice"), "NewCheckout")
            .unwrap_err();
        assert_eq!(err.error_type, crate::error::ErrorType::InvalidParameter);
    }

    #[test]
    fn test_bucketing_is_key_scoped() {
        // alice: bucket 91 for NewCheckout, 38 for Search
        let ctx = user("alice");
        assert!(!PercentageRuleEvaluator
            .evaluate(&rule(50), &ctx, "NewCheckout")
            .unwrap());
        assert!(PercentageRuleEvaluator.evaluate(&rule(50), &ctx, "Search").unwrap());
    }

    #[test]
    fn test_distribution_is_not_degenerate() {
        let rule = rule(50);
        let enabled = (0..1000)
            .filter(|i| {
                PercentageRuleEvaluator
                    .evaluate(&rule, &user(&format!("user-{}", i)), "Rollout")
                    .unwrap()
            })
            .count();

        assert!(enabled > 0 && enabled < 1000);
        assert!((400..=600).contains(&enabled), "enabled = {}", enabled);
    }
}
