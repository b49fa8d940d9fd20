//! Time-window evaluator.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::common::parse_timestamp;
use super::RuleEvaluator;
use crate::clock::{system_clock, Clock};
use crate::error::Result;
use crate::model::{FeatureContext, FeatureRule};

/// Registered name of the schedule evaluator.
pub const SCHEDULE_RULE: &str = "Schedule";

/// Enables a feature while the current UTC time is inside `[from, to]`.
///
/// Parameters:
/// - `from`: ISO-8601 start, inclusive. Absent means the earliest instant.
/// - `to`: ISO-8601 end, inclusive. Absent means the latest instant.
///
/// A present bound that is not a valid timestamp string fails the evaluation.
#[derive(Debug, Clone)]
pub struct ScheduleRuleEvaluator {
    clock: Arc<dyn Clock>,
}

impl ScheduleRuleEvaluator {
    /// Creates an evaluator reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Creates an evaluator reading the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn bound(rule: &FeatureRule, name: &str, default: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match rule.param(name) {
            Some(value) => parse_timestamp(value),
            None => Ok(default),
        }
    }
}

impl Default for ScheduleRuleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEvaluator for ScheduleRuleEvaluator {
    fn name(&self) -> &str {
        SCHEDULE_RULE
    }

    fn evaluate(&self, rule: &FeatureRule, _ctx: &FeatureContext, _feature_key: &str) -> Result<bool> {
        let from = Self::bound(rule, "from", DateTime::<Utc>::MIN_UTC)?;
        let to = Self::bound(rule, "to", DateTime::<Utc>::MAX_UTC)?;

        let now = self.clock.now();
        Ok(from <= now && now <= to)
    }
}
