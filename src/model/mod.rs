//! Models for features, rules, evaluation contexts and rule parameters.

mod feature;
mod param;

pub use feature::{Feature, FeatureContext, FeatureRule, ANONYMOUS_USER};
pub use param::ParamValue;

pub(crate) use feature::{features_from_value, fold_case, get_ignore_case, json_kind};
