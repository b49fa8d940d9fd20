//! Feature, rule and context models.
//!
//! Stores build [`Feature`] values from their backing data on every read;
//! callers build a [`FeatureContext`] per evaluation request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::ParamValue;
use crate::error::{FlagError, Result};
use crate::evaluators::parse_iso8601;

/// Discriminator used for bucketing when a context carries no user id.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Canonical case-folded form of a feature key, rule name or group name.
pub(crate) fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// A named on/off gate with optional rules and an optional expiry.
///
/// A feature whose `enabled` switch is off is disabled regardless of its rules,
/// and a feature past `expires_at` is disabled regardless of rule outcomes.
///
/// # Example
///
/// ```
/// use flagwise::model::{Feature, FeatureRule};
///
/// let feature = Feature::new("NewCheckout", true)
///     .with_rule(FeatureRule::new("Percentage").with_param("value", 25));
///
/// assert!(feature.matches_key("newcheckout"));
/// assert_eq!(feature.rules.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Unique, case-insensitive identifier
    pub key: String,

    /// Base switch
    #[serde(default, alias = "isEnabled")]
    pub enabled: bool,

    /// Rules evaluated in declaration order
    #[serde(default)]
    pub rules: Vec<FeatureRule>,

    /// Instant after which the feature is always disabled. Accepts the same
    /// ISO-8601 forms as schedule bounds.
    #[serde(
        default,
        deserialize_with = "deserialize_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Feature {
    /// Creates a feature with no rules and no expiry.
    pub fn new(key: impl Into<String>, enabled: bool) -> Self {
        Self {
            key: key.into(),
            enabled,
            rules: Vec::new(),
            expires_at: None,
        }
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: FeatureRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Replaces the rule list.
    pub fn with_rules(mut self, rules: Vec<FeatureRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the expiry instant.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Case-insensitive key comparison.
    pub fn matches_key(&self, key: &str) -> bool {
        self.key == key || fold_case(&self.key) == fold_case(key)
    }

    /// Returns `true` if the feature has an expiry strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Deserializes a feature from a JSON value, ignoring property-name case.
    ///
    /// Parameter names inside rules keep their case; only the property names
    /// of the feature and rule records are folded.
    pub fn from_value(value: &Value) -> Result<Self> {
        let normalized = normalize_feature(value);
        serde_json::from_value(normalized)
            .map_err(|e| FlagError::parse_error(format!("Failed to parse feature: {}", e)))
    }
}

fn deserialize_expiry<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_iso8601(&raw).map_err(|e| serde::de::Error::custom(e.message)))
        .transpose()
}

/// A named, parameterized condition attached to a feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRule {
    /// Name of the evaluator that handles this rule, matched case-insensitively
    pub rule_name: String,

    /// Evaluator-specific parameters
    #[serde(default)]
    pub parameters: HashMap<String, ParamValue>,
}

impl FeatureRule {
    /// Creates a rule with no parameters.
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            parameters: HashMap::new(),
        }
    }

    /// Adds or replaces a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Looks up a parameter by exact name.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }
}

/// Request-scoped evaluation context.
///
/// # Example
///
/// ```
/// use flagwise::model::FeatureContext;
///
/// let ctx = FeatureContext::new()
///     .with_user_id("alice")
///     .with_group("Beta");
/// assert_eq!(ctx.discriminator(), "alice");
/// assert_eq!(FeatureContext::anonymous().discriminator(), "anonymous");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureContext {
    /// Identifier of the user, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Groups the user belongs to; order is irrelevant
    #[serde(default)]
    pub groups: Vec<String>,

    /// Free-form properties for custom evaluators
    #[serde(default)]
    pub properties: HashMap<String, ParamValue>,
}

impl FeatureContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with no user and no groups.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Adds a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Adds several groups.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Adds or replaces a property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The string used to bucket this context: the user id, or `"anonymous"`.
    pub fn discriminator(&self) -> &str {
        self.user_id.as_deref().unwrap_or(ANONYMOUS_USER)
    }
}

/// Maps a case-folded property name to the name serde expects.
fn canonical_feature_property(name: &str) -> Option<&'static str> {
    match fold_case(name).as_str() {
        "key" => Some("key"),
        "enabled" | "isenabled" => Some("enabled"),
        "rules" => Some("rules"),
        "expiresat" => Some("expiresAt"),
        _ => None,
    }
}

fn canonical_rule_property(name: &str) -> Option<&'static str> {
    match fold_case(name).as_str() {
        "rulename" => Some("ruleName"),
        "parameters" => Some("parameters"),
        _ => None,
    }
}

/// Renames properties to their canonical names.
///
/// When several properties map to the same name, one spelled like the
/// canonical name (ignoring case) wins over an alias, so `enabled` beats
/// `isEnabled` whatever their order in the document.
fn rename_properties(
    obj: &Map<String, Value>,
    canonical: fn(&str) -> Option<&'static str>,
) -> Map<String, Value> {
    let mut renamed = Map::new();
    let mut from_alias = Vec::new();
    for (name, value) in obj {
        match canonical(name) {
            Some(target) if fold_case(name) == fold_case(target) => {
                renamed.insert(target.to_string(), value.clone());
            }
            Some(target) => from_alias.push((target, value)),
            None => {
                renamed.insert(name.clone(), value.clone());
            }
        }
    }
    for (target, value) in from_alias {
        renamed
            .entry(target.to_string())
            .or_insert_with(|| value.clone());
    }
    renamed
}

fn normalize_feature(value: &Value) -> Value {
    let Value::Object(obj) = value else {
        return value.clone();
    };

    let mut feature = rename_properties(obj, canonical_feature_property);
    if let Some(Value::Array(rules)) = feature.get("rules") {
        let rules = rules
            .iter()
            .map(|rule| match rule {
                Value::Object(rule) => {
                    Value::Object(rename_properties(rule, canonical_rule_property))
                }
                other => other.clone(),
            })
            .collect();
        feature.insert("rules".to_string(), Value::Array(rules));
    }
    Value::Object(feature)
}

/// Finds a property of a JSON object ignoring case.
pub(crate) fn get_ignore_case<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).or_else(|| {
        let folded = fold_case(name);
        obj.iter()
            .find(|(key, _)| fold_case(key) == folded)
            .map(|(_, value)| value)
    })
}

/// Materializes a list of features from a JSON array.
///
/// `Null` yields an empty list; anything other than an array is a parse error.
pub(crate) fn features_from_value(value: &Value) -> Result<Vec<Feature>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(Feature::from_value).collect(),
        other => Err(FlagError::parse_error(format!(
            "Features must be an array, found {}",
            json_kind(other)
        ))),
    }
}

/// Human-readable JSON type name for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
