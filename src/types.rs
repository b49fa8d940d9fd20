//! Evaluation result type.
//!
//! The verdict is the only externally observable evaluation output; it carries
//! no rule-level detail.

use serde::{Deserialize, Serialize};

/// The result of evaluating one feature for one context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Key of the evaluated feature, as stored (or as requested when absent)
    pub feature_key: String,

    /// Final verdict
    pub enabled: bool,
}

impl EvaluationResult {
    /// Creates a result.
    pub fn new(feature_key: impl Into<String>, enabled: bool) -> Self {
        Self {
            feature_key: feature_key.into(),
            enabled,
        }
    }

    /// Creates a disabled result, used for features no store knows about.
    pub fn disabled(feature_key: impl Into<String>) -> Self {
        Self::new(feature_key, false)
    }

    /// Serializes the result to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"featureKey":null,"enabled":false,"error":"Serialization failed: {}"}}"#,
                e
            )
        })
    }
}
