//! Parsing of hand-edited feature documents.
//!
//! Feature files are written by people, so on top of strict JSON this accepts
//! `//` line comments, `/* */` block comments, trailing commas and property
//! names in any letter case.

use serde_json::Value;

use crate::error::{FlagError, Result};
use crate::model::{features_from_value, get_ignore_case, json_kind, Feature};

/// Name of the top-level array holding the features.
const FEATURES_PROPERTY: &str = "Features";

/// Parses a `{ "Features": [...] }` document.
///
/// A document without a features array, or the literal `null`, has no
/// features.
///
/// # Example
///
/// ```
/// use flagwise::storage::parse_features_document;
///
/// let features = parse_features_document(r#"{
///     // rolled out last week
///     "features": [
///         { "key": "Search", "enabled": true, },
///     ],
/// }"#).unwrap();
/// assert_eq!(features[0].key, "Search");
/// ```
pub fn parse_features_document(text: &str) -> Result<Vec<Feature>> {
    let cleaned = strip_trailing_commas(&strip_comments(text)?);
    let document: Value = serde_json::from_str(&cleaned)
        .map_err(|e| FlagError::parse_error(format!("Invalid feature document: {}", e)))?;

    match &document {
        Value::Object(root) => {
            features_from_value(get_ignore_case(root, FEATURES_PROPERTY).unwrap_or(&Value::Null))
        }
        Value::Null => Ok(Vec::new()),
        other => Err(FlagError::parse_error(format!(
            "Feature document must be an object, got {}",
            json_kind(other)
        ))),
    }
}

/// Removes comments outside string literals. Newlines inside comments are
/// kept so parse errors still point at the right line.
fn strip_comments(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }

        if c != '/' {
            out.push(c);
            continue;
        }

        match chars.clone().next() {
            Some('/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            Some('*') => {
                chars.next();
                let mut previous = '\0';
                let mut closed = false;
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        closed = true;
                        break;
                    }
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    previous = skipped;
                }
                if !closed {
                    return Err(FlagError::parse_error("Unterminated block comment"));
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Drops commas that are followed only by whitespace before `}` or `]`.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}
