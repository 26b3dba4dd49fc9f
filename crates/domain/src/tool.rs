//! Tool-call wire schema shared between the LLM Gateway and the Function
//! Registry & Executor.
//!
//! Vendor tool-calling APIs return arguments in assorted shapes (JSON
//! objects, stringly-typed numbers, nested lists). The gateway normalizes
//! all of that into [`ArgValue`] before anything downstream ever sees it, so
//! the function executor only ever deals with native scalars, lists of
//! scalars, and booleans.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flattened tool-call argument value.
///
/// Unknown or unrepresentable JSON shapes (objects, null) coerce to their
/// string form rather than being rejected, per the structured-argument
/// parsing contract: the gateway is permissive on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Flatten an arbitrary JSON value coming off the wire into an
    /// [`ArgValue`]. Objects and null coerce to their string representation.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => ArgValue::Bool(*b),
            serde_json::Value::Number(n) => {
                ArgValue::Number(n.as_f64().unwrap_or_default())
            }
            serde_json::Value::String(s) => ArgValue::Str(s.clone()),
            serde_json::Value::Array(items) => {
                ArgValue::List(items.iter().map(ArgValue::from_json).collect())
            }
            serde_json::Value::Null => ArgValue::Str(String::new()),
            serde_json::Value::Object(_) => ArgValue::Str(value.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render as a display string regardless of underlying type, for
    /// contexts (logging, persistence of raw parameters) that want text.
    pub fn to_display_string(&self) -> String {
        match self {
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Number(n) => n.to_string(),
            ArgValue::Str(s) => s.clone(),
            ArgValue::List(items) => items
                .iter()
                .map(ArgValue::to_display_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Map of flattened tool-call arguments, keyed by parameter name.
pub type ArgMap = HashMap<String, ArgValue>;

/// Flatten a whole JSON object of tool-call arguments into an [`ArgMap`].
/// Non-object input (a malformed vendor response) yields an empty map.
pub fn flatten_arguments(value: &serde_json::Value) -> ArgMap {
    match value.as_object() {
        Some(obj) => obj
            .iter()
            .map(|(k, v)| (k.clone(), ArgValue::from_json(v)))
            .collect(),
        None => ArgMap::new(),
    }
}

/// A single tool call returned by the function-caller stage, normalized
/// into the wire schema described in the external interfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: ArgMap,
}

/// A declared tool signature advertised to the LLM for structured
/// invocation. `parameters` is a JSON-Schema-subset object: typed,
/// optionally enumerated properties plus a required list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_scalars() {
        let args = flatten_arguments(&json!({
            "field_to_update": "job_title",
            "new_value": "Director of Marketing",
        }));
        assert_eq!(
            args.get("field_to_update").and_then(ArgValue::as_str),
            Some("job_title")
        );
    }

    #[test]
    fn flattens_list_of_strings() {
        let args = flatten_arguments(&json!({
            "channels": ["facebook", "google ads"],
        }));
        match args.get("channels").unwrap() {
            ArgValue::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].as_str(), Some("facebook"));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn unknown_shapes_coerce_to_string() {
        let args = flatten_arguments(&json!({
            "nested": {"weird": true},
            "missing": null,
        }));
        assert!(args.get("nested").unwrap().as_str().unwrap().contains("weird"));
        assert_eq!(args.get("missing").unwrap().as_str(), Some(""));
    }

    #[test]
    fn non_object_input_yields_empty_map() {
        let args = flatten_arguments(&json!("not an object"));
        assert!(args.is_empty());
    }
}
