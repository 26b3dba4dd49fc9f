//! The function registry: a tagged-variant map from function name to its
//! advertised schema and handler, constructed once and held as immutable
//! process-global state.

use crate::catalogue;
use crate::error::FunctionError;
use lumen_domain::model::MirroredCustomer;
use lumen_domain::tool::{ArgMap, ToolDefinition};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;

type Handler = fn(&ArgMap, &mut MirroredCustomer) -> Result<Value, FunctionError>;

struct FunctionEntry {
    schema: ToolDefinition,
    handler: Handler,
}

/// The outcome of one `execute` call, matching the execution contract:
/// `{success, result|error, processing_time_ms}`.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

/// Immutable, `Arc`-held registry of the five declared functions.
pub struct FunctionRegistry {
    entries: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    /// Build the closed catalogue. There is no dynamic registration path —
    /// the set of callable names is fixed at compile time.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "update_profile_field".to_string(),
            FunctionEntry {
                schema: update_profile_field_schema(),
                handler: catalogue::update_profile_field,
            },
        );
        entries.insert(
            "log_metric".to_string(),
            FunctionEntry {
                schema: log_metric_schema(),
                handler: catalogue::log_metric,
            },
        );
        entries.insert(
            "record_business_insight".to_string(),
            FunctionEntry {
                schema: record_business_insight_schema(),
                handler: catalogue::record_business_insight,
            },
        );
        entries.insert(
            "log_marketing_channels".to_string(),
            FunctionEntry {
                schema: log_marketing_channels_schema(),
                handler: catalogue::log_marketing_channels,
            },
        );
        entries.insert(
            "initiate_demo_creation".to_string(),
            FunctionEntry {
                schema: initiate_demo_creation_schema(),
                handler: catalogue::initiate_demo_creation,
            },
        );
        Self { entries }
    }

    /// The tool schemas advertised to the LLM Gateway, derived from the same
    /// declarations used for parameter validation below.
    pub fn tool_schemas(&self) -> Vec<ToolDefinition> {
        self.entries.values().map(|e| e.schema.clone()).collect()
    }

    /// Apply a named function to `customer`. Unknown names and argument
    /// mismatches are recorded as a failed outcome, never a `Result::Err` —
    /// the pipeline persists a failed `CalledFunction` rather than failing
    /// the whole turn.
    pub fn execute(
        &self,
        function_name: &str,
        parameters: &ArgMap,
        customer: &mut MirroredCustomer,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let Some(entry) = self.entries.get(function_name) else {
            return ExecutionOutcome {
                success: false,
                result: Value::Null,
                error: Some(format!("unknown function: {function_name}")),
                processing_time_ms: started.elapsed().as_millis() as u64,
            };
        };

        match (entry.handler)(parameters, customer) {
            Ok(result) => ExecutionOutcome {
                success: true,
                result,
                error: None,
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
            Err(e) => ExecutionOutcome {
                success: false,
                result: Value::Null,
                error: Some(e.to_string()),
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn update_profile_field_schema() -> ToolDefinition {
    ToolDefinition {
        name: "update_profile_field".into(),
        description: "Set a top-level attribute on the customer profile.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "field": {
                    "type": "string",
                    "enum": ["user_name", "job_title", "company_name", "company_description", "company_size", "company_sector"],
                },
                "new_value": {"type": "string"},
            },
            "required": ["field", "new_value"],
        }),
    }
}

fn log_metric_schema() -> ToolDefinition {
    ToolDefinition {
        name: "log_metric".into(),
        description: "Record a business metric as a raw string (ranges/estimates allowed).".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "metric_name": {
                    "type": "string",
                    "enum": ["monthly_website_visitors", "monthly_inbound_calls", "monthly_form_submissions"],
                },
                "value_string": {"type": "string"},
            },
            "required": ["metric_name", "value_string"],
        }),
    }
}

fn record_business_insight_schema() -> ToolDefinition {
    ToolDefinition {
        name: "record_business_insight".into(),
        description: "Append a categorized business insight.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["CHALLENGE", "GOAL", "MOTIVATION", "STRENGTH"],
                },
                "insight_details": {"type": "string"},
            },
            "required": ["category", "insight_details"],
        }),
    }
}

fn log_marketing_channels_schema() -> ToolDefinition {
    ToolDefinition {
        name: "log_marketing_channels".into(),
        description: "Union a list of marketing channels into the customer profile.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "channels": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["channels"],
        }),
    }
}

fn initiate_demo_creation_schema() -> ToolDefinition {
    ToolDefinition {
        name: "initiate_demo_creation".into(),
        description: "Mark demo creation as initiated. Idempotent.".into(),
        parameters: json!({
            "type": "object",
            "properties": {},
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lumen_domain::tool::ArgValue;

    #[test]
    fn tool_schemas_cover_all_five_functions() {
        let registry = FunctionRegistry::new();
        let names: Vec<String> = registry.tool_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"initiate_demo_creation".to_string()));
    }

    #[test]
    fn execute_unknown_function_fails_without_erroring() {
        let registry = FunctionRegistry::new();
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let outcome = registry.execute("delete_everything", &ArgMap::new(), &mut customer);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("unknown function"));
    }

    #[test]
    fn execute_known_function_mutates_customer() {
        let registry = FunctionRegistry::new();
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let mut args = ArgMap::new();
        args.insert("field".into(), ArgValue::Str("company_name".into()));
        args.insert("new_value".into(), ArgValue::Str("Acme Inc.".into()));
        let outcome = registry.execute("update_profile_field", &args, &mut customer);
        assert!(outcome.success);
        assert_eq!(customer.company_name.as_deref(), Some("Acme Inc."));
    }

    #[test]
    fn execute_schema_mismatch_fails_without_erroring() {
        let registry = FunctionRegistry::new();
        let mut customer = MirroredCustomer::new_at(Utc::now());
        let outcome = registry.execute("log_metric", &ArgMap::new(), &mut customer);
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
