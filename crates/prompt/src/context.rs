//! Context-map builders for the two template classes the pipeline renders:
//! the cleaner template and the function-caller template (§4.3).

use lumen_domain::error::Result;
use lumen_domain::model::{CalledFunction, MirroredCustomer};
use lumen_domain::tool::ToolDefinition;
use std::collections::HashMap;

/// Render a cleaned-history window as `Speaker: cleaned_text` lines, one per
/// turn, in sequence order.
fn render_history(turns: &[(String, String)]) -> String {
    turns
        .iter()
        .map(|(speaker, text)| format!("{speaker}: {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the context map for the cleaner template.
pub fn cleaner_context(
    call_context: &MirroredCustomer,
    conversation_window: &[(String, String)],
    raw_text: &str,
) -> Result<HashMap<String, String>> {
    let mut ctx = HashMap::new();
    ctx.insert(
        "call_context".to_string(),
        serde_json::to_string(call_context)?,
    );
    ctx.insert(
        "conversation_context".to_string(),
        render_history(conversation_window),
    );
    ctx.insert("raw_text".to_string(), raw_text.to_string());
    Ok(ctx)
}

/// Render the recent function-call history as one line per call.
fn render_function_calls(calls: &[CalledFunction]) -> String {
    calls
        .iter()
        .map(|c| {
            let args = serde_json::to_string(&c.parameters).unwrap_or_default();
            format!("{}({}) -> executed={}", c.function_name, args, c.executed)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the advertised tool catalogue as `name: description` lines, for
/// templates that describe available tools in prose as well as passing
/// their schemas to the LLM Gateway directly.
fn render_tool_catalogue(tools: &[ToolDefinition]) -> String {
    tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the context map for the function-caller template.
pub fn function_caller_context(
    customer: &MirroredCustomer,
    previous_cleaned_turns: &[(String, String)],
    previous_function_calls: &[CalledFunction],
    current_cleaned_turn: &str,
    tool_catalogue: &[ToolDefinition],
) -> Result<HashMap<String, String>> {
    let mut ctx = HashMap::new();
    ctx.insert(
        "customer_profile".to_string(),
        serde_json::to_string(customer)?,
    );
    ctx.insert(
        "previous_cleaned_turns".to_string(),
        render_history(previous_cleaned_turns),
    );
    ctx.insert(
        "previous_function_calls".to_string(),
        render_function_calls(previous_function_calls),
    );
    ctx.insert(
        "current_cleaned_turn".to_string(),
        current_cleaned_turn.to_string(),
    );
    ctx.insert("tool_catalogue".to_string(), render_tool_catalogue(tool_catalogue));
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn cleaner_context_has_required_keys() {
        let customer = MirroredCustomer::new_at(Utc::now());
        let ctx = cleaner_context(&customer, &[("User".into(), "hi".into())], "hii").unwrap();
        assert!(ctx.contains_key("call_context"));
        assert!(ctx.contains_key("conversation_context"));
        assert_eq!(ctx.get("raw_text").unwrap(), "hii");
    }

    #[test]
    fn function_caller_context_has_required_keys() {
        let customer = MirroredCustomer::new_at(Utc::now());
        let ctx = function_caller_context(&customer, &[], &[], "cleaned text", &[]).unwrap();
        for key in [
            "customer_profile",
            "previous_cleaned_turns",
            "previous_function_calls",
            "current_cleaned_turn",
            "tool_catalogue",
        ] {
            assert!(ctx.contains_key(key), "missing key {key}");
        }
    }
}
