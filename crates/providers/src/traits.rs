//! The LLM gateway's provider-agnostic request/response contract.
//!
//! Both operations take a single pre-rendered prompt string — prompt
//! assembly is the prompt renderer's job, not the gateway's — and return
//! token usage and wall-clock latency alongside the result so callers can
//! attribute cost without a second round trip.

use lumen_domain::config::GenerationParams;
use lumen_domain::tool::{ArgMap, ToolDefinition};
use lumen_domain::usage::Usage;

use crate::error::GatewayError;

type Result<T> = std::result::Result<T, GatewayError>;

/// Result of a plain text-completion call (the cleaner's request shape).
#[derive(Debug, Clone)]
pub struct GenerateTextResult {
    pub text: String,
    pub token_usage: Usage,
    pub latency_ms: u64,
}

/// A single function invocation the model chose to make.
#[derive(Debug, Clone)]
pub struct ProviderToolCall {
    pub name: String,
    pub arguments: ArgMap,
}

/// Result of a tool-calling completion (the function caller's request shape).
#[derive(Debug, Clone)]
pub struct GenerateWithToolsResult {
    pub text: Option<String>,
    pub tool_calls: Vec<ProviderToolCall>,
    pub token_usage: Usage,
    pub latency_ms: u64,
}

/// The single seam every concrete upstream adapter implements.
///
/// Implementations never retry internally — retry/backoff/timeout policy
/// lives one layer up, in the caller, so every attempt stays individually
/// observable.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Plain text generation, used by the transcript cleaner.
    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerateTextResult>;

    /// Tool-calling generation, used by the function caller.
    async fn generate_with_tools(
        &self,
        prompt: &str,
        tool_schemas: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<GenerateWithToolsResult>;
}
