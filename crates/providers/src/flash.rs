//! The concrete flash-class adapter.
//!
//! Implements a Gemini-compatible `generateContent` call over HTTP. Auth is
//! via an API key passed as a query parameter (`key={api_key}`).

use crate::auth::resolve_api_key;
use crate::error::GatewayError;
use crate::traits::{GenerateTextResult, GenerateWithToolsResult, LlmProvider, ProviderToolCall};
use crate::util::from_reqwest;
use lumen_domain::config::{GenerationParams, LlmConfig};
use lumen_domain::error::Result as DomainResult;
use lumen_domain::tool::{flatten_arguments, ToolDefinition};
use lumen_domain::usage::Usage;
use serde_json::Value;
use std::time::{Duration, Instant};

type Result<T> = std::result::Result<T, GatewayError>;

/// An LLM provider adapter for the configured flash-class model family.
pub struct FlashProvider {
    base_url: String,
    model_name: String,
    api_key: String,
    client: reqwest::Client,
}

impl FlashProvider {
    /// Build the adapter from the gateway's LLM configuration, resolving the
    /// API key from the environment eagerly so construction fails fast.
    pub fn from_config(cfg: &LlmConfig) -> DomainResult<Self> {
        let api_key = resolve_api_key(&cfg.api_key_env)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.call_timeout_secs))
            .build()
            .map_err(|e| lumen_domain::Error::Config(e.to_string()))?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model_name: cfg.model_name.clone(),
            api_key,
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model_name, self.api_key
        )
    }

    fn build_body(&self, prompt: &str, tools: &[ToolDefinition], params: &GenerationParams) -> Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}],
            }],
            "generationConfig": {
                "temperature": params.temperature,
                "topP": params.top_p,
                "topK": params.top_k,
                "maxOutputTokens": params.max_output_tokens,
            },
        });

        if !tools.is_empty() {
            let function_declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = serde_json::json!([{
                "functionDeclarations": function_declarations,
            }]);
        }

        body
    }

    async fn call(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = if status.as_u16() == 429 {
                GatewayError::QuotaExceeded(text)
            } else if status.as_u16() == 401 || status.as_u16() == 403 {
                GatewayError::AuthRejected(text)
            } else if status.is_server_error() {
                GatewayError::Transient(format!("{status}: {text}"))
            } else {
                GatewayError::InvalidResponse(format!("{status}: {text}"))
            };
            return Err(err);
        }

        response.json::<Value>().await.map_err(from_reqwest)
    }
}

#[async_trait::async_trait]
impl LlmProvider for FlashProvider {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GenerateTextResult> {
        let started = Instant::now();
        let body = self.build_body(prompt, &[], params);
        let response = self.call(body).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = extract_text(&response)?;
        let token_usage = extract_usage(&response);

        Ok(GenerateTextResult {
            text,
            token_usage,
            latency_ms,
        })
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        tool_schemas: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<GenerateWithToolsResult> {
        let started = Instant::now();
        let body = self.build_body(prompt, tool_schemas, params);
        let response = self.call(body).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let candidate = first_candidate(&response)?;
        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array());

        let mut text_content = String::new();
        let mut tool_calls = Vec::new();

        if let Some(parts) = parts {
            for part in parts {
                if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                    text_content.push_str(text);
                }
                if let Some(fc) = part.get("functionCall") {
                    let name = fc
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let arguments = fc
                        .get("args")
                        .map(flatten_arguments)
                        .unwrap_or_default();
                    tool_calls.push(ProviderToolCall { name, arguments });
                }
            }
        }

        let token_usage = extract_usage(&response);
        let text = if text_content.is_empty() {
            None
        } else {
            Some(text_content)
        };

        Ok(GenerateWithToolsResult {
            text,
            tool_calls,
            token_usage,
            latency_ms,
        })
    }
}

fn first_candidate(body: &Value) -> Result<&Value> {
    body.get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| GatewayError::InvalidResponse("no candidates in flash-class response".into()))
}

fn extract_text(body: &Value) -> Result<String> {
    let candidate = first_candidate(body)?;
    let text = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|v| v.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

fn extract_usage(body: &Value) -> Usage {
    let Some(meta) = body.get("usageMetadata") else {
        return Usage::ZERO;
    };
    let input = meta
        .get("promptTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let output = meta
        .get("candidatesTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    Usage::new(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_from_parts() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "hello "}, {"text": "world"}]},
            }],
        });
        assert_eq!(extract_text(&body).unwrap(), "hello world");
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let body = serde_json::json!({});
        assert!(extract_text(&body).is_err());
    }

    #[test]
    fn extracts_usage_when_present() {
        let body = serde_json::json!({
            "usageMetadata": {"promptTokenCount": 42, "candidatesTokenCount": 8},
        });
        let usage = extract_usage(&body);
        assert_eq!(usage.input, 42);
        assert_eq!(usage.output, 8);
    }

    #[test]
    fn missing_usage_metadata_yields_zero() {
        let body = serde_json::json!({});
        assert_eq!(extract_usage(&body), Usage::ZERO);
    }
}
