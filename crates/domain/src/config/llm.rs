use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM Gateway configuration — a single flash-class model family.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// A specific flash-class model identifier (`LLM_MODEL_NAME`).
    #[serde(default = "d_model_name")]
    pub model_name: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub params: GenerationParams,
    /// Pricing used for cost accounting; required for auditability.
    #[serde(default)]
    pub pricing: ModelPricing,
    #[serde(default = "d_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Maximum retry attempts for transient failures (transport, 429, 5xx).
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_name: d_model_name(),
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            params: GenerationParams::default(),
            pricing: ModelPricing::default(),
            call_timeout_secs: d_call_timeout_secs(),
            max_retries: d_max_retries(),
        }
    }
}

fn d_model_name() -> String {
    "gemini-2.0-flash".into()
}
fn d_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn d_api_key_env() -> String {
    "LLM_API_KEY".into()
}
fn d_call_timeout_secs() -> u64 {
    30
}
fn d_max_retries() -> u32 {
    3
}

/// Generation parameters applied to both `generate_text` and
/// `generate_with_tools` calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "d_temperature")]
    pub temperature: f64,
    #[serde(default = "d_top_p")]
    pub top_p: f64,
    #[serde(default = "d_top_k")]
    pub top_k: u32,
    #[serde(default = "d_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: d_temperature(),
            top_p: d_top_p(),
            top_k: d_top_k(),
            max_output_tokens: d_max_output_tokens(),
        }
    }
}

fn d_temperature() -> f64 {
    0.1
}
fn d_top_p() -> f64 {
    0.95
}
fn d_top_k() -> u32 {
    40
}
fn d_max_output_tokens() -> u32 {
    2048
}

/// Pricing per million tokens for the configured model. Cost is
/// `input/1e6 * input_per_1m + output/1e6 * output_per_1m`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

impl Default for ModelPricing {
    fn default() -> Self {
        // Matches the distilled source's configuration-derived figures;
        // always overridden by LLM_INPUT_COST_PER_MTOKEN / LLM_OUTPUT_COST_PER_MTOKEN
        // in a real deployment.
        Self {
            input_per_1m: 0.10,
            output_per_1m: 0.40,
        }
    }
}

impl ModelPricing {
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_1m + output_tokens as f64 * self.output_per_1m)
            / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_pricing_estimate_cost() {
        let pricing = ModelPricing {
            input_per_1m: 2.50,
            output_per_1m: 10.00,
        };
        let cost = pricing.estimate_cost(1000, 500);
        assert!((cost - 0.0075).abs() < 1e-10);
    }

    #[test]
    fn model_pricing_zero_tokens() {
        let pricing = ModelPricing {
            input_per_1m: 5.00,
            output_per_1m: 15.00,
        };
        assert!((pricing.estimate_cost(0, 0) - 0.0).abs() < 1e-10);
    }

    #[test]
    fn llm_config_default_has_nonzero_pricing() {
        let config = LlmConfig::default();
        assert!(config.pricing.input_per_1m > 0.0);
        assert!(config.pricing.output_per_1m > 0.0);
    }

    #[test]
    fn llm_config_deserializes_partial() {
        let json = r#"{"model_name": "gemini-2.0-flash-lite"}"#;
        let config: LlmConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.model_name, "gemini-2.0-flash-lite");
        assert_eq!(config.max_retries, 3);
    }
}
