//! The data model: Turn, CleanedTurn, CalledFunction, Evaluation, and the
//! MirroredCustomer profile snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An immutable record of one utterance, produced by upstream ingest and
/// never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: String,
    pub conversation_id: String,
    /// Free-form; canonically `User`, `Lumen`, `AI`, or `Assistant`.
    pub speaker: String,
    pub raw_text: String,
    /// Monotonically increasing within a conversation.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Whether this turn's speaker is an assistant-side speaker that should
    /// be passed through with no LLM processing.
    pub fn is_bypass_speaker(&self) -> bool {
        matches!(
            self.speaker.to_ascii_lowercase().as_str(),
            "lumen" | "ai" | "assistant"
        )
    }

    pub fn is_user_speaker(&self) -> bool {
        self.speaker.eq_ignore_ascii_case("user")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CleanedTurn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceScore {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningLevel {
    None,
    Light,
    Full,
}

/// One correction applied during the cleaning stage. The shape is an
/// observable external contract and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
    pub confidence: ConfidenceScore,
    pub reason: String,
}

/// The path the classifier routed a turn through; recorded for
/// observability and embedded in `context_detected` when no richer tag is
/// available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPath {
    Bypass,
    Skip,
    FastClean,
    Process,
}

impl std::fmt::Display for ClassificationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassificationPath::Bypass => "bypass",
            ClassificationPath::Skip => "skip",
            ClassificationPath::FastClean => "fast_clean",
            ClassificationPath::Process => "process",
        };
        write!(f, "{s}")
    }
}

/// Output of the cleaning stage. Exactly one is produced per processed
/// (non-skipped) raw Turn per evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedTurn {
    pub id: String,
    pub turn_id: String,
    pub evaluation_id: String,
    /// Carried over from the source Turn so conversation-window rendering
    /// can reproduce `Speaker: cleaned_text` lines without a second lookup.
    pub speaker: String,
    pub cleaned_text: String,
    pub confidence_score: ConfidenceScore,
    pub cleaning_applied: bool,
    pub cleaning_level: CleaningLevel,
    pub ai_model_used: Option<String>,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    pub context_detected: Option<String>,
    #[serde(default)]
    pub token_usage: crate::usage::Usage,
    #[serde(default)]
    pub cost_usd: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CalledFunction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Output of the function-calling stage. Zero-or-more per CleanedTurn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalledFunction {
    pub id: String,
    pub cleaned_turn_id: String,
    pub evaluation_id: String,
    pub function_name: String,
    pub parameters: HashMap<String, crate::tool::ArgValue>,
    pub result: serde_json::Value,
    pub error: Option<String>,
    pub executed: bool,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub token_usage: crate::usage::Usage,
    #[serde(default)]
    pub cost_usd: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Evaluation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Created,
    Running,
    Stopped,
    Complete,
}

/// Caller-supplied configuration for a new evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub cleaner_prompt_template_ref: String,
    #[serde(default)]
    pub function_prompt_template_ref: Option<String>,
    #[serde(default = "default_cleaner_window")]
    pub cleaner_window_size: u32,
    #[serde(default = "default_function_window")]
    pub function_window_size: u32,
    #[serde(default = "default_functions_enabled")]
    pub functions_enabled: bool,
}

fn default_cleaner_window() -> u32 {
    10
}
fn default_function_window() -> u32 {
    20
}
fn default_functions_enabled() -> bool {
    true
}

impl EvaluationConfig {
    /// Validate the cross-field invariant: the function window must be at
    /// least as large as the cleaner window, and both windows must fall
    /// within the bounds advertised at the ingress boundary.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=50).contains(&self.cleaner_window_size) {
            return Err(format!(
                "cleaner_window_size must be in 1..=50, got {}",
                self.cleaner_window_size
            ));
        }
        if !(1..=100).contains(&self.function_window_size) {
            return Err(format!(
                "function_window_size must be in 1..=100, got {}",
                self.function_window_size
            ));
        }
        if self.function_window_size < self.cleaner_window_size {
            return Err(format!(
                "function_window_size ({}) must be >= cleaner_window_size ({})",
                self.function_window_size, self.cleaner_window_size
            ));
        }
        Ok(())
    }
}

/// A configuration + result stream applied to a Conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: String,
    pub conversation_id: String,
    pub config: EvaluationConfig,
    pub status: EvaluationStatus,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MirroredCustomer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One recorded business insight, per §4.2 `record_business_insight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessInsight {
    pub category: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Status of demo creation, per §4.2 `initiate_demo_creation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoCreationStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// The open-ended part of the customer profile that function calls
/// populate over the lifetime of an evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessInsights {
    #[serde(default)]
    pub metrics: HashMap<String, String>,
    #[serde(default)]
    pub insights: Vec<BusinessInsight>,
    #[serde(default)]
    pub marketing_channels: Vec<String>,
    #[serde(default)]
    pub demo_creation_initiated: Option<DemoCreationStatus>,
}

/// A per-evaluation writable snapshot of the customer profile, initialized
/// from a canonical source at evaluation creation. Owned by Session State;
/// never aliased across evaluations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirroredCustomer {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_description: Option<String>,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub company_sector: Option<String>,
    #[serde(default)]
    pub business_insights: BusinessInsights,
    pub updated_at: DateTime<Utc>,
}

impl MirroredCustomer {
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            ..Default::default()
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_speaker_is_case_insensitive() {
        let t = Turn {
            turn_id: "t1".into(),
            conversation_id: "c1".into(),
            speaker: "LUMEN".into(),
            raw_text: "hi".into(),
            sequence: 1,
            created_at: Utc::now(),
        };
        assert!(t.is_bypass_speaker());
    }

    #[test]
    fn user_speaker_is_not_bypass() {
        let t = Turn {
            turn_id: "t1".into(),
            conversation_id: "c1".into(),
            speaker: "User".into(),
            raw_text: "hi".into(),
            sequence: 1,
            created_at: Utc::now(),
        };
        assert!(!t.is_bypass_speaker());
        assert!(t.is_user_speaker());
    }

    #[test]
    fn evaluation_config_rejects_function_window_smaller_than_cleaner() {
        let cfg = EvaluationConfig {
            cleaner_prompt_template_ref: "cleaner/v1".into(),
            function_prompt_template_ref: None,
            cleaner_window_size: 20,
            function_window_size: 10,
            functions_enabled: true,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn evaluation_config_accepts_defaults() {
        let cfg = EvaluationConfig {
            cleaner_prompt_template_ref: "cleaner/v1".into(),
            function_prompt_template_ref: None,
            cleaner_window_size: default_cleaner_window(),
            function_window_size: default_function_window(),
            functions_enabled: true,
        };
        assert!(cfg.validate().is_ok());
    }
}
